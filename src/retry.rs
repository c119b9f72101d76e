//! Retry policy for media transfers
//!
//! A transfer attempt reports a [`TransferOutcome`]; [`RetryPolicy::run`] decides
//! whether to try again and how long to wait. Transient errors back off, size
//! mismatches retry immediately, permanent errors stop at once.
//!
//! # Example
//!
//! ```no_run
//! use album_dl::config::RetryConfig;
//! use album_dl::retry::{RetryPolicy, TransferOutcome};
//!
//! # async fn example() {
//! let policy = RetryPolicy::from(&RetryConfig::default());
//! let report = policy
//!     .run(|_attempt| async { TransferOutcome::Success }, |_, _| {})
//!     .await;
//! assert!(report.result.is_ok());
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::{Error, TransferError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, connection resets, server errors) return `true`.
/// Permanent failures (media removed, access denied, bad config) return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Client errors (404, 410, 403) will not change on retry
            Error::Network(e) => match e.status() {
                Some(status) => !status.is_client_error(),
                None => true,
            },
            Error::Io(e) => !matches!(e.kind(), std::io::ErrorKind::PermissionDenied),
            Error::Transfer { source, .. } => !matches!(source, TransferError::Permanent(_)),
            Error::Fetch(_) => true,
            Error::Config { .. }
            | Error::Resolution { .. }
            | Error::InputValidation(_)
            | Error::Selection { .. }
            | Error::FilesystemWrite { .. }
            | Error::Serialization(_)
            | Error::Cancelled => false,
        }
    }
}

/// Result of one transfer attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransferOutcome {
    /// File transferred and verified
    Success,
    /// Attempt failed; a later attempt may succeed
    TransientFailure(TransferError),
    /// Attempt failed in a way no retry can fix
    PermanentFailure(TransferError),
}

impl From<&Error> for TransferOutcome {
    fn from(error: &Error) -> Self {
        if let Error::Transfer { source, .. } = error {
            return TransferOutcome::from(source.clone());
        }
        if error.is_retryable() {
            TransferOutcome::TransientFailure(TransferError::Transient(error.to_string()))
        } else {
            TransferOutcome::PermanentFailure(TransferError::Permanent(error.to_string()))
        }
    }
}

impl From<TransferError> for TransferOutcome {
    fn from(error: TransferError) -> Self {
        match error {
            TransferError::Permanent(_) => TransferOutcome::PermanentFailure(error),
            other => TransferOutcome::TransientFailure(other),
        }
    }
}

/// What [`RetryPolicy::run`] did
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryReport {
    /// Attempts made, including the last one
    pub attempts: u32,
    /// `Ok` on success, otherwise the last failure
    pub result: Result<(), TransferError>,
}

/// Attempt count and back-off schedule for one transfer
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay after the first transient failure
    pub initial_delay: Duration,
    /// Upper bound for any delay (before jitter)
    pub max_delay: Duration,
    /// Multiplier applied per failure
    pub backoff_multiplier: f64,
    /// Randomize delays within `[d, 2d]`
    pub jitter: bool,
    /// Cuts a back-off short and ends the run when cancelled
    cancel: CancellationToken,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: config.initial_delay,
            max_delay: config.max_delay,
            backoff_multiplier: config.backoff_multiplier,
            jitter: config.jitter,
            cancel: CancellationToken::new(),
        }
    }
}

impl RetryPolicy {
    /// Stop waiting between attempts once `token` is cancelled
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Delay to wait after the `failures`-th transient failure (1-based)
    pub fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let base = Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()).max(0.0));
        if self.jitter { add_jitter(base) } else { base }
    }

    /// Run `attempt` until it succeeds, fails permanently, or attempts run out
    ///
    /// `attempt` receives the 1-based attempt number. `on_retry` is called with
    /// the failed attempt number and its error whenever another attempt follows.
    pub async fn run<F, Fut, R>(&self, mut attempt: F, mut on_retry: R) -> RetryReport
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = TransferOutcome>,
        R: FnMut(u32, &TransferError),
    {
        let mut transient_failures = 0;
        let mut n = 1;

        loop {
            let error = match attempt(n).await {
                TransferOutcome::Success => {
                    if n > 1 {
                        tracing::info!(attempts = n, "Transfer succeeded after retry");
                    }
                    return RetryReport {
                        attempts: n,
                        result: Ok(()),
                    };
                }
                TransferOutcome::PermanentFailure(e) => {
                    tracing::error!(error = %e, attempt = n, "Transfer failed with non-retryable error");
                    return RetryReport {
                        attempts: n,
                        result: Err(e),
                    };
                }
                TransferOutcome::TransientFailure(e) => e,
            };

            if n >= self.max_attempts {
                tracing::error!(
                    error = %error,
                    attempts = n,
                    "Transfer failed after all retry attempts exhausted"
                );
                return RetryReport {
                    attempts: n,
                    result: Err(error),
                };
            }

            on_retry(n, &error);

            if error.wants_backoff() {
                transient_failures += 1;
                let delay = self.delay_for(transient_failures);
                tracing::warn!(
                    error = %error,
                    attempt = n,
                    max_attempts = self.max_attempts,
                    delay_ms = delay.as_millis(),
                    "Transfer failed, retrying"
                );
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        tracing::info!(attempt = n, "Retry back-off interrupted by cancellation");
                        return RetryReport {
                            attempts: n,
                            result: Err(TransferError::Permanent("operation cancelled".to_string())),
                        };
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            } else {
                tracing::warn!(
                    error = %error,
                    attempt = n,
                    max_attempts = self.max_attempts,
                    "Transfer incomplete, retrying"
                );
            }

            n += 1;
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// The result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
