//! # album-dl
//!
//! Date-windowed media downloader for messaging channels.
//!
//! ## Design Philosophy
//!
//! album-dl is designed to be:
//! - **Resumable** - Files already on disk with the declared size are never fetched again
//! - **Album-aware** - Messages sharing an album id land in one folder with one description
//! - **Bounded** - One process-wide limit caps simultaneous transfers across all groups
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use album_dl::{Config, DateWindow, Downloader, HttpSource, Selection};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let source = Arc::new(HttpSource::new(&config.source)?);
//!     let downloader = Downloader::new(config, source);
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let entity = downloader.resolve("some_channel").await?;
//!     let window = DateWindow::parse("2024-01-01", "2024-01-31")?;
//!     let groups = downloader.fetch_groups(&entity, &window).await?;
//!     let selection = Selection::all(groups.len());
//!     downloader.download_groups(&selection.apply(&groups)).await;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Download orchestration (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Album and single-message grouping
pub mod grouping;
/// Process-wide transfer limit
pub mod limiter;
/// Retry logic with back-off
pub mod retry;
/// Group selection expressions
pub mod selection;
/// Message source abstraction and implementations
pub mod source;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, FolderCollision};
pub use downloader::Downloader;
pub use error::{Error, Result, TransferError};
pub use grouping::{ContentGroup, build_groups};
pub use limiter::TransferLimiter;
pub use selection::Selection;
pub use source::{HttpSource, MessageSource};
pub use types::{
    DateWindow, Entity, Event, GroupReport, JobOutcome, JobReport, Message, MessageId, RunSummary,
};

/// Cancel the downloader's run when a termination signal arrives.
///
/// Returns once a signal was received and the cancel token fired. Transfers
/// in flight are dropped; partial files stay on disk for the next run.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use album_dl::{Config, Downloader, HttpSource, cancel_on_signal};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let source = Arc::new(HttpSource::new(&config.source)?);
///     let downloader = Downloader::new(config, source);
///
///     tokio::spawn(cancel_on_signal(downloader.clone()));
///
///     Ok(())
/// }
/// ```
pub async fn cancel_on_signal(downloader: Downloader) {
    wait_for_signal().await;
    tracing::warn!("Interrupted, abandoning remaining transfers");
    downloader.cancel_token().cancel();
    downloader.limiter().close();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
