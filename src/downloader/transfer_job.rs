//! One media transfer: resume check, retried attempts and size verification

use std::path::{Path, PathBuf};

use super::Downloader;
use crate::error::{Error, TransferError};
use crate::retry::TransferOutcome;
use crate::source::Progress;
use crate::types::{Event, JobOutcome, JobReport, Message};
use crate::utils::media_filename;

/// A single media item scheduled for download
#[derive(Clone, Debug)]
pub struct DownloadJob {
    /// Message carrying the media
    pub message: Message,
    /// Final file path inside the group folder
    pub destination: PathBuf,
    /// Declared size; `None` when the source does not know it
    pub expected_size: Option<u64>,
}

impl DownloadJob {
    /// Plan the download of `message`'s media into `folder`
    pub fn new(message: Message, folder: &Path) -> Self {
        let destination = folder.join(media_filename(&message));
        let expected_size = message.media.as_ref().and_then(|m| m.expected_size());
        Self {
            message,
            destination,
            expected_size,
        }
    }

    /// Destination filename without its folder
    pub fn filename(&self) -> String {
        self.destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Whether a file of `len` bytes is a complete copy
    ///
    /// Without a declared size any non-empty file counts as complete.
    pub fn is_complete(&self, len: u64) -> bool {
        match self.expected_size {
            Some(expected) => len == expected,
            None => len > 0,
        }
    }

    fn report(&self, outcome: JobOutcome) -> JobReport {
        JobReport {
            id: self.message.id,
            path: self.destination.clone(),
            outcome,
        }
    }

    pub(crate) fn failed(&self, attempts: u32, reason: String) -> JobReport {
        self.report(JobOutcome::Failed { attempts, reason })
    }
}

impl Downloader {
    /// Run one job to completion under the shared transfer limiter
    ///
    /// The permit is held from the resume check until the last attempt settles.
    pub(crate) async fn run_job(&self, job: DownloadJob) -> JobReport {
        let id = job.message.id;

        let _permit = tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => {
                return self.abandon(&job, 0, Error::Cancelled.to_string());
            }
            permit = self.limiter.acquire() => match permit {
                Ok(permit) => permit,
                Err(e) => return self.abandon(&job, 0, e.to_string()),
            },
        };

        // Resume check: a file with the declared size is already complete
        if let Ok(meta) = tokio::fs::metadata(&job.destination).await
            && meta.is_file()
        {
            if job.expected_size == Some(meta.len()) {
                tracing::info!(
                    id = %id,
                    path = %job.destination.display(),
                    "File already complete, skipping"
                );
                self.event_tx
                    .send(Event::TransferSkipped {
                        id,
                        path: job.destination.clone(),
                    })
                    .ok();
                return job.report(JobOutcome::AlreadyComplete);
            }

            tracing::debug!(
                id = %id,
                found = meta.len(),
                expected = ?job.expected_size,
                "Removing incomplete file"
            );
            if let Err(e) = tokio::fs::remove_file(&job.destination).await {
                tracing::warn!(id = %id, error = %e, "Failed to remove incomplete file");
            }
        }

        self.event_tx
            .send(Event::TransferStarted {
                id,
                filename: job.filename(),
                total_bytes: job.expected_size,
            })
            .ok();

        let job_ref = &job;
        let report = self
            .retry
            .run(
                move |n| self.attempt_transfer(job_ref, n),
                |n, error: &TransferError| {
                    self.event_tx
                        .send(Event::TransferRetrying {
                            id,
                            attempt: n,
                            error: error.to_string(),
                        })
                        .ok();
                },
            )
            .await;

        match report.result {
            Ok(()) => {
                let bytes = tokio::fs::metadata(&job.destination)
                    .await
                    .map(|m| m.len())
                    .unwrap_or_default();
                tracing::info!(
                    id = %id,
                    path = %job.destination.display(),
                    bytes,
                    attempts = report.attempts,
                    "Downloaded"
                );
                self.event_tx
                    .send(Event::TransferComplete {
                        id,
                        path: job.destination.clone(),
                        bytes,
                    })
                    .ok();
                job.report(JobOutcome::Downloaded {
                    attempts: report.attempts,
                })
            }
            Err(error) => self.abandon(&job, report.attempts, error.to_string()),
        }
    }

    fn abandon(&self, job: &DownloadJob, attempts: u32, reason: String) -> JobReport {
        tracing::error!(
            id = %job.message.id,
            attempts,
            error = %reason,
            "Giving up on media"
        );
        let report = job.failed(attempts, reason);
        self.emit_failed(&report);
        report
    }

    /// One transfer attempt followed by size verification
    async fn attempt_transfer(&self, job: &DownloadJob, n: u32) -> TransferOutcome {
        let id = job.message.id;

        if let Some(parent) = job.destination.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return TransferOutcome::from(&Error::from(e));
        }

        let (progress_tx, mut progress_rx) = tokio::sync::watch::channel(Progress {
            bytes_done: 0,
            total_bytes: job.expected_size,
        });
        let forwarder = {
            let event_tx = self.event_tx.clone();
            tokio::spawn(async move {
                // Ends once the sender is dropped
                while progress_rx.changed().await.is_ok() {
                    let progress = *progress_rx.borrow_and_update();
                    event_tx
                        .send(Event::TransferProgress {
                            id,
                            bytes_done: progress.bytes_done,
                            total_bytes: progress.total_bytes,
                        })
                        .ok();
                }
            })
        };

        let result = tokio::select! {
            _ = self.cancel_token.cancelled() => Err(Error::Cancelled),
            r = self.source.download_media(&job.message, &job.destination, &progress_tx) => r,
        };
        drop(progress_tx);
        forwarder.await.ok();

        if let Err(e) = result {
            tracing::debug!(id = %id, attempt = n, error = %e, "Transfer attempt failed");
            return TransferOutcome::from(&e);
        }

        let actual = match tokio::fs::metadata(&job.destination).await {
            Ok(meta) => meta.len(),
            Err(e) => return TransferOutcome::from(&Error::from(e)),
        };
        if job.is_complete(actual) {
            return TransferOutcome::Success;
        }

        // The final attempt's file stays; the next run's resume check replaces it
        if n < self.retry.max_attempts
            && let Err(e) = tokio::fs::remove_file(&job.destination).await
        {
            tracing::warn!(id = %id, error = %e, "Failed to remove incomplete file");
        }
        TransferOutcome::TransientFailure(TransferError::SizeMismatch {
            expected: job.expected_size,
            actual,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MediaRef, MessageId};
    use chrono::Utc;

    fn message(id: i64, media: MediaRef) -> Message {
        Message {
            id: MessageId(id),
            timestamp: Utc::now(),
            text: None,
            group_id: None,
            media: Some(media),
        }
    }

    #[test]
    fn job_targets_sanitized_filename_in_folder() {
        let job = DownloadJob::new(
            message(
                4,
                MediaRef {
                    name: Some("a:b.jpg".into()),
                    size: Some(12),
                    ..Default::default()
                },
            ),
            Path::new("/tmp/group"),
        );

        assert_eq!(job.destination, PathBuf::from("/tmp/group/a_b.jpg"));
        assert_eq!(job.filename(), "a_b.jpg");
        assert_eq!(job.expected_size, Some(12));
    }

    #[test]
    fn completeness_uses_declared_size() {
        let sized = DownloadJob::new(
            message(
                1,
                MediaRef {
                    size: Some(10),
                    ..Default::default()
                },
            ),
            Path::new("out"),
        );
        assert!(sized.is_complete(10));
        assert!(!sized.is_complete(9));

        let unsized_job = DownloadJob::new(message(2, MediaRef::default()), Path::new("out"));
        assert!(unsized_job.is_complete(1));
        assert!(!unsized_job.is_complete(0));
    }
}
