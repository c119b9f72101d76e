//! Download orchestration split into focused submodules.
//!
//! The `Downloader` struct and its methods are organized by stage:
//! - [`group_task`] - Folder planning, description persistence, per-group job fan-out
//! - [`transfer_job`] - Resume check, retried transfer and size verification of one media item

mod group_task;
mod transfer_job;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use transfer_job::DownloadJob;

use std::sync::Arc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::grouping::{ContentGroup, build_groups};
use crate::limiter::TransferLimiter;
use crate::retry::RetryPolicy;
use crate::source::MessageSource;
use crate::types::{DateWindow, Entity, Event, GroupReport, RunSummary};

/// Buffer size of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Main downloader instance (cloneable - all fields are cheap handles)
///
/// One instance drives one run: it owns the shared transfer limiter, so every
/// group and job scheduled through it competes for the same slots.
#[derive(Clone)]
pub struct Downloader {
    /// Session-bearing source of messages and media
    pub(crate) source: Arc<dyn MessageSource>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Process-wide transfer slots
    pub(crate) limiter: TransferLimiter,
    /// Attempt count and back-off schedule for each transfer
    pub(crate) retry: RetryPolicy,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Cancelled when the run is interrupted
    pub(crate) cancel_token: tokio_util::sync::CancellationToken,
}

impl Downloader {
    /// Create a downloader working against `source`
    pub fn new(config: Config, source: Arc<dyn MessageSource>) -> Self {
        let limiter = TransferLimiter::new(config.download.max_concurrent_downloads);
        let cancel_token = tokio_util::sync::CancellationToken::new();
        let retry = RetryPolicy::from(&config.retry).with_cancel_token(cancel_token.clone());
        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);

        tracing::info!(
            source = source.name(),
            max_concurrent = limiter.capacity(),
            max_attempts = retry.max_attempts,
            download_dir = %config.download.download_dir.display(),
            "Downloader initialized"
        );

        Self {
            source,
            config: Arc::new(config),
            limiter,
            retry,
            event_tx,
            cancel_token,
        }
    }

    /// Subscribe to progress events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Token that interrupts the run when cancelled
    ///
    /// In-flight transfers are dropped and their partial files left on disk for
    /// the next run's resume check.
    pub fn cancel_token(&self) -> tokio_util::sync::CancellationToken {
        self.cancel_token.clone()
    }

    /// Shared transfer limiter
    pub fn limiter(&self) -> &TransferLimiter {
        &self.limiter
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve a user-supplied target identifier
    pub async fn resolve(&self, identifier: &str) -> Result<Entity> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(Error::InputValidation(
                "target identifier is empty".to_string(),
            ));
        }
        let entity = self.source.resolve(identifier).await?;
        tracing::info!(
            target = identifier,
            entity_id = entity.id,
            name = %entity.display_name(),
            "Target resolved"
        );
        Ok(entity)
    }

    /// Fetch the messages of `entity` inside `window` and group them
    ///
    /// Groups come back ordered by anchor date; their 1-based positions are the
    /// indices a [`Selection`](crate::selection::Selection) refers to.
    pub async fn fetch_groups(
        &self,
        entity: &Entity,
        window: &DateWindow,
    ) -> Result<Vec<ContentGroup>> {
        let mut messages = self.source.fetch_messages(entity, window).await?;
        let fetched = messages.len();
        messages.retain(|m| window.contains(&m.timestamp));
        if messages.len() != fetched {
            tracing::warn!(
                dropped = fetched - messages.len(),
                "Source returned messages outside the requested window"
            );
        }

        let groups = build_groups(messages);
        tracing::info!(
            entity_id = entity.id,
            messages = fetched,
            groups = groups.len(),
            "Identified content groups"
        );
        Ok(groups)
    }

    /// Download every given group concurrently
    ///
    /// Groups are not limited among themselves; every transfer shares the one
    /// limiter. Returns once every group has settled, in input order.
    pub async fn download_groups(&self, groups: &[&ContentGroup]) -> Vec<GroupReport> {
        let folders = group_task::plan_folders(groups, self.config.download.folder_collision);
        let tasks = groups
            .iter()
            .zip(folders)
            .map(|(group, folder)| self.download_group(group, folder));

        let reports = futures::future::join_all(tasks).await;
        let summary = RunSummary::from_reports(&reports);
        tracing::info!(
            groups = summary.groups,
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            failed = summary.failed,
            "All groups settled"
        );
        reports
    }
}
