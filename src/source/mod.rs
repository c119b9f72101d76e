//! Message source abstraction
//!
//! A [`MessageSource`] is the session-bearing collaborator the downloader works
//! against: it resolves identifiers, enumerates messages in a time window and
//! streams media bytes to disk. Authentication and connection setup happen
//! before a source is handed to [`Downloader`](crate::downloader::Downloader).
//!
//! Implementations:
//! - [`HttpSource`] - talks to a JSON/HTTP message gateway

mod http;

pub use http::HttpSource;

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;
use crate::types::{DateWindow, Entity, Message};

/// Snapshot of one transfer's progress
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    /// Bytes written so far
    pub bytes_done: u64,
    /// Total size, if known
    pub total_bytes: Option<u64>,
}

/// Channel a source publishes transfer progress on
///
/// Only the latest value matters; sending never blocks the transfer.
pub type ProgressSender = tokio::sync::watch::Sender<Progress>;

/// Capability to read messages and media from a remote messaging service
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Short implementation name for log lines
    fn name(&self) -> &'static str;

    /// Resolve a handle or link to an addressable entity
    ///
    /// Fails with [`Error::Resolution`](crate::error::Error::Resolution) for
    /// unknown or unreachable targets.
    async fn resolve(&self, identifier: &str) -> Result<Entity>;

    /// Messages of `entity` posted inside `window`, ascending by id
    ///
    /// Fails with [`Error::Fetch`](crate::error::Error::Fetch); no partial
    /// result is returned.
    async fn fetch_messages(&self, entity: &Entity, window: &DateWindow) -> Result<Vec<Message>>;

    /// Stream a message's media to `destination`, truncating any existing file
    async fn download_media(
        &self,
        message: &Message,
        destination: &Path,
        progress: &ProgressSender,
    ) -> Result<()>;
}
