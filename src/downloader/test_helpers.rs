//! Shared test helpers for creating Downloader instances in tests.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

use crate::config::Config;
use crate::downloader::Downloader;
use crate::error::{Error, Result, TransferError};
use crate::source::{MessageSource, Progress, ProgressSender};
use crate::types::{DateWindow, Entity, GroupKey, MediaRef, Message, MessageId};

/// What the mock does on one `download_media` call
#[derive(Clone, Debug)]
pub(crate) enum Behavior {
    /// Write this many bytes and succeed
    Write(usize),
    /// Fail with a retryable error
    Transient,
    /// Fail with a non-retryable error
    Permanent,
    /// Never finish (until cancelled)
    Hang,
}

/// Scripted in-memory source
///
/// Each message id has a queue of behaviours consumed one per call; when the
/// queue is empty the declared size is written.
#[derive(Default)]
pub(crate) struct MockSource {
    pub messages: Vec<Message>,
    scripts: Mutex<HashMap<MessageId, VecDeque<Behavior>>>,
    calls: Mutex<HashMap<MessageId, usize>>,
    /// Whether the destination existed when each call started
    existed: Mutex<HashMap<MessageId, Vec<bool>>>,
    active: AtomicUsize,
    peak: AtomicUsize,
    pub delay: Duration,
}

impl MockSource {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn script(&self, id: i64, behaviors: impl IntoIterator<Item = Behavior>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(MessageId(id), behaviors.into_iter().collect());
    }

    /// Number of `download_media` calls made for `id`
    pub fn calls(&self, id: i64) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&MessageId(id))
            .copied()
            .unwrap_or(0)
    }

    /// Per call for `id`: whether the destination file was already on disk
    pub fn destination_existed(&self, id: i64) -> Vec<bool> {
        self.existed
            .lock()
            .unwrap()
            .get(&MessageId(id))
            .cloned()
            .unwrap_or_default()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn declared_size(message: &Message) -> usize {
        message
            .media
            .as_ref()
            .and_then(|m| m.size)
            .unwrap_or(1) as usize
    }
}

/// Decrements the active counter on drop, including cancellation
struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageSource for MockSource {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn resolve(&self, identifier: &str) -> Result<Entity> {
        if identifier == "missing" {
            return Err(Error::Resolution {
                identifier: identifier.to_string(),
                reason: "no such entity".to_string(),
            });
        }
        Ok(Entity {
            id: 1,
            title: Some("Test Channel".to_string()),
            username: Some(identifier.to_string()),
        })
    }

    async fn fetch_messages(&self, _entity: &Entity, window: &DateWindow) -> Result<Vec<Message>> {
        Ok(self
            .messages
            .iter()
            .filter(|m| window.contains(&m.timestamp))
            .cloned()
            .collect())
    }

    async fn download_media(
        &self,
        message: &Message,
        destination: &Path,
        progress: &ProgressSender,
    ) -> Result<()> {
        *self.calls.lock().unwrap().entry(message.id).or_default() += 1;
        self.existed
            .lock()
            .unwrap()
            .entry(message.id)
            .or_default()
            .push(destination.exists());
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = ActiveGuard(&self.active);

        let behavior = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&message.id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Behavior::Write(Self::declared_size(message)));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match behavior {
            Behavior::Write(len) => {
                tokio::fs::write(destination, vec![0xAB; len]).await?;
                progress.send_replace(Progress {
                    bytes_done: len as u64,
                    total_bytes: message.media.as_ref().and_then(|m| m.size),
                });
                Ok(())
            }
            Behavior::Transient => Err(Error::Transfer {
                id: message.id,
                source: TransferError::Transient("connection reset".to_string()),
            }),
            Behavior::Permanent => Err(Error::Transfer {
                id: message.id,
                source: TransferError::Permanent("media deleted".to_string()),
            }),
            Behavior::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

pub(crate) fn ts(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
}

/// Message with media of `size` bytes named `<id>.jpg`
pub(crate) fn media_message(id: i64, day: u32, size: u64) -> Message {
    Message {
        id: MessageId(id),
        timestamp: ts(day, 10),
        text: None,
        group_id: None,
        media: Some(MediaRef {
            name: None,
            size: Some(size),
            extension: Some(".jpg".to_string()),
            location: None,
        }),
    }
}

pub(crate) fn with_text(mut message: Message, text: &str) -> Message {
    message.text = Some(text.to_string());
    message
}

pub(crate) fn in_album(mut message: Message, key: &str) -> Message {
    message.group_id = Some(GroupKey::from(key));
    message
}

pub(crate) fn june_window() -> DateWindow {
    DateWindow::parse("2024-06-01", "2024-06-30").unwrap()
}

/// Config writing into a fresh temp dir with millisecond retry delays
pub(crate) fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.download.download_dir = dir.join("downloads");
    config.download.max_concurrent_downloads = 3;
    config.retry.initial_delay = Duration::from_millis(5);
    config.retry.max_delay = Duration::from_millis(20);
    config
}

/// Helper to create a test Downloader over a mock source.
/// Returns the downloader, the source handle and the tempdir (which must be kept alive).
pub(crate) fn create_test_downloader(
    source: MockSource,
) -> (Downloader, Arc<MockSource>, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    create_test_downloader_with(source, test_config(temp_dir.path()), temp_dir)
}

pub(crate) fn create_test_downloader_with(
    source: MockSource,
    config: Config,
    temp_dir: tempfile::TempDir,
) -> (Downloader, Arc<MockSource>, tempfile::TempDir) {
    let source = Arc::new(source);
    let downloader = Downloader::new(config, source.clone());
    (downloader, source, temp_dir)
}
