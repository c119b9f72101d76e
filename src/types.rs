//! Core types for album-dl

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Identifier of a message within its source entity (monotonic)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl MessageId {
    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for MessageId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Album identifier shared by every message of one album
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(pub String);

impl From<&str> for GroupKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<i64> for GroupKey {
    fn from(key: i64) -> Self {
        Self(key.to_string())
    }
}

/// Attachment metadata declared by the source
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    /// Original filename, if the source knows one
    #[serde(default)]
    pub name: Option<String>,
    /// Size in bytes, if known
    #[serde(default)]
    pub size: Option<u64>,
    /// File extension including the leading dot (e.g. ".jpg")
    #[serde(default)]
    pub extension: Option<String>,
    /// Opaque handle the source uses to locate the bytes
    #[serde(default)]
    pub location: Option<String>,
}

impl MediaRef {
    /// Declared size, treating zero as unknown
    pub fn expected_size(&self) -> Option<u64> {
        self.size.filter(|&s| s > 0)
    }

    /// Extension normalized to start with a dot; empty extensions count as unknown
    pub fn normalized_extension(&self) -> Option<String> {
        let ext = self.extension.as_deref()?.trim();
        if ext.is_empty() || ext == "." {
            return None;
        }
        if ext.starts_with('.') {
            Some(ext.to_string())
        } else {
            Some(format!(".{ext}"))
        }
    }
}

/// One message fetched from the source
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Monotonic message id
    pub id: MessageId,
    /// Post time
    pub timestamp: DateTime<Utc>,
    /// Caption or body text
    #[serde(default)]
    pub text: Option<String>,
    /// Album identifier, absent for standalone messages
    #[serde(default)]
    pub group_id: Option<GroupKey>,
    /// Attached media, if any
    #[serde(default)]
    pub media: Option<MediaRef>,
}

impl Message {
    /// Non-empty text body
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    /// Whether this message carries something to download
    pub fn has_media(&self) -> bool {
        self.media.is_some()
    }
}

/// A resolved, addressable source entity (channel, chat, user)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable entity id
    pub id: i64,
    /// Display title, if any
    #[serde(default)]
    pub title: Option<String>,
    /// Public handle, if any
    #[serde(default)]
    pub username: Option<String>,
}

impl Entity {
    /// Best human-readable name for log lines and prompts
    pub fn display_name(&self) -> String {
        self.title
            .clone()
            .or_else(|| self.username.clone())
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// Inclusive UTC time window built from two calendar dates
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateWindow {
    /// 00:00:00 of the start date
    pub start: DateTime<Utc>,
    /// 23:59:59 of the end date
    pub end: DateTime<Utc>,
}

impl DateWindow {
    /// Build the window covering `start` through the last second of `end`
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InputValidation(format!(
                "start date {start} is after end date {end}"
            )));
        }
        let start = Utc.from_utc_datetime(&start.and_time(NaiveTime::MIN));
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        let end = Utc.from_utc_datetime(&end.and_time(end_of_day));
        Ok(Self { start, end })
    }

    /// Parse two `YYYY-MM-DD` strings into a window
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::from_dates(parse_date(start)?, parse_date(end)?)
    }

    /// Whether a timestamp falls inside the window (both ends inclusive)
    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        *ts >= self.start && *ts <= self.end
    }
}

/// Parse a `YYYY-MM-DD` calendar date
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        Error::InputValidation(format!(
            "invalid date '{}'; please use YYYY-MM-DD",
            raw.trim()
        ))
    })
}

/// Final state of a single download job
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    /// File transferred and verified
    Downloaded {
        /// Attempts used, including the successful one
        attempts: u32,
    },
    /// File already on disk with the expected size; no transfer made
    AlreadyComplete,
    /// Job abandoned
    Failed {
        /// Attempts used before giving up
        attempts: u32,
        /// Last error seen
        reason: String,
    },
}

/// Result of one download job
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    /// Message whose media was handled
    pub id: MessageId,
    /// Destination file
    pub path: PathBuf,
    /// What happened
    pub outcome: JobOutcome,
}

/// Result of processing one content group
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupReport {
    /// Folder the group was materialized in
    pub folder: PathBuf,
    /// Whether `description.txt` was written
    pub description_written: bool,
    /// One report per media-bearing message
    pub jobs: Vec<JobReport>,
}

impl GroupReport {
    fn count(&self, pred: impl Fn(&JobOutcome) -> bool) -> usize {
        self.jobs.iter().filter(|j| pred(&j.outcome)).count()
    }

    /// Jobs that transferred a file
    pub fn downloaded(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Downloaded { .. }))
    }

    /// Jobs skipped by the resume check
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::AlreadyComplete))
    }

    /// Jobs abandoned after retries
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Failed { .. }))
    }
}

/// Aggregate over a whole run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Groups processed
    pub groups: usize,
    /// Files transferred
    pub downloaded: usize,
    /// Files already complete
    pub skipped: usize,
    /// Files abandoned
    pub failed: usize,
}

impl RunSummary {
    /// Sum per-group counts
    pub fn from_reports(reports: &[GroupReport]) -> Self {
        reports.iter().fold(
            RunSummary {
                groups: reports.len(),
                ..Default::default()
            },
            |acc, r| RunSummary {
                downloaded: acc.downloaded + r.downloaded(),
                skipped: acc.skipped + r.skipped(),
                failed: acc.failed + r.failed(),
                ..acc
            },
        )
    }
}

/// Event emitted while a run downloads its groups
///
/// Subscribers render progress; the downloader never depends on anyone listening.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A group's folder is ready and its jobs are being scheduled
    GroupStarted {
        /// Group folder
        folder: PathBuf,
        /// Number of media items in the group
        files: usize,
    },

    /// A job acquired a transfer slot and is about to transfer
    TransferStarted {
        /// Message id
        id: MessageId,
        /// Sanitized destination filename
        filename: String,
        /// Declared size, if known
        total_bytes: Option<u64>,
    },

    /// Progress of an in-flight transfer
    TransferProgress {
        /// Message id
        id: MessageId,
        /// Bytes written so far
        bytes_done: u64,
        /// Total bytes, if known
        total_bytes: Option<u64>,
    },

    /// An attempt failed and another will follow
    TransferRetrying {
        /// Message id
        id: MessageId,
        /// Attempt that just failed (1-based)
        attempt: u32,
        /// Why it failed
        error: String,
    },

    /// Transfer verified on disk
    TransferComplete {
        /// Message id
        id: MessageId,
        /// Final file
        path: PathBuf,
        /// File length
        bytes: u64,
    },

    /// File already complete; nothing transferred
    TransferSkipped {
        /// Message id
        id: MessageId,
        /// Existing file
        path: PathBuf,
    },

    /// Job abandoned
    TransferFailed {
        /// Message id
        id: MessageId,
        /// Last error
        error: String,
    },

    /// Every job of a group has finished
    GroupSettled {
        /// Group folder
        folder: PathBuf,
        /// Files transferred
        downloaded: usize,
        /// Files already complete
        skipped: usize,
        /// Files abandoned
        failed: usize,
    },
}
