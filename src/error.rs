//! Error types for album-dl
//!
//! Run-level failures (resolution, input validation, fetch) abort the run and are
//! surfaced through [`Error`]. Per-transfer failures are described by
//! [`TransferError`] and never escape a single download job.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::MessageId;

/// Result type alias for album-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for album-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "source.base_url")
        key: Option<String>,
    },

    /// The target identifier could not be resolved to an entity
    #[error("could not resolve target '{identifier}': {reason}")]
    Resolution {
        /// The identifier as entered by the user
        identifier: String,
        /// Why the source rejected it
        reason: String,
    },

    /// User input (dates, identifiers) failed validation
    #[error("invalid input: {0}")]
    InputValidation(String),

    /// Enumerating messages from the source failed
    #[error("failed to fetch messages: {0}")]
    Fetch(String),

    /// Selection expression could not be parsed
    #[error("invalid selection token '{token}'")]
    Selection {
        /// The offending comma-separated token
        token: String,
    },

    /// A single media transfer failed
    #[error("transfer of message {id} failed: {source}")]
    Transfer {
        /// Message whose media was being transferred
        id: MessageId,
        /// Underlying transfer failure
        #[source]
        source: TransferError,
    },

    /// Writing a group's description file failed
    #[error("failed to write {path}: {reason}")]
    FilesystemWrite {
        /// File that could not be written
        path: PathBuf,
        /// The underlying I/O failure
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Run was interrupted
    #[error("operation cancelled")]
    Cancelled,
}

/// Failure of one transfer attempt, as seen by the retry policy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// Network or I/O hiccup that may succeed on a later attempt
    #[error("transient failure: {0}")]
    Transient(String),

    /// Failure that no retry can fix (media removed, access denied)
    #[error("permanent failure: {0}")]
    Permanent(String),

    /// Transfer finished but the file on disk has the wrong length
    #[error("size mismatch: expected {expected:?} bytes, got {actual}")]
    SizeMismatch {
        /// Size declared by the source, if any
        expected: Option<u64>,
        /// Size actually found on disk
        actual: u64,
    },
}

impl TransferError {
    /// Whether the retry loop should wait before the next attempt
    ///
    /// Size mismatches are retried immediately; only genuine transfer errors back off.
    pub fn wants_backoff(&self) -> bool {
        matches!(self, TransferError::Transient(_))
    }
}
