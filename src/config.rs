//! Configuration types for album-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Download behavior configuration (output directory, concurrency, folder naming)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Base output directory (default: "./output/downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Maximum concurrent transfers across all groups (default: 3)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// What to do when two groups sanitize to the same folder name
    #[serde(default)]
    pub folder_collision: FolderCollision,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            max_concurrent_downloads: default_max_concurrent(),
            folder_collision: FolderCollision::default(),
        }
    }
}

/// Folder-name collision handling between groups of the same run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderCollision {
    /// Groups with the same sanitized name share one folder (default)
    #[default]
    Merge,
    /// Suffix colliding folders with the group's date and first message id
    Disambiguate,
}

/// Retry configuration for a single media transfer
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total transfer attempts per media item, including the first (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first transient failure (default: 2 seconds)
    #[serde(default = "default_retry_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Upper bound for any single delay (default: 2 seconds)
    #[serde(default = "default_retry_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier applied to the delay after every failure (default: 1.0, i.e. fixed delay)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_retry_delay(),
            max_delay: default_retry_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

/// Message gateway connection settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the message gateway (default: "http://127.0.0.1:8088/")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token sent with every request
    #[serde(default)]
    pub api_token: Option<String>,

    /// TCP connect timeout (default: 10 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            connect_timeout: default_connect_timeout(),
        }
    }
}

/// Main configuration for album-dl
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Output directory, concurrency and folder naming
    #[serde(default)]
    pub download: DownloadConfig,

    /// Per-transfer retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Message gateway settings
    #[serde(default)]
    pub source: SourceConfig,
}

impl Config {
    /// Load configuration from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read '{}': {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.source.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL '{}': {}", self.source.base_url, e),
            key: Some("source.base_url".to_string()),
        })?;
        if self.retry.max_attempts == 0 {
            return Err(Error::Config {
                message: "max_attempts must be at least 1".to_string(),
                key: Some("retry.max_attempts".to_string()),
            });
        }
        Ok(())
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./output/downloads")
}

fn default_max_concurrent() -> usize {
    3
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_base_url() -> String {
    "http://127.0.0.1:8088/".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let config: Config = serde_json::from_str("{}").expect("deserialize failed");

        assert_eq!(
            config.download.download_dir,
            PathBuf::from("./output/downloads")
        );
        assert_eq!(config.download.max_concurrent_downloads, 3);
        assert_eq!(config.download.folder_collision, FolderCollision::Merge);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_delay, Duration::from_secs(2));
        assert!(!config.retry.jitter);
    }

    #[test]
    fn durations_serialize_as_integer_seconds() {
        let config = RetryConfig {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(30),
            ..RetryConfig::default()
        };

        let json = serde_json::to_value(&config).expect("serialize failed");

        assert_eq!(json["initial_delay"], 5);
        assert_eq!(json["max_delay"], 30);
    }

    #[test]
    fn folder_collision_uses_snake_case() {
        let config: DownloadConfig =
            serde_json::from_str(r#"{"folder_collision":"disambiguate"}"#).unwrap();
        assert_eq!(config.folder_collision, FolderCollision::Disambiguate);
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.source.base_url = "not a url".to_string();

        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("source.base_url"));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_zero_attempts() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_json_file_reads_partial_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("album-dl.json");
        std::fs::write(
            &path,
            r#"{"download":{"max_concurrent_downloads":8},"source":{"api_token":"t0k"}}"#,
        )
        .unwrap();

        let config = Config::from_json_file(&path).unwrap();

        assert_eq!(config.download.max_concurrent_downloads, 8);
        assert_eq!(config.source.api_token.as_deref(), Some("t0k"));
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn from_json_file_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::from_json_file(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(Error::Config { key: None, .. })));
    }
}
