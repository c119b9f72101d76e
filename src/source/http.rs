//! [`MessageSource`] backed by a JSON/HTTP message gateway
//!
//! Endpoints, relative to the configured base URL:
//! - `GET entities/{identifier}` - resolve a handle or link
//! - `GET entities/{id}/messages?from=..&to=..` - messages in a window (RFC 3339 bounds)
//! - `GET {media.location}` - raw media bytes, defaulting to
//!   `entities/{id}/messages/{message}/media`

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use url::Url;

use super::{MessageSource, Progress, ProgressSender};
use crate::config::SourceConfig;
use crate::error::{Error, Result, TransferError};
use crate::types::{DateWindow, Entity, Message};

/// HTTP gateway client (one shared connection pool per run)
#[derive(Clone, Debug)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<String>,
}

impl HttpSource {
    /// Build a client from gateway settings
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL '{}': {}", config.base_url, e),
            key: Some("source.base_url".to_string()),
        })?;
        // Url::join drops the last path segment unless the base ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_token: config.api_token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| Error::Config {
            message: format!("cannot build URL for '{}': {}", path, e),
            key: Some("source.base_url".to_string()),
        })
    }

    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn media_path(entity_id: i64, message: &Message) -> String {
        format!("entities/{}/messages/{}/media", entity_id, message.id)
    }
}

#[async_trait]
impl MessageSource for HttpSource {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn resolve(&self, identifier: &str) -> Result<Entity> {
        let resolution = |reason: String| Error::Resolution {
            identifier: identifier.to_string(),
            reason,
        };

        let url = self.endpoint(&format!(
            "entities/{}",
            urlencoding::encode(identifier.trim())
        ))?;
        let response = self
            .get(url)
            .send()
            .await
            .map_err(|e| resolution(e.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .json::<Entity>()
                .await
                .map_err(|e| resolution(format!("malformed entity: {}", e))),
            StatusCode::NOT_FOUND => Err(resolution("no such entity".to_string())),
            status => Err(resolution(format!("gateway returned {}", status))),
        }
    }

    async fn fetch_messages(&self, entity: &Entity, window: &DateWindow) -> Result<Vec<Message>> {
        let mut url = self.endpoint(&format!("entities/{}/messages", entity.id))?;
        url.query_pairs_mut()
            .append_pair("from", &window.start.to_rfc3339())
            .append_pair("to", &window.end.to_rfc3339());

        let response = self
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::Fetch(format!(
                "gateway returned {} while listing messages of {}",
                response.status(),
                entity.id
            )));
        }

        let mut messages: Vec<Message> = response
            .json()
            .await
            .map_err(|e| Error::Fetch(format!("malformed message list: {}", e)))?;

        messages.retain(|m| window.contains(&m.timestamp));
        messages.sort_by_key(|m| m.id);
        for message in &mut messages {
            let path = Self::media_path(entity.id, message);
            if let Some(media) = message.media.as_mut() {
                media.location.get_or_insert(path);
            }
        }

        tracing::debug!(entity = entity.id, count = messages.len(), "Fetched messages");
        Ok(messages)
    }

    async fn download_media(
        &self,
        message: &Message,
        destination: &Path,
        progress: &ProgressSender,
    ) -> Result<()> {
        let permanent = |reason: String| Error::Transfer {
            id: message.id,
            source: TransferError::Permanent(reason),
        };

        let media = message
            .media
            .as_ref()
            .ok_or_else(|| permanent("message has no media".to_string()))?;
        let location = media
            .location
            .as_deref()
            .ok_or_else(|| permanent("media has no location".to_string()))?;

        // Media must come from the gateway itself; the bearer token never leaves its origin
        let url = self.endpoint(location)?;
        if url.origin() != self.base_url.origin() {
            tracing::warn!(id = %message.id, location, "Refusing media location outside the gateway");
            return Err(permanent(format!(
                "media location '{}' is outside the gateway",
                url
            )));
        }

        let response = self.get(url).send().await?;
        let status = response.status();
        if status.is_client_error() {
            return Err(permanent(format!("gateway returned {}", status)));
        }
        if !status.is_success() {
            return Err(Error::Transfer {
                id: message.id,
                source: TransferError::Transient(format!("gateway returned {}", status)),
            });
        }

        let total_bytes = response.content_length().or(media.expected_size());
        let mut file = tokio::fs::File::create(destination).await?;
        let mut bytes_done = 0u64;
        progress.send_replace(Progress {
            bytes_done,
            total_bytes,
        });

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            bytes_done += chunk.len() as u64;
            progress.send_replace(Progress {
                bytes_done,
                total_bytes,
            });
        }
        file.flush().await?;

        Ok(())
    }
}
