//! Common test utilities for album-dl integration tests
//!
//! A wiremock server plays the message gateway; fixtures describe one
//! channel with an album and three standalone posts.

#![allow(dead_code)]

use album_dl::Config;
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Entity every fixture message belongs to
pub const ENTITY_ID: i64 = 1;

/// Handle the fixture channel resolves from
pub const HANDLE: &str = "test_channel";

/// Config pointing at `server`, writing under `dir`, with millisecond retry delays
pub fn gateway_config(server: &MockServer, dir: &Path) -> Config {
    let mut config = Config::default();
    config.source.base_url = server.uri();
    config.download.download_dir = dir.join("downloads");
    config.retry.initial_delay = Duration::from_millis(10);
    config.retry.max_delay = Duration::from_millis(10);
    config
}

/// One message as the gateway serializes it
pub fn message_json(id: i64, timestamp: &str, text: Option<&str>, album: Option<&str>, size: u64) -> Value {
    json!({
        "id": id,
        "timestamp": timestamp,
        "text": text,
        "group_id": album,
        "media": { "size": size, "extension": ".jpg" },
    })
}

/// Channel content: single 5, album G1 (10, 11; text only on 11), singles 20 and 30,
/// plus message 40 outside June 2024
pub fn channel_messages() -> Value {
    json!([
        message_json(5, "2024-06-02T08:00:00Z", None, None, 5),
        message_json(10, "2024-06-03T09:00:00Z", None, Some("G1"), 10),
        message_json(11, "2024-06-03T09:00:01Z", Some("Beach day"), Some("G1"), 11),
        message_json(20, "2024-06-04T10:00:00Z", None, None, 20),
        message_json(30, "2024-06-05T11:00:00Z", None, None, 30),
        message_json(40, "2024-07-02T12:00:00Z", Some("Too late"), None, 40),
    ])
}

/// Path the gateway serves a message's media at
pub fn media_path(id: i64) -> String {
    format!("/entities/{ENTITY_ID}/messages/{id}/media")
}

/// Mount entity resolution and message listing
pub async fn mount_channel(server: &MockServer, messages: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/entities/{HANDLE}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": ENTITY_ID,
            "title": "Test Channel",
            "username": HANDLE,
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/entities/{ENTITY_ID}/messages")))
        .respond_with(ResponseTemplate::new(200).set_body_json(messages))
        .mount(server)
        .await;
}

/// Serve `len` bytes for message `id`
pub async fn mount_media(server: &MockServer, id: i64, len: usize) {
    Mock::given(method("GET"))
        .and(path(media_path(id)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x5A; len]))
        .mount(server)
        .await;
}

/// Number of media requests the server has seen for message `id`
pub async fn media_requests(server: &MockServer, id: i64) -> usize {
    let wanted = media_path(id);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == wanted)
        .count()
}

/// Number of media requests of any message
pub async fn all_media_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path().ends_with("/media"))
        .count()
}
