//! Downloader behaviour tests, grouped by concern

use super::test_helpers::*;
use super::*;
use crate::config::FolderCollision;
use crate::types::{Event, JobOutcome, Message};
use std::time::Duration;


/// Resolve the mock channel and group its June 2024 messages
async fn june_groups(downloader: &Downloader) -> Vec<ContentGroup> {
    let entity = downloader.resolve("channel").await.unwrap();
    downloader
        .fetch_groups(&entity, &june_window())
        .await
        .unwrap()
}

/// Download every group, in order
async fn download_all(downloader: &Downloader, groups: &[ContentGroup]) -> Vec<GroupReport> {
    let refs: Vec<&ContentGroup> = groups.iter().collect();
    downloader.download_groups(&refs).await
}

#[tokio::test]
async fn resolve_rejects_empty_identifier() {
    let (downloader, _source, _temp_dir) = create_test_downloader(MockSource::default());

    let result = downloader.resolve("   ").await;

    assert!(matches!(result, Err(Error::InputValidation(_))));
}

#[tokio::test]
async fn resolve_surfaces_unknown_target() {
    let (downloader, _source, _temp_dir) = create_test_downloader(MockSource::default());

    let result = downloader.resolve("missing").await;

    assert!(matches!(result, Err(Error::Resolution { .. })));
}

#[tokio::test]
async fn events_follow_job_lifecycle() {
    let source = MockSource::new(vec![media_message(1, 2, 8)]);
    let (downloader, _source, _temp_dir) = create_test_downloader(source);
    let mut events = downloader.subscribe();

    let groups = june_groups(&downloader).await;
    download_all(&downloader, &groups).await;

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(matches!(seen.first(), Some(Event::GroupStarted { files: 1, .. })));
    assert!(
        seen.iter()
            .any(|e| matches!(e, Event::TransferStarted { total_bytes: Some(8), .. }))
    );
    assert!(
        seen.iter()
            .any(|e| matches!(e, Event::TransferComplete { bytes: 8, .. }))
    );
    assert!(matches!(
        seen.last(),
        Some(Event::GroupSettled {
            downloaded: 1,
            skipped: 0,
            failed: 0,
            ..
        })
    ));
}
