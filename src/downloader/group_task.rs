//! Per-group processing: folder planning, description file, job fan-out

use std::collections::HashMap;
use std::path::Path;

use super::Downloader;
use super::transfer_job::DownloadJob;
use crate::config::FolderCollision;
use crate::error::Error;
use crate::grouping::{ContentGroup, fallback_folder_name};
use crate::types::{Event, GroupReport, JobOutcome, JobReport};

/// Name of the file holding a group's description
pub(crate) const DESCRIPTION_FILE: &str = "description.txt";

/// Folder name for each group, in input order
///
/// Under [`FolderCollision::Merge`] groups with equal names share one folder.
/// Under [`FolderCollision::Disambiguate`] every group whose name is shared gets
/// `_<YYYY-MM-DD>_Msg<id>` appended.
pub(crate) fn plan_folders(groups: &[&ContentGroup], policy: FolderCollision) -> Vec<String> {
    let names: Vec<String> = groups.iter().map(|g| g.folder_name()).collect();
    if policy == FolderCollision::Merge {
        return names;
    }

    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    for name in &names {
        *occurrences.entry(name.as_str()).or_default() += 1;
    }

    names
        .iter()
        .zip(groups)
        .map(|(name, group)| {
            if occurrences.get(name.as_str()).copied().unwrap_or(0) > 1 {
                format!("{name}_{}", fallback_folder_name(group.first()))
            } else {
                name.clone()
            }
        })
        .collect()
}

impl Downloader {
    /// Materialize one group into `<download_dir>/<folder_name>`
    ///
    /// Filesystem failures on the folder or description are logged and folded
    /// into the report; they never abort sibling groups.
    pub(crate) async fn download_group(
        &self,
        group: &ContentGroup,
        folder_name: String,
    ) -> GroupReport {
        let folder = self.config.download.download_dir.join(&folder_name);
        let jobs: Vec<DownloadJob> = group
            .messages()
            .iter()
            .filter(|m| m.has_media())
            .map(|m| DownloadJob::new(m.clone(), &folder))
            .collect();

        if let Err(e) = tokio::fs::create_dir_all(&folder).await {
            let error = Error::FilesystemWrite {
                path: folder.clone(),
                reason: e.to_string(),
            };
            tracing::error!(error = %error, "Cannot create group folder");
            return GroupReport {
                jobs: jobs
                    .into_iter()
                    .map(|job| {
                        let report = job.failed(0, error.to_string());
                        self.emit_failed(&report);
                        report
                    })
                    .collect(),
                folder,
                description_written: false,
            };
        }

        tracing::info!(
            folder = %folder.display(),
            files = jobs.len(),
            first_id = %group.first().id,
            "Processing group"
        );
        self.event_tx
            .send(Event::GroupStarted {
                folder: folder.clone(),
                files: jobs.len(),
            })
            .ok();

        let description_written = write_description(&folder, group.description()).await;

        let reports = futures::future::join_all(jobs.into_iter().map(|job| self.run_job(job))).await;

        let report = GroupReport {
            folder,
            description_written,
            jobs: reports,
        };
        self.event_tx
            .send(Event::GroupSettled {
                folder: report.folder.clone(),
                downloaded: report.downloaded(),
                skipped: report.skipped(),
                failed: report.failed(),
            })
            .ok();
        report
    }

    pub(super) fn emit_failed(&self, report: &JobReport) {
        if let JobOutcome::Failed { reason, .. } = &report.outcome {
            self.event_tx
                .send(Event::TransferFailed {
                    id: report.id,
                    error: reason.clone(),
                })
                .ok();
        }
    }
}

/// Write `description` to the group folder, replacing any previous file
///
/// Empty descriptions write nothing. Returns whether the file was written.
async fn write_description(folder: &Path, description: &str) -> bool {
    if description.is_empty() {
        return false;
    }
    let path = folder.join(DESCRIPTION_FILE);
    match tokio::fs::write(&path, description.as_bytes()).await {
        Ok(()) => true,
        Err(e) => {
            let error = Error::FilesystemWrite {
                path,
                reason: e.to_string(),
            };
            tracing::warn!(error = %error, "Failed to write group description");
            false
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Message, MessageId};
    use chrono::{TimeZone, Utc};

    fn group(id: i64, day: u32, text: &str) -> ContentGroup {
        ContentGroup::new(vec![Message {
            id: MessageId(id),
            timestamp: Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap(),
            text: Some(text.to_string()),
            group_id: None,
            media: None,
        }])
        .unwrap()
    }

    #[test]
    fn merge_keeps_shared_names() {
        let a = group(1, 1, "Trip");
        let b = group(2, 2, "Trip");
        let folders = plan_folders(&[&a, &b], FolderCollision::Merge);
        assert_eq!(folders, vec!["Trip", "Trip"]);
    }

    #[test]
    fn disambiguate_suffixes_every_colliding_group() {
        let a = group(1, 1, "Trip");
        let b = group(2, 2, "Trip");
        let c = group(3, 3, "Other");
        let folders = plan_folders(&[&a, &b, &c], FolderCollision::Disambiguate);
        assert_eq!(
            folders,
            vec!["Trip_2024-05-01_Msg1", "Trip_2024-05-02_Msg2", "Other"]
        );
    }

    #[tokio::test]
    async fn empty_description_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!write_description(dir.path(), "").await);
        assert!(!dir.path().join(DESCRIPTION_FILE).exists());
    }

    #[tokio::test]
    async fn description_overwrites_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DESCRIPTION_FILE), "old and longer text").unwrap();

        assert!(write_description(dir.path(), "new").await);
        let content = std::fs::read_to_string(dir.path().join(DESCRIPTION_FILE)).unwrap();
        assert_eq!(content, "new");
    }
}
