//! Activity reconciliation
//!
//! Catches a cached folder up with the server by replaying the folder's
//! activity feed instead of relisting it. Each page of the feed is applied
//! before the next one is requested, and cancellation is honored between
//! pages only, so a cancelled pass never leaves a half-applied page behind.
//!
//! The feed may deliver the same change more than once. Within one pass an
//! activity is skipped when an activity for the same file with an equal or
//! later `created_at` has already been applied.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use kdrive_core::domain::{ActivityEffect, File, FileActivity, FileId, UserDrive};
use kdrive_core::ports::{DeleteOptions, ErrorContext, IDriveApi, IErrorReporter, IFileRepository};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::registry::RepositoryRegistry;

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Feed pages fetched
    pub pages: u32,
    /// Activities that reached the tree
    pub applied: u32,
    /// Activities superseded by an already applied one for the same file
    pub duplicates: u32,
    /// Informational activities and activities with nothing to act on
    pub ignored: u32,
    /// Activities whose store write failed (reported, not returned)
    pub failed: u32,
    /// New bookkeeping timestamp of the folder, when one was recorded
    pub response_at: Option<i64>,
    pub cancelled: bool,
}

/// What applying one activity did
enum Outcome {
    Applied,
    Ignored,
}

/// Replays the activity feed of a folder onto the mirror
pub struct ActivityReconciler {
    api: Arc<dyn IDriveApi>,
    stores: Arc<RepositoryRegistry>,
    reporter: Arc<dyn IErrorReporter>,
}

impl ActivityReconciler {
    pub fn new(
        api: Arc<dyn IDriveApi>,
        stores: Arc<RepositoryRegistry>,
        reporter: Arc<dyn IErrorReporter>,
    ) -> Self {
        Self {
            api,
            stores,
            reporter,
        }
    }

    /// Pages through the feed since the folder's last fetch and applies it
    ///
    /// A folder that is not cached has nothing to catch up and yields an
    /// empty summary. Feed failures abort the pass without advancing the
    /// folder's bookkeeping; store failures on single activities are
    /// reported and skipped.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn reconcile(
        &self,
        user_drive: &UserDrive,
        folder_id: FileId,
        cancel: &CancellationToken,
    ) -> Result<ReconcileSummary> {
        let repo = self.stores.get(user_drive)?;
        let mut summary = ReconcileSummary::default();

        let Some(folder) = repo
            .get_by_id(folder_id)
            .await
            .context("Failed to load folder to reconcile")?
        else {
            debug!("Folder not cached, nothing to reconcile");
            return Ok(summary);
        };

        let since = (folder.response_at > 0).then_some(folder.response_at);
        let mut cursor: Option<String> = None;
        let mut last_applied: HashMap<FileId, i64> = HashMap::new();
        let mut response_at = 0;

        loop {
            if cancel.is_cancelled() {
                info!(pages = summary.pages, "Reconciliation cancelled");
                summary.cancelled = true;
                return Ok(summary);
            }

            let page = self
                .api
                .get_file_activities(user_drive.drive_id, folder_id, cursor.as_deref(), since, false)
                .await
                .with_context(|| format!("Failed to fetch activities of folder {folder_id}"))?;
            summary.pages += 1;
            response_at = page.response_at;

            for activity in &page.data {
                if let Some(&applied_at) = last_applied.get(&activity.file_id) {
                    if applied_at >= activity.created_at {
                        summary.duplicates += 1;
                        continue;
                    }
                }

                match self.apply(repo.as_ref(), folder_id, activity).await {
                    Ok(Outcome::Applied) => {
                        summary.applied += 1;
                        last_applied.insert(activity.file_id, activity.created_at);
                    }
                    Ok(Outcome::Ignored) => summary.ignored += 1,
                    Err(e) => {
                        summary.failed += 1;
                        warn!(file_id = %activity.file_id, error = %e, "Failed to apply activity");
                        self.reporter.capture_error(
                            &e,
                            &ErrorContext::new("reconcile")
                                .tag("folder_id", folder_id)
                                .tag("file_id", activity.file_id)
                                .tag("action", format!("{:?}", activity.action)),
                        );
                    }
                }
            }

            match page.next_cursor() {
                Some(next) => cursor = Some(next.to_string()),
                None => break,
            }
        }

        if response_at > 0 {
            repo.update_in_place(
                folder_id,
                Box::new(move |f: &mut File| f.response_at = response_at),
            )
            .await;
            summary.response_at = Some(response_at);
        } else {
            self.reporter.capture_anomaly(
                "activity feed returned no response_at",
                &ErrorContext::new("reconcile").tag("folder_id", folder_id),
            );
        }

        info!(
            pages = summary.pages,
            applied = summary.applied,
            duplicates = summary.duplicates,
            ignored = summary.ignored,
            "Reconciled folder"
        );
        Ok(summary)
    }

    async fn apply(
        &self,
        repo: &dyn IFileRepository,
        folder_id: FileId,
        activity: &FileActivity,
    ) -> Result<Outcome> {
        let file_id = activity.file_id;
        let is_child = repo.child_ids(folder_id).await?.contains(&file_id);

        match activity.action.effect() {
            ActivityEffect::Detach => {
                if !is_child {
                    return Ok(Outcome::Ignored);
                }
                repo.detach_child(folder_id, file_id).await?;
            }
            ActivityEffect::Delete => {
                if !is_child {
                    return Ok(Outcome::Ignored);
                }
                repo.delete(file_id, DeleteOptions::single()).await;
            }
            ActivityEffect::Insert => {
                let Some(file) = &activity.file else {
                    return Ok(Outcome::Ignored);
                };
                if is_child {
                    repo.save_file(file).await?;
                } else {
                    repo.insert_child(folder_id, file).await?;
                }
            }
            ActivityEffect::Update => match &activity.file {
                Some(file) => {
                    if is_child || repo.get_by_id(file_id).await?.is_some() {
                        repo.save_file(file).await?;
                    } else if file.parent_id == folder_id {
                        repo.insert_child(folder_id, file).await?;
                    } else {
                        return Ok(Outcome::Ignored);
                    }
                }
                None => repo.delete(file_id, DeleteOptions::single()).await,
            },
            ActivityEffect::Ignore => return Ok(Outcome::Ignored),
        }

        debug!(%file_id, action = ?activity.action, "Applied activity");
        Ok(Outcome::Applied)
    }
}
