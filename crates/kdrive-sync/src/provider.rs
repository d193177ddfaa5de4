//! Folder fetch
//!
//! [`FolderFilesProvider`] serves folder listings cache-first. The cached
//! listing is returned untouched while the [`Staleness`] policy considers it
//! fresh; otherwise the first page is fetched and merged, replacing the
//! folder's previous child links. Further pages are appended one at a time,
//! each in its own transaction. Once a fetch completes a folder, changes made
//! since the listing started are caught up from its activity feed.
//!
//! Availability beats consistency: when the first page cannot be fetched the
//! cached listing is returned even if stale, and `None` only means that
//! nothing at all is known about the folder.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use kdrive_core::config::CacheConfig;
use kdrive_core::domain::{DriveId, File, FileId, SortType, SpecialFolder, UserDrive};
use kdrive_core::ports::{
    CursorPage, ErrorContext, FolderListing, IDriveApi, IErrorReporter, IFileRepository,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::reconciler::ActivityReconciler;
use crate::registry::RepositoryRegistry;
use crate::staleness::{StaleReason, Staleness};
use crate::SyncError;

// ============================================================================
// Request / response types
// ============================================================================

/// How a listing request may use the cache and the network
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Refetch even when the cached listing is fresh
    pub ignore_cache: bool,
    /// Never touch the network
    pub ignore_cloud: bool,
}

impl FetchOptions {
    pub fn refresh() -> Self {
        Self {
            ignore_cache: true,
            ..Self::default()
        }
    }

    pub fn cache_only() -> Self {
        Self {
            ignore_cloud: true,
            ..Self::default()
        }
    }
}

/// A folder and its sorted children
#[derive(Debug, Clone)]
pub struct FolderContents {
    pub folder: File,
    pub children: Vec<File>,
    /// True when served from the mirror without a successful fetch
    pub from_cache: bool,
}

/// One merged page of a listing, as streamed by the page loaders
#[derive(Debug, Clone)]
pub struct FolderPage {
    pub folder_id: FileId,
    /// Nodes of this page, in server order
    pub files: Vec<File>,
    pub is_first: bool,
    pub is_last: bool,
}

// ============================================================================
// FolderFilesProvider
// ============================================================================

/// Cache-first folder listings over the `IDriveApi` and `IFileRepository` ports
pub struct FolderFilesProvider {
    api: Arc<dyn IDriveApi>,
    stores: Arc<RepositoryRegistry>,
    reporter: Arc<dyn IErrorReporter>,
    reconciler: ActivityReconciler,
    staleness: Staleness,
    page_size: u32,
    app_version_code: i32,
}

impl FolderFilesProvider {
    pub fn new(
        api: Arc<dyn IDriveApi>,
        stores: Arc<RepositoryRegistry>,
        reporter: Arc<dyn IErrorReporter>,
        config: &CacheConfig,
    ) -> Self {
        let reconciler =
            ActivityReconciler::new(Arc::clone(&api), Arc::clone(&stores), Arc::clone(&reporter));
        Self {
            api,
            stores,
            reporter,
            reconciler,
            staleness: Staleness::from_config(config),
            page_size: config.page_size,
            app_version_code: config.app_version_code,
        }
    }

    pub fn reconciler(&self) -> &ActivityReconciler {
        &self.reconciler
    }

    pub fn staleness(&self) -> &Staleness {
        &self.staleness
    }

    /// Returns the folder and its children, fetching them when stale
    ///
    /// Storage failures are returned; network failures fall back to the cache.
    #[tracing::instrument(skip(self))]
    pub async fn get_folder_files(
        &self,
        user_drive: &UserDrive,
        folder_id: FileId,
        order: SortType,
        options: FetchOptions,
    ) -> Result<Option<FolderContents>> {
        let repo = self.stores.get(user_drive)?;
        let local = repo
            .get_by_id(folder_id)
            .await
            .context("Failed to load cached folder")?;

        if options.ignore_cloud {
            return match local {
                Some(folder) => Ok(Some(cached(repo.as_ref(), folder, order).await?)),
                None => Ok(None),
            };
        }

        let child_ids = match local {
            Some(_) => repo.child_ids(folder_id).await?,
            None => Vec::new(),
        };
        let reason = self
            .staleness
            .evaluate(local.as_ref(), &child_ids, options.ignore_cache, Utc::now());

        let Some(reason) = reason else {
            debug!("Serving fresh cached listing");
            return match local {
                Some(folder) => Ok(Some(cached(repo.as_ref(), folder, order).await?)),
                None => Ok(None),
            };
        };

        info!(%reason, "Refetching folder listing");
        if reason == StaleReason::DuplicateChildren {
            self.reporter.capture_anomaly(
                "duplicate children in cached listing",
                &ErrorContext::new("get_folder_files").tag("folder_id", folder_id),
            );
        }

        match self
            .fetch_first_page(repo.as_ref(), user_drive.drive_id, local.clone(), folder_id, order)
            .await
        {
            Ok(first) => {
                if first.is_last {
                    self.catch_up(user_drive, folder_id, &CancellationToken::new())
                        .await;
                }
                let folder = repo
                    .get_by_id(folder_id)
                    .await?
                    .ok_or(SyncError::FolderNotFound(folder_id))?;
                let children = repo.get_children(folder_id, order).await?;
                Ok(Some(FolderContents {
                    folder,
                    children,
                    from_cache: false,
                }))
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "First page failed, falling back to cache");
                match local {
                    Some(folder) => Ok(Some(cached(repo.as_ref(), folder, order).await?)),
                    None => Ok(None),
                }
            }
        }
    }

    /// Fetches and appends the page after the folder's stored cursor
    ///
    /// Returns `None` when the folder is not cached or has no pending cursor.
    /// A failed fetch leaves the partial listing as it is. The page that
    /// completes the folder triggers a catch-up.
    #[tracing::instrument(skip(self))]
    pub async fn load_next_page(
        &self,
        user_drive: &UserDrive,
        folder_id: FileId,
        order: SortType,
    ) -> Result<Option<FolderPage>> {
        let page = self.next_page(user_drive, folder_id, order).await?;
        if let Some(ref page) = page {
            if page.is_last {
                self.catch_up(user_drive, folder_id, &CancellationToken::new())
                    .await;
            }
        }
        Ok(page)
    }

    /// Loads every page of a folder, sending each one as soon as it is merged
    ///
    /// Cancellation is checked between pages. A failure after the first page
    /// stops the load and keeps what was merged so far. Once the listing
    /// completes, changes made while paging are caught up from the activity
    /// feed. Returns the number of pages merged.
    #[tracing::instrument(skip(self, cancel, sender))]
    pub async fn load_all_pages(
        &self,
        user_drive: &UserDrive,
        folder_id: FileId,
        order: SortType,
        cancel: &CancellationToken,
        sender: mpsc::Sender<FolderPage>,
    ) -> Result<u32> {
        let repo = self.stores.get(user_drive)?;
        let local = repo.get_by_id(folder_id).await?;

        let first = self
            .fetch_first_page(repo.as_ref(), user_drive.drive_id, local, folder_id, order)
            .await?;
        let mut is_last = first.is_last;
        let mut pages = 1;
        if sender.send(first).await.is_err() {
            debug!("Page receiver dropped");
            return Ok(pages);
        }

        while !is_last {
            if cancel.is_cancelled() {
                info!(pages, "Page load cancelled");
                return Ok(pages);
            }
            let page = match self.next_page(user_drive, folder_id, order).await {
                Ok(Some(page)) => page,
                Ok(None) => break,
                Err(e) => {
                    warn!(pages, error = %format!("{e:#}"), "Next page failed, keeping partial listing");
                    return Ok(pages);
                }
            };
            is_last = page.is_last;
            pages += 1;
            if sender.send(page).await.is_err() {
                debug!("Page receiver dropped");
                return Ok(pages);
            }
        }

        self.catch_up(user_drive, folder_id, cancel).await;
        Ok(pages)
    }

    /// Loads every page of a special folder into its local container
    ///
    /// Same streaming and cancellation contract as [`load_all_pages`](Self::load_all_pages).
    #[tracing::instrument(skip(self, cancel, sender))]
    pub async fn load_special_folder(
        &self,
        user_drive: &UserDrive,
        kind: SpecialFolder,
        order: SortType,
        cancel: &CancellationToken,
        sender: mpsc::Sender<FolderPage>,
    ) -> Result<u32> {
        let repo = self.stores.get(user_drive)?;
        let drive_id = user_drive.drive_id;
        let container = kind.container(drive_id);

        let mut cursor: Option<String> = None;
        let mut pages = 0;
        loop {
            if cancel.is_cancelled() {
                info!(pages, "Special folder load cancelled");
                break;
            }

            let page = match self
                .api
                .get_special_folder_files(drive_id, kind, cursor.as_deref(), order)
                .await
            {
                Ok(page) => page,
                Err(e) if pages == 0 => {
                    return Err(e.context(format!("Failed to list special folder {kind}")))
                }
                Err(e) => {
                    warn!(pages, error = %format!("{e:#}"), "Next page failed, keeping partial listing");
                    break;
                }
            };

            let is_first = pages == 0;
            let listing = self.listing_for(kind.id(), &page, is_first);
            repo.merge_listing_page(&container, &listing, &page.data).await?;
            pages += 1;

            let next = listing.cursor;
            let merged = FolderPage {
                folder_id: kind.id(),
                files: page.data,
                is_first,
                is_last: next.is_none(),
            };
            if sender.send(merged).await.is_err() {
                debug!("Page receiver dropped");
                break;
            }
            match next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(pages)
    }

    /// Cached content of a special folder, without any network call
    pub async fn get_special_folder(
        &self,
        user_drive: &UserDrive,
        kind: SpecialFolder,
        order: SortType,
    ) -> Result<Vec<File>> {
        let repo = self.stores.get(user_drive)?;
        repo.get_children(kind.id(), order).await
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    async fn next_page(
        &self,
        user_drive: &UserDrive,
        folder_id: FileId,
        order: SortType,
    ) -> Result<Option<FolderPage>> {
        let repo = self.stores.get(user_drive)?;
        let Some(folder) = repo.get_by_id(folder_id).await? else {
            return Ok(None);
        };
        let Some(cursor) = folder.cursor.clone() else {
            debug!("No pending cursor");
            return Ok(None);
        };

        let page = self
            .fetch_page(repo.as_ref(), user_drive.drive_id, &folder, false, Some(&cursor), order)
            .await?;
        Ok(Some(page))
    }

    /// Replays the activity feed of a freshly completed folder
    ///
    /// Failures only cost freshness and are logged.
    async fn catch_up(
        &self,
        user_drive: &UserDrive,
        folder_id: FileId,
        cancel: &CancellationToken,
    ) {
        if let Err(e) = self.reconciler.reconcile(user_drive, folder_id, cancel).await {
            warn!(%folder_id, error = %format!("{e:#}"), "Activity catch-up failed");
        }
    }

    /// Resolves the folder node, then fetches and merges the first page
    ///
    /// The drive root has no parent listing to refresh it, so its own details
    /// are always refetched. So are folders not cached yet.
    async fn fetch_first_page(
        &self,
        repo: &dyn IFileRepository,
        drive_id: DriveId,
        local: Option<File>,
        folder_id: FileId,
        order: SortType,
    ) -> Result<FolderPage> {
        let (folder, details_fetched) = match local {
            Some(local) if !folder_id.is_root() => (local, false),
            local => {
                let remote = self
                    .api
                    .get_file_details(drive_id, folder_id)
                    .await
                    .with_context(|| format!("Failed to fetch details of folder {folder_id}"))?;
                match (remote, local) {
                    (Some(remote), _) => (remote, true),
                    (None, Some(local)) => (local, false),
                    (None, None) => return Err(SyncError::FolderNotFound(folder_id).into()),
                }
            }
        };

        self.fetch_page(repo, drive_id, &folder, details_fetched, None, order)
            .await
    }

    /// Fetches one page after `cursor` (first page when `None`) and merges it
    ///
    /// `folder` only seeds the row when it is not stored; the stored row takes
    /// the page's bookkeeping unless `details_fetched` says `folder` is newer.
    async fn fetch_page(
        &self,
        repo: &dyn IFileRepository,
        drive_id: DriveId,
        folder: &File,
        details_fetched: bool,
        cursor: Option<&str>,
        order: SortType,
    ) -> Result<FolderPage> {
        let folder_id = folder.id;
        let is_first = cursor.is_none();
        let page = self
            .api
            .get_folder_files(drive_id, folder_id, cursor, order)
            .await
            .with_context(|| format!("Failed to list folder {folder_id}"))?;

        let listing = FolderListing {
            details_fetched,
            ..self.listing_for(folder_id, &page, is_first)
        };
        repo.merge_listing_page(folder, &listing, &page.data)
            .await
            .context("Failed to merge listing page")?;

        debug!(
            %folder_id,
            count = page.data.len(),
            is_complete = listing.is_complete,
            "Merged listing page"
        );
        Ok(FolderPage {
            folder_id,
            files: page.data,
            is_first,
            is_last: listing.cursor.is_none(),
        })
    }

    /// Folder bookkeeping for `page`
    ///
    /// `response_at` only moves on the first page, so a catch-up after a
    /// multi-page load starts from when the listing began.
    fn listing_for(
        &self,
        folder_id: FileId,
        page: &CursorPage<File>,
        is_first: bool,
    ) -> FolderListing {
        let response_at = if !is_first {
            None
        } else if page.response_at > 0 {
            Some(page.response_at)
        } else {
            self.reporter.capture_anomaly(
                "listing returned no response_at",
                &ErrorContext::new("fetch_page").tag("folder_id", folder_id),
            );
            None
        };

        FolderListing {
            replace_existing: is_first,
            is_complete: page.data.len() < self.page_size as usize || page.is_last(),
            cursor: page.next_cursor().map(str::to_string),
            response_at,
            version_code: self.app_version_code,
            details_fetched: false,
        }
    }
}

/// Cached folder with its children sorted by `order`
async fn cached(repo: &dyn IFileRepository, folder: File, order: SortType) -> Result<FolderContents> {
    let children = repo.get_children(folder.id, order).await?;
    Ok(FolderContents {
        folder,
        children,
        from_cache: true,
    })
}
