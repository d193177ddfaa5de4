//! Remote API port (driven/secondary port)
//!
//! This module defines the subset of the kDrive REST API the cache layer
//! depends on: cursor-paginated listings, file details, the activity feed and
//! the mutations that are written through to the local mirror.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific
//!   and the orchestration only distinguishes "succeeded" from "failed".
//! - Uses `#[async_trait]` for async trait methods.
//! - Authentication is out of scope; implementations hold a ready-to-use token.

use serde::{Deserialize, Serialize};

use crate::domain::{DriveId, DropBox, File, FileActivity, FileId, SortType, SpecialFolder};

// ============================================================================
// CursorPage
// ============================================================================

/// One page of a cursor-paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursorPage<T> {
    pub data: Vec<T>,
    /// Opaque token for the next page
    pub cursor: Option<String>,
    /// Whether the server has more data after this page
    pub has_more: bool,
    /// Server timestamp (unix seconds) at which the page was produced
    pub response_at: i64,
}

impl<T> CursorPage<T> {
    /// A final page with no continuation
    pub fn last(data: Vec<T>, response_at: i64) -> Self {
        Self {
            data,
            cursor: None,
            has_more: false,
            response_at,
        }
    }

    /// A page followed by more data at `cursor`
    pub fn with_more(data: Vec<T>, cursor: impl Into<String>, response_at: i64) -> Self {
        Self {
            data,
            cursor: Some(cursor.into()),
            has_more: true,
            response_at,
        }
    }

    /// Cursor of the next page, if there is one
    ///
    /// `has_more` without a cursor is treated as the last page.
    pub fn next_cursor(&self) -> Option<&str> {
        if self.has_more {
            self.cursor.as_deref()
        } else {
            None
        }
    }

    /// True when no further page can be requested
    pub fn is_last(&self) -> bool {
        self.next_cursor().is_none()
    }
}

// ============================================================================
// IDriveApi trait
// ============================================================================

/// Port trait for the kDrive REST API
///
/// ## Implementation Notes
///
/// - A `None` cursor requests the first page.
/// - `get_file_details` returns `Ok(None)` when the server no longer knows the
///   file (404), and `Err` for transport or server failures.
/// - Mutations return `Ok(())` only when the server confirmed the change.
#[async_trait::async_trait]
pub trait IDriveApi: Send + Sync {
    /// Lists the direct children of a folder
    async fn get_folder_files(
        &self,
        drive_id: DriveId,
        folder_id: FileId,
        cursor: Option<&str>,
        order: SortType,
    ) -> anyhow::Result<CursorPage<File>>;

    /// Retrieves one file's current metadata
    async fn get_file_details(
        &self,
        drive_id: DriveId,
        file_id: FileId,
    ) -> anyhow::Result<Option<File>>;

    /// Pages through the activity feed of a folder
    ///
    /// `since` (unix seconds) restricts the feed to activities after that
    /// point; `recursive` includes activities of nested folders.
    async fn get_file_activities(
        &self,
        drive_id: DriveId,
        folder_id: FileId,
        cursor: Option<&str>,
        since: Option<i64>,
        recursive: bool,
    ) -> anyhow::Result<CursorPage<FileActivity>>;

    /// Lists the content of a synthetic special folder
    async fn get_special_folder_files(
        &self,
        drive_id: DriveId,
        folder: SpecialFolder,
        cursor: Option<&str>,
        order: SortType,
    ) -> anyhow::Result<CursorPage<File>>;

    /// Renames a file or folder
    async fn rename_file(&self, drive_id: DriveId, file_id: FileId, name: &str)
        -> anyhow::Result<()>;

    /// Moves a file or folder to the trash
    async fn trash_file(&self, drive_id: DriveId, file_id: FileId) -> anyhow::Result<()>;

    /// Sets the color of a folder
    async fn update_color(
        &self,
        drive_id: DriveId,
        file_id: FileId,
        color: &str,
    ) -> anyhow::Result<()>;

    /// Marks a file as favorite
    async fn add_favorite(&self, drive_id: DriveId, file_id: FileId) -> anyhow::Result<()>;

    /// Removes a file from favorites
    async fn remove_favorite(&self, drive_id: DriveId, file_id: FileId) -> anyhow::Result<()>;

    /// Turns a folder into a dropbox
    async fn create_dropbox(&self, drive_id: DriveId, file_id: FileId)
        -> anyhow::Result<DropBox>;

    /// Removes the dropbox configuration of a folder
    async fn delete_dropbox(&self, drive_id: DriveId, file_id: FileId) -> anyhow::Result<()>;
}
