//! kDrive Sync - Keeps the local file-tree mirror in step with the server
//!
//! Provides:
//! - Cache-first folder listings with a staleness policy
//! - Cursor-paginated page loading, streamed page by page
//! - Incremental catch-up through the per-folder activity feed
//! - Write-through mutations (remote first, mirror on success)
//!
//! ## Modules
//!
//! - [`registry`] - One repository per `UserDrive` store
//! - [`staleness`] - When cached children must be refetched
//! - [`provider`] - [`FolderFilesProvider`], folder fetch and page loading
//! - [`reconciler`] - [`ActivityReconciler`], activity feed application
//! - [`actions`] - [`FileActions`], write-through mutations
//!
//! Every entry point takes the [`UserDrive`](kdrive_core::domain::UserDrive)
//! it operates on; nothing here keeps a "current drive".

pub mod actions;
pub mod provider;
pub mod reconciler;
pub mod registry;
pub mod staleness;

pub use actions::FileActions;
pub use provider::{FetchOptions, FolderContents, FolderFilesProvider, FolderPage};
pub use reconciler::{ActivityReconciler, ReconcileSummary};
pub use registry::RepositoryRegistry;
pub use staleness::{StaleReason, Staleness};

use kdrive_core::domain::{FileId, UserDrive};
use thiserror::Error;

/// Errors raised by the orchestration itself (as opposed to its adapters)
#[derive(Debug, Error)]
pub enum SyncError {
    /// No store has been registered for this context
    #[error("No store open for {0}")]
    StoreNotOpen(UserDrive),

    /// The folder is neither cached nor known to the server
    #[error("Folder {0} not found")]
    FolderNotFound(FileId),
}
