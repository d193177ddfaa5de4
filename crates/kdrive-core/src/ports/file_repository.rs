//! File repository port (driven/secondary port)
//!
//! This module defines the interface of the local file-tree mirror: point
//! lookups, ordered children listings, idempotent merges of server pages,
//! recursive deletion, in-place updates, orphan sweeping, search and path
//! resolution.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific.
//! - A repository instance is bound to one `UserDrive` store; ids are resolved
//!   against the drive of that store.
//! - `delete` and `update_in_place` are best effort: per-node storage failures
//!   are reported to the error reporter and never returned to the caller.

use std::collections::HashSet;

use crate::domain::{File, FileId, SortType};

/// Mutation applied by [`IFileRepository::update_in_place`]
pub type FileMutator = Box<dyn FnOnce(&mut File) + Send>;

// ============================================================================
// DeleteOptions
// ============================================================================

/// Options for [`IFileRepository::delete`]
///
/// # Example
///
/// ```
/// use kdrive_core::domain::FileId;
/// use kdrive_core::ports::DeleteOptions;
///
/// let options = DeleteOptions::recursive().keep_cache_file(FileId::new(12));
/// assert!(options.recursive);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    /// Delete the whole subtree, children before parents
    pub recursive: bool,
    /// Nodes whose cached blob must not be released
    pub keep_cache_file_ids: HashSet<FileId>,
    /// Nodes that are detached from their parents but not removed
    pub keep_row_ids: HashSet<FileId>,
}

impl DeleteOptions {
    /// Deletes only the node itself
    pub fn single() -> Self {
        Self::default()
    }

    /// Deletes the node and its whole subtree
    pub fn recursive() -> Self {
        Self {
            recursive: true,
            ..Self::default()
        }
    }

    pub fn keep_cache_file(mut self, id: FileId) -> Self {
        self.keep_cache_file_ids.insert(id);
        self
    }

    pub fn keep_row(mut self, id: FileId) -> Self {
        self.keep_row_ids.insert(id);
        self
    }
}

// ============================================================================
// FolderListing
// ============================================================================

/// Folder bookkeeping produced by one fetched listing page
///
/// Applied by [`IFileRepository::merge_listing_page`] to the folder row as it
/// is stored when the merge transaction runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderListing {
    /// Replace the folder's child links instead of appending to them
    pub replace_existing: bool,
    pub is_complete: bool,
    pub cursor: Option<String>,
    /// `None` keeps the stored value
    pub response_at: Option<i64>,
    pub version_code: i32,
    /// The caller's folder copy was just fetched from the server, so its
    /// remote fields win over the stored ones
    pub details_fetched: bool,
}

impl FolderListing {
    /// Takes the bookkeeping `folder` already carries, remote fields included
    pub fn from_folder(folder: &File, replace_existing: bool) -> Self {
        Self {
            replace_existing,
            is_complete: folder.is_complete,
            cursor: folder.cursor.clone(),
            response_at: Some(folder.response_at),
            version_code: folder.version_code,
            details_fetched: true,
        }
    }

    /// Writes the bookkeeping onto `folder`
    pub fn apply(&self, folder: &mut File) {
        folder.is_complete = self.is_complete;
        folder.cursor = self.cursor.clone();
        folder.version_code = self.version_code;
        if let Some(response_at) = self.response_at {
            folder.response_at = response_at;
        }
    }
}

// ============================================================================
// IFileRepository trait
// ============================================================================

/// Port trait for the local file-tree mirror
#[async_trait::async_trait]
pub trait IFileRepository: Send + Sync {
    // --- Reads ---

    /// Point lookup
    async fn get_by_id(&self, id: FileId) -> anyhow::Result<Option<File>>;

    /// Resolves the parent through the reverse link index
    ///
    /// When a node is linked from several containers, the first parent with a
    /// strictly positive id wins over synthetic containers.
    async fn get_parent(&self, id: FileId) -> anyhow::Result<Option<File>>;

    /// Children of a folder, deduplicated by id and sorted by `order`
    async fn get_children(&self, folder_id: FileId, order: SortType) -> anyhow::Result<Vec<File>>;

    /// Raw child id list in link order, duplicates included
    async fn child_ids(&self, folder_id: FileId) -> anyhow::Result<Vec<FileId>>;

    /// Case- and diacritic-insensitive name search over the whole mirror
    async fn search(&self, query: &str, order: SortType) -> anyhow::Result<Vec<File>>;

    // --- Merges ---

    /// Merges one fetched page of a folder's children in a single transaction
    ///
    /// The folder row is re-read inside the transaction and `listing` is
    /// applied to it. `folder` only replaces the stored remote fields when
    /// `listing.details_fetched` is set, or when no row exists yet; the stored
    /// `is_offline` and cached `path` are kept either way. With
    /// `listing.replace_existing` the child links are replaced, otherwise new
    /// children are appended. Every child carries its local-only state
    /// forward from the latest local copy.
    async fn merge_listing_page(
        &self,
        folder: &File,
        listing: &FolderListing,
        children: &[File],
    ) -> anyhow::Result<()>;

    /// Merges a folder whose bookkeeping and remote fields come from `folder`
    async fn upsert_folder(
        &self,
        folder: &File,
        children: &[File],
        replace_existing: bool,
    ) -> anyhow::Result<()> {
        let listing = FolderListing::from_folder(folder, replace_existing);
        self.merge_listing_page(folder, &listing, children).await
    }

    /// Merges one node and links it under `folder_id` if not already linked
    async fn insert_child(&self, folder_id: FileId, file: &File) -> anyhow::Result<()>;

    /// Links an already stored node under `folder_id`
    ///
    /// Returns `false`, linking nothing, when the node is not stored.
    async fn attach_child(&self, folder_id: FileId, file_id: FileId) -> anyhow::Result<bool>;

    /// Removes the link between a folder and one of its children
    async fn detach_child(&self, folder_id: FileId, file_id: FileId) -> anyhow::Result<()>;

    /// Merges one node, keeping its local-only state and links
    async fn save_file(&self, file: &File) -> anyhow::Result<()>;

    // --- Best-effort mutations ---

    /// Deletes a node (and optionally its subtree), releasing cached blobs
    async fn delete(&self, id: FileId, options: DeleteOptions);

    /// Applies `mutator` to the node inside a transaction
    ///
    /// No-op when the node does not exist (anymore). When the mutator renames
    /// or moves the node, its cached path and its subtree's are dropped.
    async fn update_in_place(&self, id: FileId, mutator: FileMutator);

    /// Deletes every positive-id node, other than the root, with no parent link
    ///
    /// Removed nodes release their cached blobs like [`delete`](Self::delete);
    /// a node that fails is reported and left for the next sweep. Returns the
    /// number of removed nodes.
    async fn remove_orphans(&self) -> anyhow::Result<u64>;

    // --- Paths ---

    /// Returns the cached path, computing and caching it when missing
    async fn get_path(&self, id: FileId) -> anyhow::Result<Option<String>>;

    /// Computes the remote path by walking parents up to the root
    async fn generate_path(&self, id: FileId) -> anyhow::Result<Option<String>>;

    /// Caches a computed path on the node
    async fn save_path(&self, id: FileId, path: &str) -> anyhow::Result<()>;
}
