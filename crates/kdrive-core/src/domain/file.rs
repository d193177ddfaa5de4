//! File tree node
//!
//! A [`File`] mirrors one node of the remote kDrive hierarchy. It carries the
//! attributes returned by the API plus a handful of local-only fields that the
//! server never sends:
//!
//! | Field          | Meaning                                                  |
//! |----------------|----------------------------------------------------------|
//! | `is_complete`  | every child of this folder has been loaded               |
//! | `is_offline`   | the user pinned the node for offline access              |
//! | `cursor`       | resume token for the next page of children               |
//! | `response_at`  | server timestamp of the last successful children fetch   |
//! | `version_code` | app version that last wrote the node                     |
//! | `path`         | lazily computed remote path                              |
//!
//! Children are not stored on the node. The store keeps an explicit
//! parent → child link index instead (see `kdrive-cache`).

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use super::newtypes::{file_uid, DriveId, FileId};

/// Kind of node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    File,
    Dir,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::File => "file",
            FileType::Dir => "dir",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(FileType::File),
            "dir" => Some(FileType::Dir),
            _ => None,
        }
    }
}

/// Capabilities the current user holds on a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rights {
    pub can_read: bool,
    pub can_write: bool,
    pub can_share: bool,
    pub can_delete: bool,
    pub can_rename: bool,
    pub can_move: bool,
    pub can_become_dropbox: bool,
    pub can_use_favorite: bool,
}

/// A category tag attached to a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCategory {
    pub category_id: i64,
    /// Unix seconds at which the tag was attached
    pub added_at: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// Upload-only "dropbox" configuration of a folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropBox {
    pub id: i64,
    pub url: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub has_password: bool,
}

/// Public share link of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLink {
    pub url: String,
    pub right: String,
    #[serde(default)]
    pub valid_until: Option<i64>,
    #[serde(default)]
    pub can_download: bool,
}

/// One node of the mirrored file tree
///
/// Equality and hashing only look at `(id, drive_id)`, so two copies of the
/// same node loaded at different times compare equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    pub id: FileId,
    pub drive_id: DriveId,
    pub parent_id: FileId,
    pub name: String,
    pub sorted_name: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub size: Option<i64>,
    pub created_at: Option<i64>,
    pub added_at: i64,
    pub last_modified_at: i64,
    pub deleted_at: Option<i64>,
    #[serde(default)]
    pub visibility: String,
    #[serde(default)]
    pub rights: Option<Rights>,
    #[serde(default)]
    pub categories: Vec<FileCategory>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub dropbox: Option<DropBox>,
    #[serde(default)]
    pub share_link: Option<ShareLink>,

    // Local-only state
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub is_offline: bool,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub response_at: i64,
    #[serde(default)]
    pub version_code: i32,
    #[serde(default)]
    pub path: Option<String>,
}

impl File {
    /// Creates a node with the given identity and every other field empty
    pub fn new(
        id: FileId,
        drive_id: DriveId,
        parent_id: FileId,
        name: impl Into<String>,
        file_type: FileType,
    ) -> Self {
        let name = name.into();
        Self {
            id,
            drive_id,
            parent_id,
            sorted_name: normalize_sort_key(&name),
            name,
            file_type,
            size: None,
            created_at: None,
            added_at: 0,
            last_modified_at: 0,
            deleted_at: None,
            visibility: String::new(),
            rights: None,
            categories: Vec::new(),
            color: None,
            is_favorite: false,
            dropbox: None,
            share_link: None,
            is_complete: false,
            is_offline: false,
            cursor: None,
            response_at: 0,
            version_code: 0,
            path: None,
        }
    }

    /// Shorthand for a folder node
    pub fn folder(
        id: FileId,
        drive_id: DriveId,
        parent_id: FileId,
        name: impl Into<String>,
    ) -> Self {
        Self::new(id, drive_id, parent_id, name, FileType::Dir)
    }

    /// Composite `{id}_{driveId}` store key
    pub fn uid(&self) -> String {
        file_uid(self.id, self.drive_id)
    }

    pub fn is_folder(&self) -> bool {
        self.file_type == FileType::Dir
    }

    /// Renames the node and refreshes its sort key
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.sorted_name = normalize_sort_key(&self.name);
    }

    /// Sorts categories by the time they were attached
    pub fn sort_categories(&mut self) {
        self.categories.sort_by_key(|c| c.added_at);
    }

    /// True when the node's position in the tree differs from `other`
    pub fn location_differs(&self, other: &File) -> bool {
        self.name != other.name || self.parent_id != other.parent_id
    }

    /// Copies the local-only state of `local` onto this (fresher, remote) copy
    ///
    /// The cached path is only kept when name and parent are unchanged.
    pub fn inherit_local_state(&mut self, local: &File) {
        self.is_complete = local.is_complete;
        self.is_offline = local.is_offline;
        self.cursor = local.cursor.clone();
        self.response_at = local.response_at;
        self.version_code = local.version_code;
        self.path = if self.location_differs(local) {
            None
        } else {
            local.path.clone()
        };
    }
}

impl PartialEq for File {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.drive_id == other.drive_id
    }
}

impl Eq for File {}

impl Hash for File {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.drive_id.hash(state);
    }
}

/// Computes the normalized sort key of a name
///
/// Decomposes to NFKD, drops combining marks and lowercases, so that
/// "Été" and "ete" sort together.
pub fn normalize_sort_key(name: &str) -> String {
    name.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}
