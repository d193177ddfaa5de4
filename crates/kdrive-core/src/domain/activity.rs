//! File activity feed entries
//!
//! The server keeps a per-folder changelog. Each entry names the file it
//! concerns, what happened to it and, for most actions, the file as it looks
//! after the change. [`FileAction::effect`] collapses the many action names
//! into the handful of ways an entry can touch the local tree.

use serde::{Deserialize, Serialize};

use super::file::File;
use super::newtypes::FileId;

/// Action name as reported by the activity feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    FileCreate,
    FileMoveIn,
    FileMoveOut,
    FileRename,
    FileTrash,
    FileDelete,
    FileRestore,
    FileUpdate,
    FileAccess,
    FileFavoriteCreate,
    FileFavoriteRemove,
    FileCategorize,
    FileUncategorize,
    FileColorUpdate,
    FileColorDelete,
    FileShareCreate,
    FileShareUpdate,
    FileShareDelete,
    ShareLinkCreate,
    ShareLinkUpdate,
    ShareLinkDelete,
    ShareLinkShow,
    CollaborativeFolderCreate,
    CollaborativeFolderUpdate,
    CollaborativeFolderDelete,
    CollaborativeUserAccess,
    CollaborativeUserCreate,
    CollaborativeUserDelete,
    CommentCreate,
    CommentUpdate,
    CommentDelete,
    CommentLike,
    CommentUnlike,
    CommentResolve,
    #[serde(other)]
    Unknown,
}

/// How an activity touches the local tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityEffect {
    /// Remove the node from the folder's children, keep the row
    Detach,
    /// Delete the node (non-recursive)
    Delete,
    /// Add the node as a child, or update it if already there
    Insert,
    /// Merge the payload over the local node; delete it when there is none
    Update,
    /// Informational only
    Ignore,
}

impl FileAction {
    pub fn effect(&self) -> ActivityEffect {
        use FileAction::*;
        match self {
            FileMoveOut => ActivityEffect::Detach,
            FileTrash | FileDelete => ActivityEffect::Delete,
            FileCreate | FileMoveIn | FileRestore => ActivityEffect::Insert,
            FileUpdate | FileRename | FileCategorize | FileUncategorize | FileColorUpdate
            | FileColorDelete | FileShareCreate | FileShareUpdate | FileShareDelete
            | ShareLinkCreate | ShareLinkUpdate | ShareLinkDelete | FileFavoriteCreate
            | FileFavoriteRemove => ActivityEffect::Update,
            FileAccess
            | ShareLinkShow
            | CollaborativeFolderCreate
            | CollaborativeFolderUpdate
            | CollaborativeFolderDelete
            | CollaborativeUserAccess
            | CollaborativeUserCreate
            | CollaborativeUserDelete
            | CommentCreate
            | CommentUpdate
            | CommentDelete
            | CommentLike
            | CommentUnlike
            | CommentResolve
            | Unknown => ActivityEffect::Ignore,
        }
    }
}

/// One entry of the activity feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileActivity {
    pub id: i64,
    pub file_id: FileId,
    pub action: FileAction,
    /// The file after the change, when the server sends it
    pub file: Option<File>,
    /// Unix seconds
    pub created_at: i64,
}
