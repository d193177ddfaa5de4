//! Wire models
//!
//! JSON shapes of the kDrive file endpoints and their conversion into the
//! domain types of `kdrive-core`. The server sends a few fields under other
//! names than the domain uses (`capabilities`, `sharelink`); those are
//! renamed here so nothing outside this module sees the wire layout.

use kdrive_core::domain::{
    DriveId, DropBox, File, FileAction, FileActivity, FileCategory, FileId, FileType, Rights,
    ShareLink,
};
use serde::Deserialize;

// ============================================================================
// Files
// ============================================================================

/// A file or folder as returned by `/3/drive/{d}/files/...`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiFile {
    pub id: FileId,
    /// Absent on some nested payloads; the requested drive is used instead
    #[serde(default)]
    pub drive_id: Option<DriveId>,
    #[serde(default)]
    pub parent_id: Option<FileId>,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub added_at: i64,
    #[serde(default)]
    pub last_modified_at: i64,
    #[serde(default)]
    pub deleted_at: Option<i64>,
    #[serde(default)]
    pub visibility: String,
    #[serde(default, alias = "rights")]
    pub capabilities: Option<Rights>,
    #[serde(default)]
    pub categories: Vec<ApiCategory>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub dropbox: Option<ApiDropBox>,
    #[serde(default)]
    pub sharelink: Option<ApiShareLink>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCategory {
    pub category_id: i64,
    #[serde(default)]
    pub added_at: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiDropBox {
    pub id: i64,
    pub url: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub has_password: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiShareLink {
    pub url: String,
    #[serde(default)]
    pub right: String,
    #[serde(default)]
    pub valid_until: Option<i64>,
    #[serde(default)]
    pub capabilities: ShareLinkCapabilities,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShareLinkCapabilities {
    pub can_download: bool,
}

impl From<ApiDropBox> for DropBox {
    fn from(d: ApiDropBox) -> Self {
        DropBox {
            id: d.id,
            url: d.url,
            created_at: d.created_at,
            has_password: d.has_password,
        }
    }
}

impl From<ApiShareLink> for ShareLink {
    fn from(s: ApiShareLink) -> Self {
        ShareLink {
            url: s.url,
            right: s.right,
            valid_until: s.valid_until,
            can_download: s.capabilities.can_download,
        }
    }
}

impl ApiFile {
    /// Converts to a domain node belonging to `drive_id` unless the payload says otherwise
    ///
    /// Local-only fields start empty; the repository carries them over on merge.
    pub fn into_file(self, drive_id: DriveId) -> File {
        let mut file = File::new(
            self.id,
            self.drive_id.unwrap_or(drive_id),
            self.parent_id.unwrap_or(FileId::new(0)),
            self.name,
            self.file_type,
        );
        file.size = self.size;
        file.created_at = self.created_at;
        file.added_at = self.added_at;
        file.last_modified_at = self.last_modified_at;
        file.deleted_at = self.deleted_at;
        file.visibility = self.visibility;
        file.rights = self.capabilities;
        file.categories = self
            .categories
            .into_iter()
            .map(|c| FileCategory {
                category_id: c.category_id,
                added_at: c.added_at,
                user_id: c.user_id,
            })
            .collect();
        file.sort_categories();
        file.color = self.color;
        file.is_favorite = self.is_favorite;
        file.dropbox = self.dropbox.map(DropBox::from);
        file.share_link = self.sharelink.map(ShareLink::from);
        file
    }
}

// ============================================================================
// Activities
// ============================================================================

/// One entry of `/3/drive/{d}/files/{f}/activities`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiActivity {
    pub id: i64,
    pub action: FileAction,
    pub file_id: FileId,
    #[serde(default)]
    pub file: Option<ApiFile>,
    #[serde(default)]
    pub created_at: i64,
}

impl ApiActivity {
    pub fn into_activity(self, drive_id: DriveId) -> FileActivity {
        FileActivity {
            id: self.id,
            file_id: self.file_id,
            action: self.action,
            file: self.file.map(|f| f.into_file(drive_id)),
            created_at: self.created_at,
        }
    }
}
