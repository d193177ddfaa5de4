//! Synthetic special folders
//!
//! Favorites, gallery, recent changes, my shares and shared-with-me are not
//! real folders on the server. Each is materialized locally as a container
//! node with a reserved negative id whose children are the cached result of a
//! dedicated endpoint.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::file::File;
use super::newtypes::{DriveId, FileId, ROOT_ID};

/// A locally materialized container with a reserved id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialFolder {
    Favorites,
    MyShares,
    Gallery,
    RecentChanges,
    SharedWithMe,
}

impl SpecialFolder {
    pub const ALL: [SpecialFolder; 5] = [
        SpecialFolder::Favorites,
        SpecialFolder::MyShares,
        SpecialFolder::Gallery,
        SpecialFolder::RecentChanges,
        SpecialFolder::SharedWithMe,
    ];

    /// Reserved container id
    pub const fn id(&self) -> FileId {
        match self {
            SpecialFolder::Favorites => FileId::new(-1),
            SpecialFolder::MyShares => FileId::new(-2),
            SpecialFolder::Gallery => FileId::new(-3),
            SpecialFolder::RecentChanges => FileId::new(-4),
            SpecialFolder::SharedWithMe => FileId::new(-5),
        }
    }

    pub fn from_id(id: FileId) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.id() == id)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpecialFolder::Favorites => "favorites",
            SpecialFolder::MyShares => "my_shares",
            SpecialFolder::Gallery => "gallery",
            SpecialFolder::RecentChanges => "recent_changes",
            SpecialFolder::SharedWithMe => "shared_with_me",
        }
    }

    /// Builds the container node for `drive_id`
    pub fn container(&self, drive_id: DriveId) -> File {
        File::folder(self.id(), drive_id, ROOT_ID, self.as_str())
    }
}

impl Display for SpecialFolder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpecialFolder {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| DomainError::InvalidSpecialFolder(s.to_string()))
    }
}
