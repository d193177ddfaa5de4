//! Domain newtypes
//!
//! Strongly-typed wrappers for the integer identifiers handed out by the
//! kDrive API, plus the [`UserDrive`] context key that selects which local
//! store a call operates on.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// Integer ID types
// ============================================================================

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw server value
            #[must_use]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Get the raw server value
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<i64>()
                    .map(Self)
                    .map_err(|e| DomainError::InvalidId(format!("{s}: {e}")))
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

integer_id!(
    /// Server-assigned file or folder identifier
    ///
    /// Real nodes always have a strictly positive id. Synthetic containers
    /// (see [`SpecialFolder`](super::SpecialFolder)) use negative sentinels.
    FileId
);

integer_id!(
    /// Identifier of a kDrive drive
    DriveId
);

integer_id!(
    /// Identifier of an Infomaniak user account
    UserId
);

/// Id of the drive root folder
pub const ROOT_ID: FileId = FileId::new(1);

impl FileId {
    /// True for ids handed out by the server (strictly positive)
    pub const fn is_remote(self) -> bool {
        self.0 > 0
    }

    /// True for the drive root folder
    pub const fn is_root(self) -> bool {
        self.0 == ROOT_ID.0
    }
}

// ============================================================================
// Composite store key
// ============================================================================

/// Builds the `{id}_{driveId}` composite key used as primary key in the store
pub fn file_uid(id: FileId, drive_id: DriveId) -> String {
    format!("{}_{}", id, drive_id)
}

/// Splits a `{id}_{driveId}` composite key back into its parts
pub fn parse_file_uid(uid: &str) -> Result<(FileId, DriveId), DomainError> {
    // Ids may be negative, so split on the last separator
    let (id, drive) = uid
        .rsplit_once('_')
        .ok_or_else(|| DomainError::InvalidUid(uid.to_string()))?;
    let id = id
        .parse::<FileId>()
        .map_err(|_| DomainError::InvalidUid(uid.to_string()))?;
    let drive = drive
        .parse::<DriveId>()
        .map_err(|_| DomainError::InvalidUid(uid.to_string()))?;
    Ok((id, drive))
}

// ============================================================================
// UserDrive
// ============================================================================

/// Selects the physical store a call operates on
///
/// Every store file is keyed by user and drive. Files shared with the user
/// from other drives live in a separate "shared with me" store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserDrive {
    pub user_id: UserId,
    pub drive_id: DriveId,
    #[serde(default)]
    pub shared_with_me: bool,
}

impl UserDrive {
    pub fn new(user_id: UserId, drive_id: DriveId) -> Self {
        Self {
            user_id,
            drive_id,
            shared_with_me: false,
        }
    }

    /// Returns the same drive pointed at the "shared with me" store
    pub fn shared(mut self) -> Self {
        self.shared_with_me = true;
        self
    }

    /// File name of the SQLite store backing this context
    pub fn store_file_name(&self) -> String {
        if self.shared_with_me {
            format!("kdrive-{}-{}-shared.db", self.user_id, self.drive_id)
        } else {
            format!("kdrive-{}-{}.db", self.user_id, self.drive_id)
        }
    }
}

impl Display for UserDrive {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "user {} / drive {}", self.user_id, self.drive_id)?;
        if self.shared_with_me {
            write!(f, " (shared)")?;
        }
        Ok(())
    }
}
