//! Staleness policy
//!
//! Decides whether the cached children of a folder can be served as-is or
//! must be refetched. The checks run in a fixed order and the first one that
//! fires is reported, so logs always name a single reason.

use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Months, Utc};
use kdrive_core::config::CacheConfig;
use kdrive_core::domain::{File, FileId};

/// Why a folder listing must be refetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// The caller asked to bypass the cache
    Requested,
    /// The folder is not cached at all
    Missing,
    /// The folder is cached without any child
    NoChildren,
    /// An earlier fetch stopped before the last page
    Incomplete,
    /// Written by an app version older than the supported minimum
    OutdatedVersion { found: i32, minimum: i32 },
    /// The same child is linked more than once
    DuplicateChildren,
    /// Last successful fetch is older than the expiry window
    Expired { response_at: i64 },
}

impl Display for StaleReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::Requested => write!(f, "cache bypass requested"),
            StaleReason::Missing => write!(f, "folder not cached"),
            StaleReason::NoChildren => write!(f, "no cached children"),
            StaleReason::Incomplete => write!(f, "listing incomplete"),
            StaleReason::OutdatedVersion { found, minimum } => {
                write!(f, "version code {found} below {minimum}")
            }
            StaleReason::DuplicateChildren => write!(f, "duplicate children"),
            StaleReason::Expired { response_at } => {
                write!(f, "listing from {response_at} expired")
            }
        }
    }
}

/// Thresholds of the staleness policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Staleness {
    pub min_version_code: i32,
    pub expiry_months: u32,
}

impl Default for Staleness {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl Staleness {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            min_version_code: config.min_version_code,
            expiry_months: config.cache_expiry_months,
        }
    }

    /// Oldest `response_at` (unix seconds) still considered fresh at `now`
    pub fn expiry_threshold(&self, now: DateTime<Utc>) -> i64 {
        now.checked_sub_months(Months::new(self.expiry_months))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
            .timestamp()
    }

    /// Returns the first reason the cached listing is stale, `None` when fresh
    ///
    /// `child_ids` is the raw link list of the folder, duplicates included.
    pub fn evaluate(
        &self,
        folder: Option<&File>,
        child_ids: &[FileId],
        ignore_cache: bool,
        now: DateTime<Utc>,
    ) -> Option<StaleReason> {
        if ignore_cache {
            return Some(StaleReason::Requested);
        }
        let Some(folder) = folder else {
            return Some(StaleReason::Missing);
        };
        if child_ids.is_empty() {
            return Some(StaleReason::NoChildren);
        }
        if !folder.is_complete {
            return Some(StaleReason::Incomplete);
        }
        if folder.version_code < self.min_version_code {
            return Some(StaleReason::OutdatedVersion {
                found: folder.version_code,
                minimum: self.min_version_code,
            });
        }
        let mut seen = HashSet::with_capacity(child_ids.len());
        if !child_ids.iter().all(|id| seen.insert(*id)) {
            return Some(StaleReason::DuplicateChildren);
        }
        if folder.response_at < self.expiry_threshold(now) {
            return Some(StaleReason::Expired {
                response_at: folder.response_at,
            });
        }
        None
    }
}
