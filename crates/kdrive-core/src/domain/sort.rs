//! Listing sort orders
//!
//! Every cached view (folder listing, special folder, search) is sorted with
//! one of these twelve orders. Sorting is stable: nodes that compare equal
//! keep the order in which they were linked into their folder.
//!
//! The two relevance orders have no local relevance score to work with and
//! fall back to last-modified ordering.

use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::file::File;

/// Sort order of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortType {
    #[default]
    NameAz,
    NameZa,
    OlderDate,
    RecentDate,
    OlderAddedDate,
    RecentAddedDate,
    OlderTrashed,
    RecentTrashed,
    SmallerSize,
    BiggerSize,
    MostRelevant,
    LeastRelevant,
}

impl SortType {
    pub const ALL: [SortType; 12] = [
        SortType::NameAz,
        SortType::NameZa,
        SortType::OlderDate,
        SortType::RecentDate,
        SortType::OlderAddedDate,
        SortType::RecentAddedDate,
        SortType::OlderTrashed,
        SortType::RecentTrashed,
        SortType::SmallerSize,
        SortType::BiggerSize,
        SortType::MostRelevant,
        SortType::LeastRelevant,
    ];

    /// Compares two nodes under this order
    pub fn compare(&self, a: &File, b: &File) -> Ordering {
        match self {
            SortType::NameAz => a.sorted_name.cmp(&b.sorted_name),
            SortType::NameZa => b.sorted_name.cmp(&a.sorted_name),
            SortType::OlderDate | SortType::LeastRelevant => {
                a.last_modified_at.cmp(&b.last_modified_at)
            }
            SortType::RecentDate | SortType::MostRelevant => {
                b.last_modified_at.cmp(&a.last_modified_at)
            }
            SortType::OlderAddedDate => a.added_at.cmp(&b.added_at),
            SortType::RecentAddedDate => b.added_at.cmp(&a.added_at),
            SortType::OlderTrashed => deleted_at(a).cmp(&deleted_at(b)),
            SortType::RecentTrashed => deleted_at(b).cmp(&deleted_at(a)),
            SortType::SmallerSize => size(a).cmp(&size(b)),
            SortType::BiggerSize => size(b).cmp(&size(a)),
        }
    }

    /// Sorts in place, keeping the current order for ties
    pub fn sort(&self, files: &mut [File]) {
        files.sort_by(|a, b| self.compare(a, b));
    }

    /// Value of the `order_by` query parameter for server-side listings
    pub fn api_order_by(&self) -> &'static str {
        match self {
            SortType::NameAz | SortType::NameZa => "path",
            SortType::OlderDate | SortType::RecentDate => "last_modified_at",
            SortType::OlderAddedDate | SortType::RecentAddedDate => "added_at",
            SortType::OlderTrashed | SortType::RecentTrashed => "deleted_at",
            SortType::SmallerSize | SortType::BiggerSize => "size",
            SortType::MostRelevant | SortType::LeastRelevant => "relevance",
        }
    }

    /// Value of the `order` query parameter for server-side listings
    pub fn api_order(&self) -> &'static str {
        match self {
            SortType::NameAz
            | SortType::OlderDate
            | SortType::OlderAddedDate
            | SortType::OlderTrashed
            | SortType::SmallerSize
            | SortType::LeastRelevant => "asc",
            SortType::NameZa
            | SortType::RecentDate
            | SortType::RecentAddedDate
            | SortType::RecentTrashed
            | SortType::BiggerSize
            | SortType::MostRelevant => "desc",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortType::NameAz => "name_az",
            SortType::NameZa => "name_za",
            SortType::OlderDate => "older_date",
            SortType::RecentDate => "recent_date",
            SortType::OlderAddedDate => "older_added_date",
            SortType::RecentAddedDate => "recent_added_date",
            SortType::OlderTrashed => "older_trashed",
            SortType::RecentTrashed => "recent_trashed",
            SortType::SmallerSize => "smaller_size",
            SortType::BiggerSize => "bigger_size",
            SortType::MostRelevant => "most_relevant",
            SortType::LeastRelevant => "least_relevant",
        }
    }
}

fn deleted_at(file: &File) -> i64 {
    file.deleted_at.unwrap_or(0)
}

fn size(file: &File) -> i64 {
    file.size.unwrap_or(0)
}

impl Display for SortType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DomainError::InvalidSortType(s.to_string()))
    }
}
