//! Domain entities and business logic
//!
//! This module contains the core domain types for the kDrive cache:
//! - Newtypes for server-assigned identifiers and the `UserDrive` context key
//! - The `File` tree node with its remote and local-only attributes
//! - Activity feed entries and their effect on the local tree
//! - Synthetic special folders (favorites, gallery, ...)
//! - Listing sort orders
//! - Domain-specific error types

pub mod activity;
pub mod errors;
pub mod file;
pub mod newtypes;
pub mod sort;
pub mod special_folder;

// Re-export commonly used types
pub use activity::{ActivityEffect, FileAction, FileActivity};
pub use errors::DomainError;
pub use file::{normalize_sort_key, DropBox, File, FileCategory, FileType, Rights, ShareLink};
pub use newtypes::*;
pub use sort::SortType;
pub use special_folder::SpecialFolder;
