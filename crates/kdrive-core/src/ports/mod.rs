//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the orchestration in
//! `kdrive-sync` depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IDriveApi`] - Remote kDrive REST API (listings, details, activities, mutations)
//! - [`IFileRepository`] - Persistent local mirror of the file tree
//! - [`ILocalFileCache`] - Downloaded file blobs kept on disk
//! - [`IErrorReporter`] - Error telemetry for non-fatal failures and anomalies

pub mod drive_api;
pub mod error_reporter;
pub mod file_repository;
pub mod local_file_cache;

pub use drive_api::{CursorPage, IDriveApi};
pub use error_reporter::{ErrorContext, IErrorReporter};
pub use file_repository::{DeleteOptions, FileMutator, FolderListing, IFileRepository};
pub use local_file_cache::ILocalFileCache;
