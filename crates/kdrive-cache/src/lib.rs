//! kDrive Cache - Local file-tree persistence
//!
//! SQLite-based mirror of a remote kDrive hierarchy:
//! - File metadata, one row per `{id}_{driveId}` node
//! - An explicit parent → child link index
//! - Local-only bookkeeping (offline pin, listing cursor, cached paths)
//! - Downloaded file content on disk, outside the store
//!
//! ## Architecture
//!
//! This crate implements the `IFileRepository` and `ILocalFileCache` ports
//! from `kdrive-core`. It is a driven (secondary) adapter in the hexagonal
//! architecture.
//!
//! ## Key Components
//!
//! - [`StorePool`] - Connection pool with versioned migrations, one per `UserDrive`
//! - [`SqliteFileRepository`] - Full `IFileRepository` implementation
//! - [`BlobCache`] - Hash-addressed on-disk file content
//! - [`CacheError`] - Error types for cache operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use kdrive_cache::{BlobCache, SqliteFileRepository, StorePool};
//! use kdrive_core::domain::{DriveId, UserDrive, UserId};
//! # use kdrive_core::ports::{ErrorContext, IErrorReporter};
//! # struct Quiet;
//! # impl IErrorReporter for Quiet {
//! #     fn capture_error(&self, _: &anyhow::Error, _: &ErrorContext) {}
//! #     fn capture_anomaly(&self, _: &str, _: &ErrorContext) {}
//! # }
//!
//! # async fn example() -> anyhow::Result<()> {
//! let data_dir = Path::new("/home/user/.local/share/kdrive");
//! let user_drive = UserDrive::new(UserId::new(7), DriveId::new(42));
//! let store = StorePool::open(data_dir, &user_drive).await?;
//! let blobs = Arc::new(BlobCache::new(data_dir.join("blobs"))?);
//! let repo = SqliteFileRepository::new(
//!     store.pool().clone(),
//!     user_drive.drive_id,
//!     blobs,
//!     Arc::new(Quiet),
//! );
//! // Use repo as IFileRepository...
//! # Ok(())
//! # }
//! ```

pub mod blob;
pub mod pool;
pub mod repository;

pub use blob::BlobCache;
pub use pool::{StorePool, CURRENT_SCHEMA_VERSION, OLDEST_SUPPORTED_SCHEMA};
pub use repository::SqliteFileRepository;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a store connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A store query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization or deserialization of domain types failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Reading or removing cached file content failed
    #[error("Blob I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::SerializationError(e.to_string())
    }
}
