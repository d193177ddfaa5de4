//! Store connection pool management
//!
//! Provides a wrapper around SQLx's SqlitePool with:
//! - One store file per (user, drive) pair
//! - WAL journal mode for concurrent reads
//! - Versioned schema migrations tracked in `PRAGMA user_version`
//! - Reset of stores older than the oldest supported schema
//! - In-memory mode for testing

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use kdrive_core::domain::UserDrive;

use crate::CacheError;

/// Schema version written by this build
pub const CURRENT_SCHEMA_VERSION: i64 = 3;

/// Stores below this version are deleted and recreated on open
pub const OLDEST_SUPPORTED_SCHEMA: i64 = 2;

const SCHEMA_SQL: &str = include_str!("migrations/20260301_files.sql");

/// Manages a pool of SQLite connections to one file-tree store
///
/// The pool is configured with:
/// - WAL journal mode for concurrent read access
/// - 5 max connections for file-based stores
/// - 1 connection for in-memory stores (required for data persistence)
/// - 5-second busy timeout to handle write contention
pub struct StorePool {
    pool: SqlitePool,
}

impl StorePool {
    /// Opens (or creates) the store of `user_drive` inside `data_dir`
    pub async fn open(data_dir: &Path, user_drive: &UserDrive) -> Result<Self, CacheError> {
        Self::new(&data_dir.join(user_drive.store_file_name())).await
    }

    /// Creates a new store pool connected to the specified file
    ///
    /// This will:
    /// 1. Create parent directories if they don't exist
    /// 2. Delete the store if its schema is older than [`OLDEST_SUPPORTED_SCHEMA`]
    /// 3. Create the store file if it doesn't exist
    /// 4. Run schema migrations up to [`CURRENT_SCHEMA_VERSION`]
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` if the connection cannot be established,
    /// or `CacheError::MigrationFailed` if schema migrations fail.
    pub async fn new(db_path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CacheError::ConnectionFailed(format!(
                    "Failed to create store directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let mut pool = Self::connect(db_path).await?;

        let version = schema_version(&pool).await?;
        if is_unsupported(&pool, version).await? {
            tracing::warn!(
                path = %db_path.display(),
                version,
                oldest_supported = OLDEST_SUPPORTED_SCHEMA,
                "Store schema too old, recreating"
            );
            pool.close().await;
            remove_store_files(db_path)?;
            pool = Self::connect(db_path).await?;
        }

        run_migrations(&pool).await?;

        tracing::info!(
            path = %db_path.display(),
            "Store pool initialized"
        );

        Ok(Self { pool })
    }

    /// Creates an in-memory store pool for testing
    ///
    /// Uses a single connection to ensure data persistence across queries
    /// (SQLite in-memory databases are per-connection).
    pub async fn in_memory() -> Result<Self, CacheError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                CacheError::ConnectionFailed(format!("Failed to create in-memory store: {}", e))
            })?;

        run_migrations(&pool).await?;

        tracing::debug!("In-memory store pool initialized");

        Ok(Self { pool })
    }

    /// Returns a reference to the underlying SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Schema version currently recorded in the store
    pub async fn schema_version(&self) -> Result<i64, CacheError> {
        schema_version(&self.pool).await
    }

    async fn connect(db_path: &Path) -> Result<SqlitePool, CacheError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5));

        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| {
                CacheError::ConnectionFailed(format!(
                    "Failed to connect to store at {}: {}",
                    db_path.display(),
                    e
                ))
            })
    }
}

// ============================================================================
// Migrations
// ============================================================================

async fn schema_version(pool: &SqlitePool) -> Result<i64, CacheError> {
    let version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await?;
    Ok(version)
}

async fn set_schema_version(pool: &SqlitePool, version: i64) -> Result<(), CacheError> {
    // PRAGMA arguments cannot be bound
    sqlx::raw_sql(&format!("PRAGMA user_version = {version}"))
        .execute(pool)
        .await?;
    Ok(())
}

/// A store is unsupported when its recorded version is too old, or when it
/// predates versioning altogether (version 0 with tables already present).
async fn is_unsupported(pool: &SqlitePool, version: i64) -> Result<bool, CacheError> {
    if version >= OLDEST_SUPPORTED_SCHEMA {
        return Ok(false);
    }
    if version > 0 {
        return Ok(true);
    }
    let tables: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'files'",
    )
    .fetch_one(pool)
    .await?;
    Ok(tables > 0)
}

fn remove_store_files(db_path: &Path) -> Result<(), CacheError> {
    let mut paths = vec![db_path.to_path_buf()];
    for suffix in ["-wal", "-shm"] {
        let mut name = db_path.as_os_str().to_os_string();
        name.push(suffix);
        paths.push(PathBuf::from(name));
    }
    for path in paths {
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(CacheError::MigrationFailed(format!(
                    "Failed to remove outdated store {}: {}",
                    path.display(),
                    e
                )))
            }
        }
    }
    Ok(())
}

async fn run_migrations(pool: &SqlitePool) -> Result<(), CacheError> {
    let version = schema_version(pool).await?;

    if version > CURRENT_SCHEMA_VERSION {
        return Err(CacheError::MigrationFailed(format!(
            "Store schema version {version} is newer than supported version {CURRENT_SCHEMA_VERSION}"
        )));
    }

    if version == 0 {
        sqlx::raw_sql(SCHEMA_SQL).execute(pool).await.map_err(|e| {
            CacheError::MigrationFailed(format!("Failed to create schema: {}", e))
        })?;
        set_schema_version(pool, CURRENT_SCHEMA_VERSION).await?;
        tracing::debug!(version = CURRENT_SCHEMA_VERSION, "Store schema created");
        return Ok(());
    }

    if version < 3 {
        // v3: share links and per-node app version
        add_column_if_missing(pool, "files", "share_link", "TEXT").await?;
        add_column_if_missing(pool, "files", "version_code", "INTEGER NOT NULL DEFAULT 0").await?;
    }

    if version < CURRENT_SCHEMA_VERSION {
        set_schema_version(pool, CURRENT_SCHEMA_VERSION).await?;
        tracing::info!(
            from = version,
            to = CURRENT_SCHEMA_VERSION,
            "Store schema migrated"
        );
    }

    Ok(())
}

/// Adds a column unless a previous, interrupted run already did
///
/// Returns `true` when the column was added.
pub(crate) async fn add_column_if_missing(
    pool: &SqlitePool,
    table: &str,
    column: &str,
    declaration: &str,
) -> Result<bool, CacheError> {
    let existing: Option<String> =
        sqlx::query_scalar("SELECT name FROM pragma_table_info(?) WHERE name = ?")
            .bind(table)
            .bind(column)
            .fetch_optional(pool)
            .await?;

    if existing.is_some() {
        return Ok(false);
    }

    sqlx::raw_sql(&format!("ALTER TABLE {table} ADD COLUMN {column} {declaration}"))
        .execute(pool)
        .await
        .map_err(|e| {
            CacheError::MigrationFailed(format!("Failed to add column {table}.{column}: {}", e))
        })?;
    Ok(true)
}
