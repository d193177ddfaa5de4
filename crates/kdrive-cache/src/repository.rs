//! SQLite implementation of IFileRepository
//!
//! This module provides the concrete SQLite-based implementation of the file
//! repository port defined in kdrive-core. It handles row mapping, the
//! parent → child link index and the carry-forward of local-only state when a
//! fresher remote copy of a node is merged.
//!
//! ## Type Mapping
//!
//! | Domain Type           | SQL Type | Strategy                                   |
//! |-----------------------|----------|--------------------------------------------|
//! | FileId, DriveId       | INTEGER  | `.get()` / `::new()`                        |
//! | uid                   | TEXT     | `file_uid(id, drive_id)`                   |
//! | FileType              | TEXT     | `as_str()` / `FileType::parse()`           |
//! | Rights, DropBox, ShareLink | TEXT | serde_json, NULL when absent            |
//! | Vec<FileCategory>     | TEXT     | serde_json array                           |
//! | bool                  | INTEGER  | 0 / 1                                      |
//!
//! ## Links
//!
//! `file_children(parent_uid, child_uid, position)` keeps each folder's
//! children in insertion order. The `child_uid` index doubles as the reverse
//! (child → parents) lookup used by `get_parent` and the orphan sweep.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use futures::future::BoxFuture;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use kdrive_core::domain::{
    file_uid, normalize_sort_key, parse_file_uid, DriveId, File, FileId, FileType, SortType,
    ROOT_ID,
};
use kdrive_core::ports::{
    DeleteOptions, ErrorContext, FileMutator, FolderListing, IErrorReporter, IFileRepository,
    ILocalFileCache,
};

use crate::CacheError;

/// SQLite-based implementation of the file repository port
///
/// One instance serves one store, i.e. one drive. Blob release on delete goes
/// through `local_cache`; swallowed per-node failures go to `reporter`.
pub struct SqliteFileRepository {
    pool: SqlitePool,
    drive_id: DriveId,
    local_cache: Arc<dyn ILocalFileCache>,
    reporter: Arc<dyn IErrorReporter>,
}

impl SqliteFileRepository {
    /// Creates a new repository instance over the given connection pool
    pub fn new(
        pool: SqlitePool,
        drive_id: DriveId,
        local_cache: Arc<dyn ILocalFileCache>,
        reporter: Arc<dyn IErrorReporter>,
    ) -> Self {
        Self {
            pool,
            drive_id,
            local_cache,
            reporter,
        }
    }

    pub fn drive_id(&self) -> DriveId {
        self.drive_id
    }

    /// Runs `f` inside a transaction, committing when it returns `Ok`
    ///
    /// The transaction rolls back when `f` fails or the future is dropped.
    ///
    /// ```ignore
    /// repo.with_transaction(move |conn| {
    ///     Box::pin(async move {
    ///         sqlx::query("DELETE FROM file_children WHERE parent_uid = ?")
    ///             .bind(uid)
    ///             .execute(&mut *conn)
    ///             .await?;
    ///         Ok(())
    ///     })
    /// })
    /// .await?;
    /// ```
    pub async fn with_transaction<T, F>(&self, f: F) -> Result<T, CacheError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, CacheError>>
            + Send,
    {
        let mut tx = self.pool.begin().await?;
        let value = f(&mut *tx).await?;
        tx.commit().await?;
        Ok(value)
    }

    fn uid(&self, id: FileId) -> String {
        file_uid(id, self.drive_id)
    }

    fn report(&self, error: anyhow::Error, context: ErrorContext) {
        tracing::warn!(error = %error, context = %context, "Swallowed store failure");
        self.reporter.capture_error(&error, &context);
    }

    /// Ids of the subtree rooted at `root`, children before their parent
    ///
    /// Nodes listed in `keep_row_ids` are not descended into.
    async fn subtree_post_order(&self, root: FileId, options: &DeleteOptions) -> Vec<FileId> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![(root, false)];

        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            if !visited.insert(id) {
                continue;
            }
            stack.push((id, true));
            if options.keep_row_ids.contains(&id) {
                continue;
            }
            match self.child_ids(id).await {
                Ok(children) => {
                    for child in children.into_iter().rev() {
                        if !visited.contains(&child) {
                            stack.push((child, false));
                        }
                    }
                }
                Err(e) => self.report(
                    e.context(format!("listing children of {id}")),
                    ErrorContext::new("delete")
                        .tag("file_id", id)
                        .tag("recursive", true),
                ),
            }
        }

        order
    }

    async fn delete_one(&self, id: FileId, options: &DeleteOptions) -> anyhow::Result<()> {
        let uid = self.uid(id);
        let Some(file) = self.get_by_id(id).await? else {
            return Ok(());
        };

        if options.keep_row_ids.contains(&id) {
            sqlx::query("DELETE FROM file_children WHERE child_uid = ?")
                .bind(&uid)
                .execute(&self.pool)
                .await?;
            tracing::trace!(file_id = %id, "Detached kept node");
            return Ok(());
        }

        if !options.keep_cache_file_ids.contains(&id) {
            self.local_cache
                .release(&file)
                .with_context(|| format!("releasing cached content of {id}"))?;
        }

        self.with_transaction(move |conn| {
            Box::pin(async move {
                sqlx::query("DELETE FROM file_children WHERE child_uid = ?1 OR parent_uid = ?1")
                    .bind(&uid)
                    .execute(&mut *conn)
                    .await?;
                sqlx::query("DELETE FROM files WHERE uid = ?")
                    .bind(&uid)
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .await?;

        tracing::trace!(file_id = %id, "Deleted node");
        Ok(())
    }
}

// ============================================================================
// Row mapping functions
// ============================================================================

/// Reconstruct a File from a `files` row
fn file_from_row(row: &SqliteRow) -> Result<File, CacheError> {
    let type_str: String = row.try_get("type")?;
    let file_type = FileType::parse(&type_str).ok_or_else(|| {
        CacheError::SerializationError(format!("Unknown file type '{}'", type_str))
    })?;

    let rights: Option<String> = row.try_get("rights")?;
    let categories: String = row.try_get("categories")?;
    let dropbox: Option<String> = row.try_get("dropbox")?;
    let share_link: Option<String> = row.try_get("share_link")?;

    Ok(File {
        id: FileId::new(row.try_get("id")?),
        drive_id: DriveId::new(row.try_get("drive_id")?),
        parent_id: FileId::new(row.try_get("parent_id")?),
        name: row.try_get("name")?,
        sorted_name: row.try_get("sorted_name")?,
        file_type,
        size: row.try_get("size")?,
        created_at: row.try_get("created_at")?,
        added_at: row.try_get("added_at")?,
        last_modified_at: row.try_get("last_modified_at")?,
        deleted_at: row.try_get("deleted_at")?,
        visibility: row.try_get("visibility")?,
        rights: rights.map(|s| serde_json::from_str(&s)).transpose()?,
        categories: serde_json::from_str(&categories)?,
        color: row.try_get("color")?,
        is_favorite: row.try_get("is_favorite")?,
        dropbox: dropbox.map(|s| serde_json::from_str(&s)).transpose()?,
        share_link: share_link.map(|s| serde_json::from_str(&s)).transpose()?,
        is_complete: row.try_get("is_complete")?,
        is_offline: row.try_get("is_offline")?,
        cursor: row.try_get("cursor")?,
        response_at: row.try_get("response_at")?,
        version_code: row.try_get("version_code")?,
        path: row.try_get("path")?,
    })
}

fn files_from_rows(rows: &[SqliteRow]) -> Result<Vec<File>, CacheError> {
    rows.iter().map(file_from_row).collect()
}

/// Keeps the first occurrence of every id
fn dedup_by_id(files: Vec<File>) -> Vec<File> {
    let mut seen = HashSet::with_capacity(files.len());
    files.into_iter().filter(|f| seen.insert(f.id)).collect()
}

/// Escapes LIKE wildcards with `\`
fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// ============================================================================
// Connection-level helpers (usable inside a transaction)
// ============================================================================

async fn load(conn: &mut SqliteConnection, uid: &str) -> Result<Option<File>, CacheError> {
    let row = sqlx::query("SELECT * FROM files WHERE uid = ?")
        .bind(uid)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(file_from_row).transpose()
}

async fn write_row(conn: &mut SqliteConnection, file: &File) -> Result<(), CacheError> {
    let rights = file.rights.as_ref().map(serde_json::to_string).transpose()?;
    let categories = serde_json::to_string(&file.categories)?;
    let dropbox = file.dropbox.as_ref().map(serde_json::to_string).transpose()?;
    let share_link = file.share_link.as_ref().map(serde_json::to_string).transpose()?;

    sqlx::query(
        "INSERT OR REPLACE INTO files \
         (uid, id, drive_id, parent_id, name, sorted_name, type, size, created_at, \
          added_at, last_modified_at, deleted_at, visibility, rights, categories, color, \
          is_favorite, dropbox, share_link, is_complete, is_offline, cursor, response_at, \
          version_code, path) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(file.uid())
    .bind(file.id.get())
    .bind(file.drive_id.get())
    .bind(file.parent_id.get())
    .bind(&file.name)
    .bind(normalize_sort_key(&file.name))
    .bind(file.file_type.as_str())
    .bind(file.size)
    .bind(file.created_at)
    .bind(file.added_at)
    .bind(file.last_modified_at)
    .bind(file.deleted_at)
    .bind(&file.visibility)
    .bind(rights)
    .bind(categories)
    .bind(&file.color)
    .bind(file.is_favorite)
    .bind(dropbox)
    .bind(share_link)
    .bind(file.is_complete)
    .bind(file.is_offline)
    .bind(&file.cursor)
    .bind(file.response_at)
    .bind(file.version_code)
    .bind(&file.path)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Forgets the cached path of every node below `uid`
async fn clear_descendant_paths(conn: &mut SqliteConnection, uid: &str) -> Result<(), CacheError> {
    sqlx::query(
        "WITH RECURSIVE subtree(uid) AS ( \
             SELECT child_uid FROM file_children WHERE parent_uid = ? \
             UNION \
             SELECT c.child_uid FROM file_children c JOIN subtree s ON c.parent_uid = s.uid \
         ) \
         UPDATE files SET path = NULL WHERE uid IN (SELECT uid FROM subtree)",
    )
    .bind(uid)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Merges a remote copy over the latest local one
///
/// Local-only fields are carried forward. When the node moved or was renamed
/// its own path and every descendant's path are dropped.
async fn merge_file(conn: &mut SqliteConnection, file: &File) -> Result<(), CacheError> {
    let mut row = file.clone();
    row.sort_categories();
    if let Some(local) = load(&mut *conn, &row.uid()).await? {
        row.inherit_local_state(&local);
        if row.location_differs(&local) {
            clear_descendant_paths(&mut *conn, &row.uid()).await?;
        }
    }
    write_row(&mut *conn, &row).await
}

/// Writes the folder row of a listing page over its latest local copy
///
/// The stored row is the base unless the caller fetched the folder's details.
/// `is_offline` and the cached path are local and always survive.
async fn merge_folder(
    conn: &mut SqliteConnection,
    folder: &File,
    listing: &FolderListing,
) -> Result<(), CacheError> {
    let uid = folder.uid();
    let mut row = match load(&mut *conn, &uid).await? {
        Some(local) if listing.details_fetched => {
            let mut row = folder.clone();
            row.is_offline = local.is_offline;
            if row.location_differs(&local) {
                row.path = None;
                clear_descendant_paths(&mut *conn, &uid).await?;
            } else {
                row.path = local.path;
            }
            row
        }
        Some(local) => local,
        None => folder.clone(),
    };
    listing.apply(&mut row);
    row.sort_categories();
    write_row(&mut *conn, &row).await
}

/// Appends a link unless the child is already listed under the parent
async fn link_child(
    conn: &mut SqliteConnection,
    parent_uid: &str,
    child_uid: &str,
) -> Result<(), CacheError> {
    sqlx::query(
        "INSERT INTO file_children (parent_uid, child_uid, position) \
         SELECT ?1, ?2, \
                (SELECT COALESCE(MAX(position), -1) + 1 FROM file_children WHERE parent_uid = ?1) \
         WHERE NOT EXISTS \
               (SELECT 1 FROM file_children WHERE parent_uid = ?1 AND child_uid = ?2)",
    )
    .bind(parent_uid)
    .bind(child_uid)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// ============================================================================
// IFileRepository implementation
// ============================================================================

#[async_trait::async_trait]
impl IFileRepository for SqliteFileRepository {
    // --- Reads ---

    async fn get_by_id(&self, id: FileId) -> anyhow::Result<Option<File>> {
        let row = sqlx::query("SELECT * FROM files WHERE uid = ?")
            .bind(self.uid(id))
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(file_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn get_parent(&self, id: FileId) -> anyhow::Result<Option<File>> {
        let rows = sqlx::query(
            "SELECT f.* FROM file_children c JOIN files f ON f.uid = c.parent_uid \
             WHERE c.child_uid = ? ORDER BY c.rowid",
        )
        .bind(self.uid(id))
        .fetch_all(&self.pool)
        .await?;

        let parents = files_from_rows(&rows)?;
        let preferred = parents.iter().position(|p| p.id.is_remote()).unwrap_or(0);
        Ok(parents.into_iter().nth(preferred))
    }

    async fn get_children(&self, folder_id: FileId, order: SortType) -> anyhow::Result<Vec<File>> {
        let rows = sqlx::query(
            "SELECT f.* FROM file_children c JOIN files f ON f.uid = c.child_uid \
             WHERE c.parent_uid = ? ORDER BY c.position",
        )
        .bind(self.uid(folder_id))
        .fetch_all(&self.pool)
        .await?;

        let mut children = dedup_by_id(files_from_rows(&rows)?);
        order.sort(&mut children);
        Ok(children)
    }

    async fn child_ids(&self, folder_id: FileId) -> anyhow::Result<Vec<FileId>> {
        let uids: Vec<String> = sqlx::query_scalar(
            "SELECT child_uid FROM file_children WHERE parent_uid = ? ORDER BY position",
        )
        .bind(self.uid(folder_id))
        .fetch_all(&self.pool)
        .await?;

        uids.iter()
            .map(|uid| {
                parse_file_uid(uid)
                    .map(|(id, _)| id)
                    .with_context(|| format!("corrupt link under {folder_id}"))
            })
            .collect()
    }

    async fn search(&self, query: &str, order: SortType) -> anyhow::Result<Vec<File>> {
        let needle = normalize_sort_key(query.trim());
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT * FROM files WHERE drive_id = ? AND id > ? \
             AND sorted_name LIKE ? ESCAPE '\\' ORDER BY id",
        )
        .bind(self.drive_id.get())
        .bind(ROOT_ID.get())
        .bind(format!("%{}%", escape_like(&needle)))
        .fetch_all(&self.pool)
        .await?;

        let mut results = files_from_rows(&rows)?;
        order.sort(&mut results);
        tracing::debug!(query, hits = results.len(), "Searched mirror");
        Ok(results)
    }

    // --- Merges ---

    async fn merge_listing_page(
        &self,
        folder: &File,
        listing: &FolderListing,
        children: &[File],
    ) -> anyhow::Result<()> {
        let folder_id = folder.id;
        let child_count = children.len();
        let replace_existing = listing.replace_existing;
        let folder = folder.clone();
        let listing = listing.clone();
        let children = children.to_vec();

        self.with_transaction(move |conn| {
            Box::pin(async move {
                let folder_uid = folder.uid();
                merge_folder(&mut *conn, &folder, &listing).await?;
                if replace_existing {
                    sqlx::query("DELETE FROM file_children WHERE parent_uid = ?")
                        .bind(&folder_uid)
                        .execute(&mut *conn)
                        .await?;
                }
                for child in &children {
                    merge_file(&mut *conn, child).await?;
                    link_child(&mut *conn, &folder_uid, &child.uid()).await?;
                }
                Ok(())
            })
        })
        .await
        .with_context(|| format!("merging listing page of folder {folder_id}"))?;

        tracing::debug!(
            folder_id = %folder_id,
            children = child_count,
            replace_existing,
            "Merged folder page"
        );
        Ok(())
    }

    async fn insert_child(&self, folder_id: FileId, file: &File) -> anyhow::Result<()> {
        let folder_uid = self.uid(folder_id);
        let file = file.clone();

        self.with_transaction(move |conn| {
            Box::pin(async move {
                merge_file(&mut *conn, &file).await?;
                link_child(&mut *conn, &folder_uid, &file.uid()).await
            })
        })
        .await?;
        Ok(())
    }

    async fn attach_child(&self, folder_id: FileId, file_id: FileId) -> anyhow::Result<bool> {
        let folder_uid = self.uid(folder_id);
        let uid = self.uid(file_id);

        let linked = self
            .with_transaction(move |conn| {
                Box::pin(async move {
                    if load(&mut *conn, &uid).await?.is_none() {
                        return Ok(false);
                    }
                    link_child(&mut *conn, &folder_uid, &uid).await?;
                    Ok(true)
                })
            })
            .await?;
        Ok(linked)
    }

    async fn detach_child(&self, folder_id: FileId, file_id: FileId) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM file_children WHERE parent_uid = ? AND child_uid = ?")
            .bind(self.uid(folder_id))
            .bind(self.uid(file_id))
            .execute(&self.pool)
            .await?;

        tracing::trace!(folder_id = %folder_id, file_id = %file_id, "Detached child");
        Ok(())
    }

    async fn save_file(&self, file: &File) -> anyhow::Result<()> {
        let file = file.clone();
        self.with_transaction(move |conn| Box::pin(async move { merge_file(&mut *conn, &file).await }))
            .await?;
        Ok(())
    }

    // --- Best-effort mutations ---

    async fn delete(&self, id: FileId, options: DeleteOptions) {
        let recursive = options.recursive;
        let targets = if recursive {
            self.subtree_post_order(id, &options).await
        } else {
            vec![id]
        };

        for target in targets {
            if let Err(e) = self.delete_one(target, &options).await {
                self.report(
                    e,
                    ErrorContext::new("delete")
                        .tag("file_id", target)
                        .tag("recursive", recursive),
                );
            }
        }
    }

    async fn update_in_place(&self, id: FileId, mutator: FileMutator) {
        let uid = self.uid(id);

        let result = self
            .with_transaction(move |conn| {
                Box::pin(async move {
                    let Some(before) = load(&mut *conn, &uid).await? else {
                        return Ok(false);
                    };
                    let mut file = before.clone();
                    mutator(&mut file);
                    if file.location_differs(&before) {
                        file.path = None;
                        clear_descendant_paths(&mut *conn, &uid).await?;
                    }
                    write_row(&mut *conn, &file).await?;
                    Ok(true)
                })
            })
            .await;

        match result {
            Ok(true) => tracing::trace!(file_id = %id, "Updated node in place"),
            Ok(false) => tracing::trace!(file_id = %id, "Node gone, update skipped"),
            Err(e) => self.report(
                anyhow::Error::new(e).context(format!("updating {id}")),
                ErrorContext::new("update_in_place").tag("file_id", id),
            ),
        }
    }

    async fn remove_orphans(&self) -> anyhow::Result<u64> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT id FROM files WHERE drive_id = ? AND id > 0 AND id != ? \
             AND NOT EXISTS \
                 (SELECT 1 FROM file_children c WHERE c.child_uid = files.uid) \
             ORDER BY id",
        )
        .bind(self.drive_id.get())
        .bind(ROOT_ID.get())
        .fetch_all(&self.pool)
        .await?;

        // Children of removed nodes are picked up by the next sweep
        let options = DeleteOptions::single();
        let mut removed = 0;
        for id in ids.into_iter().map(FileId::new) {
            match self.delete_one(id, &options).await {
                Ok(()) => removed += 1,
                Err(e) => self.report(
                    e,
                    ErrorContext::new("remove_orphans").tag("file_id", id),
                ),
            }
        }

        sqlx::query("DELETE FROM file_children WHERE parent_uid NOT IN (SELECT uid FROM files)")
            .execute(&self.pool)
            .await?;

        if removed > 0 {
            tracing::info!(removed, "Removed orphan nodes");
        }
        Ok(removed)
    }

    // --- Paths ---

    async fn get_path(&self, id: FileId) -> anyhow::Result<Option<String>> {
        let Some(file) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        if let Some(path) = file.path {
            return Ok(Some(path));
        }

        let path = self.generate_path(id).await?;
        if let Some(ref path) = path {
            self.save_path(id, path).await?;
        }
        Ok(path)
    }

    async fn generate_path(&self, id: FileId) -> anyhow::Result<Option<String>> {
        let Some(file) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        if file.id.is_root() {
            return Ok(Some("/".to_string()));
        }

        let mut segments = vec![file.name];
        let mut visited = HashSet::from([id]);
        let mut current = id;
        loop {
            let Some(parent) = self.get_parent(current).await? else {
                return Ok(None);
            };
            if parent.id.is_root() {
                break;
            }
            // Only reachable through a synthetic container, or a cycle
            if !parent.id.is_remote() || !visited.insert(parent.id) {
                return Ok(None);
            }
            segments.push(parent.name);
            current = parent.id;
        }

        segments.reverse();
        Ok(Some(format!("/{}", segments.join("/"))))
    }

    async fn save_path(&self, id: FileId, path: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE files SET path = ? WHERE uid = ?")
            .bind(path)
            .bind(self.uid(id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
