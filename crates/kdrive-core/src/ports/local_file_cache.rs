//! Local file cache port
//!
//! Downloaded file content and offline copies live on disk, outside the
//! store. When a node is deleted from the mirror its blobs must be released.

use crate::domain::File;

/// Port trait for on-disk file content owned by mirror nodes
pub trait ILocalFileCache: Send + Sync {
    /// Removes every blob cached for `file`
    ///
    /// Missing blobs are not an error.
    fn release(&self, file: &File) -> anyhow::Result<()>;
}
