//! On-disk file content owned by mirror nodes.
//!
//! Uses a hash-based directory structure so that a node's content can be
//! located from its identity alone:
//! `{cache_dir}/{kind}/{first_2_chars_of_hash}/{rest_of_hash}`
//! where `kind` is `content` for downloaded previews and `offline` for pinned
//! copies, and the hash is the SHA-256 of the node's `{id}_{driveId}` key.

use std::{fs, path::PathBuf};

use sha2::{Digest, Sha256};

use kdrive_core::domain::File;
use kdrive_core::ports::ILocalFileCache;

use crate::CacheError;

/// Which copy of a node's content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlobKind {
    /// Downloaded on demand
    Content,
    /// Pinned by the user for offline access
    Offline,
}

impl BlobKind {
    const ALL: [BlobKind; 2] = [BlobKind::Content, BlobKind::Offline];

    fn dir_name(&self) -> &'static str {
        match self {
            BlobKind::Content => "content",
            BlobKind::Offline => "offline",
        }
    }
}

/// Releases the cached content of deleted nodes
pub struct BlobCache {
    cache_dir: PathBuf,
}

impl BlobCache {
    /// Create a new BlobCache, creating the kind directories if needed.
    pub fn new(cache_dir: PathBuf) -> std::io::Result<Self> {
        for kind in BlobKind::ALL {
            fs::create_dir_all(cache_dir.join(kind.dir_name()))?;
        }
        Ok(Self { cache_dir })
    }

    fn blob_path(&self, file: &File, kind: BlobKind) -> PathBuf {
        let hash = Self::hash_uid(&file.uid());
        let (prefix, rest) = hash.split_at(2);
        self.cache_dir.join(kind.dir_name()).join(prefix).join(rest)
    }

    /// Remove both copies of a node's content.
    pub fn remove(&self, file: &File) -> Result<(), CacheError> {
        for kind in BlobKind::ALL {
            let path = self.blob_path(file, kind);
            match fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!(file_id = %file.id, path = %path.display(), "Released blob");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn hash_uid(uid: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(uid.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl ILocalFileCache for BlobCache {
    fn release(&self, file: &File) -> anyhow::Result<()> {
        self.remove(file)?;
        Ok(())
    }
}
