//! Store registry
//!
//! Maps each [`UserDrive`] to the repository of its store file. The CLI (or
//! any host) opens stores and registers them; the orchestration only looks
//! them up.

use std::sync::Arc;

use dashmap::DashMap;
use kdrive_core::domain::UserDrive;
use kdrive_core::ports::IFileRepository;
use tracing::debug;

use crate::SyncError;

/// Repositories keyed by the context they serve
#[derive(Default)]
pub struct RepositoryRegistry {
    stores: DashMap<UserDrive, Arc<dyn IFileRepository>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the repository serving `user_drive`
    pub fn register(&self, user_drive: UserDrive, repository: Arc<dyn IFileRepository>) {
        debug!(%user_drive, "Registered store");
        self.stores.insert(user_drive, repository);
    }

    /// Repository of `user_drive`
    pub fn get(&self, user_drive: &UserDrive) -> Result<Arc<dyn IFileRepository>, SyncError> {
        self.stores
            .get(user_drive)
            .map(|r| Arc::clone(r.value()))
            .ok_or(SyncError::StoreNotOpen(*user_drive))
    }

    pub fn remove(&self, user_drive: &UserDrive) -> Option<Arc<dyn IFileRepository>> {
        self.stores.remove(user_drive).map(|(_, repo)| repo)
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}
