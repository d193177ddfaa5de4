//! Write-through mutations
//!
//! Every remote mutation is sent first; the mirror is only touched once the
//! server confirmed it. A node that is not cached is not an error: the server
//! state is authoritative and the next listing will bring it in.

use std::sync::Arc;

use anyhow::{Context, Result};
use kdrive_core::domain::{DropBox, File, FileId, SpecialFolder, UserDrive};
use kdrive_core::ports::{DeleteOptions, IDriveApi, IFileRepository};
use tracing::{debug, info};

use crate::registry::RepositoryRegistry;

pub struct FileActions {
    api: Arc<dyn IDriveApi>,
    stores: Arc<RepositoryRegistry>,
}

impl FileActions {
    pub fn new(api: Arc<dyn IDriveApi>, stores: Arc<RepositoryRegistry>) -> Self {
        Self { api, stores }
    }

    /// Renames a node; cached paths of the node and its subtree are dropped
    #[tracing::instrument(skip(self))]
    pub async fn rename(&self, user_drive: &UserDrive, file_id: FileId, name: &str) -> Result<()> {
        let repo = self.stores.get(user_drive)?;
        self.api
            .rename_file(user_drive.drive_id, file_id, name)
            .await
            .with_context(|| format!("Failed to rename {file_id}"))?;

        let name = name.to_string();
        repo.update_in_place(file_id, Box::new(move |f: &mut File| f.set_name(name)))
            .await;
        info!("Renamed");
        Ok(())
    }

    /// Moves a node to the trash and drops its cached subtree
    #[tracing::instrument(skip(self))]
    pub async fn trash(&self, user_drive: &UserDrive, file_id: FileId) -> Result<()> {
        let repo = self.stores.get(user_drive)?;
        self.api
            .trash_file(user_drive.drive_id, file_id)
            .await
            .with_context(|| format!("Failed to trash {file_id}"))?;

        repo.delete(file_id, DeleteOptions::recursive()).await;
        info!("Trashed");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_color(
        &self,
        user_drive: &UserDrive,
        file_id: FileId,
        color: &str,
    ) -> Result<()> {
        let repo = self.stores.get(user_drive)?;
        self.api
            .update_color(user_drive.drive_id, file_id, color)
            .await
            .with_context(|| format!("Failed to update color of {file_id}"))?;

        let color = color.to_string();
        repo.update_in_place(file_id, Box::new(move |f: &mut File| f.color = Some(color)))
            .await;
        Ok(())
    }

    /// Marks a node as favorite and links it into the Favorites container
    #[tracing::instrument(skip(self))]
    pub async fn add_favorite(&self, user_drive: &UserDrive, file_id: FileId) -> Result<()> {
        let repo = self.stores.get(user_drive)?;
        self.api
            .add_favorite(user_drive.drive_id, file_id)
            .await
            .with_context(|| format!("Failed to add {file_id} to favorites"))?;

        if repo.get_by_id(file_id).await?.is_none() {
            debug!("Not cached, favorites container left as is");
            return Ok(());
        }
        repo.update_in_place(file_id, Box::new(|f: &mut File| f.is_favorite = true))
            .await;
        ensure_container(repo.as_ref(), SpecialFolder::Favorites, user_drive).await?;
        repo.attach_child(SpecialFolder::Favorites.id(), file_id)
            .await?;
        Ok(())
    }

    /// Clears the favorite flag and unlinks the node from the Favorites container
    #[tracing::instrument(skip(self))]
    pub async fn remove_favorite(&self, user_drive: &UserDrive, file_id: FileId) -> Result<()> {
        let repo = self.stores.get(user_drive)?;
        self.api
            .remove_favorite(user_drive.drive_id, file_id)
            .await
            .with_context(|| format!("Failed to remove {file_id} from favorites"))?;

        repo.update_in_place(file_id, Box::new(|f: &mut File| f.is_favorite = false))
            .await;
        repo.detach_child(SpecialFolder::Favorites.id(), file_id)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_dropbox(&self, user_drive: &UserDrive, file_id: FileId) -> Result<DropBox> {
        let repo = self.stores.get(user_drive)?;
        let dropbox = self
            .api
            .create_dropbox(user_drive.drive_id, file_id)
            .await
            .with_context(|| format!("Failed to create dropbox on {file_id}"))?;

        let stored = dropbox.clone();
        repo.update_in_place(file_id, Box::new(move |f: &mut File| f.dropbox = Some(stored)))
            .await;
        Ok(dropbox)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_dropbox(&self, user_drive: &UserDrive, file_id: FileId) -> Result<()> {
        let repo = self.stores.get(user_drive)?;
        self.api
            .delete_dropbox(user_drive.drive_id, file_id)
            .await
            .with_context(|| format!("Failed to delete dropbox of {file_id}"))?;

        repo.update_in_place(file_id, Box::new(|f: &mut File| f.dropbox = None))
            .await;
        Ok(())
    }

    /// Pins or unpins a node for offline access (local only)
    #[tracing::instrument(skip(self))]
    pub async fn set_offline(
        &self,
        user_drive: &UserDrive,
        file_id: FileId,
        offline: bool,
    ) -> Result<()> {
        let repo = self.stores.get(user_drive)?;
        repo.update_in_place(file_id, Box::new(move |f: &mut File| f.is_offline = offline))
            .await;
        Ok(())
    }
}

async fn ensure_container(
    repo: &dyn IFileRepository,
    kind: SpecialFolder,
    user_drive: &UserDrive,
) -> Result<()> {
    if repo.get_by_id(kind.id()).await?.is_none() {
        repo.save_file(&kind.container(user_drive.drive_id)).await?;
    }
    Ok(())
}
