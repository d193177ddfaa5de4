//! kDrive implementation of the `IDriveApi` port
//!
//! [`KDriveApi`] maps each port method onto its REST endpoint. Listing calls
//! share one helper that adds the cursor, page size and server-side sort
//! parameters, then unwraps the envelope into a [`CursorPage`].

use async_trait::async_trait;
use kdrive_core::domain::{
    DriveId, DropBox, File, FileActivity, FileId, SortType, SpecialFolder,
};
use kdrive_core::ports::{CursorPage, IDriveApi};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

use crate::client::KDriveClient;
use crate::models::{ApiActivity, ApiDropBox, ApiFile};
use crate::ApiError;

/// Default number of items requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 200;

type Query = Vec<(&'static str, String)>;

/// `IDriveApi` adapter backed by [`KDriveClient`]
pub struct KDriveApi {
    client: KDriveClient,
    page_size: u32,
}

impl KDriveApi {
    pub fn new(client: KDriveClient) -> Self {
        Self {
            client,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets the `limit` sent with every listing call
    ///
    /// Must match the page size the folder provider uses to decide
    /// completeness.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn client(&self) -> &KDriveClient {
        &self.client
    }

    fn page_query(&self, cursor: Option<&str>) -> Query {
        let mut query = vec![("limit", self.page_size.to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        query
    }

    async fn list_files(
        &self,
        drive_id: DriveId,
        path: &str,
        mut query: Query,
        order: SortType,
    ) -> Result<CursorPage<File>, ApiError> {
        query.push(("order_by", order.api_order_by().to_string()));
        query.push(("order", order.api_order().to_string()));

        let envelope = self
            .client
            .send::<Vec<ApiFile>>(Method::GET, path, &query, None)
            .await?;
        let cursor = envelope.cursor.clone();
        let has_more = envelope.has_more;
        let response_at = envelope.response_at.unwrap_or(0);
        let data = envelope
            .into_data()?
            .into_iter()
            .map(|f| f.into_file(drive_id))
            .collect::<Vec<_>>();

        debug!(path, count = data.len(), has_more, "Fetched listing page");
        Ok(CursorPage {
            data,
            cursor,
            has_more,
            response_at,
        })
    }

    /// Sends a mutation and checks the envelope reports success
    async fn mutate(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<(), ApiError> {
        let envelope = self
            .client
            .send::<serde_json::Value>(method, path, &[], body.as_ref())
            .await?;
        if envelope.is_success() {
            Ok(())
        } else {
            envelope.into_data().map(|_| ())
        }
    }
}

fn special_folder_path(drive_id: DriveId, folder: SpecialFolder) -> (String, Query) {
    let base = format!("/3/drive/{drive_id}/files");
    match folder {
        SpecialFolder::Favorites => (format!("{base}/favorites"), Vec::new()),
        SpecialFolder::MyShares => (format!("{base}/my_shared"), Vec::new()),
        SpecialFolder::RecentChanges => (format!("{base}/last_modified"), Vec::new()),
        SpecialFolder::SharedWithMe => (format!("{base}/shared_with_me"), Vec::new()),
        SpecialFolder::Gallery => (
            format!("{base}/search"),
            vec![("types[]", "image".to_string()), ("types[]", "video".to_string())],
        ),
    }
}

fn file_path(drive_id: DriveId, file_id: FileId) -> String {
    format!("/2/drive/{drive_id}/files/{file_id}")
}

#[async_trait]
impl IDriveApi for KDriveApi {
    async fn get_folder_files(
        &self,
        drive_id: DriveId,
        folder_id: FileId,
        cursor: Option<&str>,
        order: SortType,
    ) -> anyhow::Result<CursorPage<File>> {
        let path = format!("/3/drive/{drive_id}/files/{folder_id}/files");
        Ok(self
            .list_files(drive_id, &path, self.page_query(cursor), order)
            .await?)
    }

    async fn get_file_details(
        &self,
        drive_id: DriveId,
        file_id: FileId,
    ) -> anyhow::Result<Option<File>> {
        let path = format!("/3/drive/{drive_id}/files/{file_id}");
        match self
            .client
            .send::<ApiFile>(Method::GET, &path, &[], None)
            .await
        {
            Ok(envelope) => Ok(Some(envelope.into_data()?.into_file(drive_id))),
            Err(ApiError::NotFound(_)) => {
                debug!(%drive_id, %file_id, "File no longer exists on server");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_file_activities(
        &self,
        drive_id: DriveId,
        folder_id: FileId,
        cursor: Option<&str>,
        since: Option<i64>,
        recursive: bool,
    ) -> anyhow::Result<CursorPage<FileActivity>> {
        let path = format!("/3/drive/{drive_id}/files/{folder_id}/activities");
        let mut query = self.page_query(cursor);
        query.push(("with", "file".to_string()));
        query.push((
            "depth",
            if recursive { "unlimited" } else { "children" }.to_string(),
        ));
        if let Some(since) = since {
            query.push(("from_date", since.to_string()));
        }

        let envelope = self
            .client
            .send::<Vec<ApiActivity>>(Method::GET, &path, &query, None)
            .await?;
        let cursor = envelope.cursor.clone();
        let has_more = envelope.has_more;
        let response_at = envelope.response_at.unwrap_or(0);
        let data: Vec<FileActivity> = envelope
            .into_data()?
            .into_iter()
            .map(|a| a.into_activity(drive_id))
            .collect();

        debug!(%folder_id, count = data.len(), has_more, "Fetched activity page");
        Ok(CursorPage {
            data,
            cursor,
            has_more,
            response_at,
        })
    }

    async fn get_special_folder_files(
        &self,
        drive_id: DriveId,
        folder: SpecialFolder,
        cursor: Option<&str>,
        order: SortType,
    ) -> anyhow::Result<CursorPage<File>> {
        let (path, mut query) = special_folder_path(drive_id, folder);
        query.extend(self.page_query(cursor));
        Ok(self.list_files(drive_id, &path, query, order).await?)
    }

    async fn rename_file(
        &self,
        drive_id: DriveId,
        file_id: FileId,
        name: &str,
    ) -> anyhow::Result<()> {
        let path = format!("{}/rename", file_path(drive_id, file_id));
        self.mutate(Method::POST, &path, Some(json!({ "name": name })))
            .await?;
        info!(%file_id, name, "Renamed file");
        Ok(())
    }

    async fn trash_file(&self, drive_id: DriveId, file_id: FileId) -> anyhow::Result<()> {
        self.mutate(Method::DELETE, &file_path(drive_id, file_id), None)
            .await?;
        info!(%file_id, "Moved file to trash");
        Ok(())
    }

    async fn update_color(
        &self,
        drive_id: DriveId,
        file_id: FileId,
        color: &str,
    ) -> anyhow::Result<()> {
        let path = format!("{}/color", file_path(drive_id, file_id));
        self.mutate(Method::POST, &path, Some(json!({ "color": color })))
            .await?;
        Ok(())
    }

    async fn add_favorite(&self, drive_id: DriveId, file_id: FileId) -> anyhow::Result<()> {
        let path = format!("{}/favorite", file_path(drive_id, file_id));
        self.mutate(Method::POST, &path, None).await?;
        Ok(())
    }

    async fn remove_favorite(&self, drive_id: DriveId, file_id: FileId) -> anyhow::Result<()> {
        let path = format!("{}/favorite", file_path(drive_id, file_id));
        self.mutate(Method::DELETE, &path, None).await?;
        Ok(())
    }

    async fn create_dropbox(
        &self,
        drive_id: DriveId,
        file_id: FileId,
    ) -> anyhow::Result<DropBox> {
        let path = format!("{}/dropbox", file_path(drive_id, file_id));
        let dropbox = self
            .client
            .send::<ApiDropBox>(Method::POST, &path, &[], Some(&json!({})))
            .await?
            .into_data()?;
        info!(%file_id, dropbox_id = dropbox.id, "Created dropbox");
        Ok(dropbox.into())
    }

    async fn delete_dropbox(&self, drive_id: DriveId, file_id: FileId) -> anyhow::Result<()> {
        let path = format!("{}/dropbox", file_path(drive_id, file_id));
        self.mutate(Method::DELETE, &path, None).await?;
        Ok(())
    }
}
