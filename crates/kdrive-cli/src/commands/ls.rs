//! Ls command - List a folder, cache-first
//!
//! Without flags the cached listing is printed when fresh and refetched
//! otherwise. `--all` walks every page, streaming progress as pages merge.

use anyhow::Result;
use clap::Args;
use kdrive_core::domain::{FileId, SortType};
use kdrive_sync::{FetchOptions, FolderPage};
use tokio::sync::mpsc;
use tracing::info;

use super::cancel_on_ctrl_c;
use crate::output::{get_formatter, OutputFormat};
use crate::session::Session;

#[derive(Debug, Args)]
pub struct LsCommand {
    /// Folder id (defaults to the drive root)
    #[arg(default_value_t = 1)]
    pub folder: i64,

    /// Sort order of the children
    #[arg(long, default_value_t = SortType::NameAz)]
    pub sort: SortType,

    /// Refetch even when the cached listing is fresh
    #[arg(long, conflicts_with = "cached")]
    pub refresh: bool,

    /// Only read the mirror, never call the server
    #[arg(long)]
    pub cached: bool,

    /// Load every page of the folder
    #[arg(long, conflicts_with = "cached")]
    pub all: bool,
}

impl LsCommand {
    pub async fn execute(&self, session: &Session, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let folder_id = FileId::new(self.folder);

        if self.all {
            let pages = self.load_all(session, folder_id, format).await?;
            formatter.info(&format!("Loaded {pages} page(s)"));
        }

        let options = if self.all || self.cached {
            FetchOptions::cache_only()
        } else {
            FetchOptions {
                ignore_cache: self.refresh,
                ignore_cloud: false,
            }
        };
        info!(%folder_id, ?options, "Listing folder");

        let Some(contents) = session
            .provider
            .get_folder_files(&session.user_drive, folder_id, self.sort, options)
            .await?
        else {
            formatter.warn(&format!("Folder {folder_id} is neither cached nor known to the server"));
            return Ok(());
        };

        if !format.is_json() {
            let source = if contents.from_cache { "cache" } else { "server" };
            println!(
                "{} ({} item(s), from {}{})",
                contents.folder.name,
                contents.children.len(),
                source,
                if contents.folder.is_complete { "" } else { ", partial" },
            );
        }
        formatter.print_files(&contents.children);
        Ok(())
    }

    async fn load_all(&self, session: &Session, folder_id: FileId, format: OutputFormat) -> Result<u32> {
        let (tx, mut rx) = mpsc::channel::<FolderPage>(4);
        let cancel = cancel_on_ctrl_c();

        let progress = async move {
            let mut merged = 0usize;
            while let Some(page) = rx.recv().await {
                merged += page.files.len();
                if !format.is_json() {
                    eprintln!("  merged {merged} item(s)");
                }
            }
        };
        let load = session.provider.load_all_pages(
            &session.user_drive,
            folder_id,
            self.sort,
            &cancel,
            tx,
        );

        let (pages, ()) = tokio::join!(load, progress);
        pages
    }
}
