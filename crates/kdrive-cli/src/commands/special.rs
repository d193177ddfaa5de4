//! Special command - List a special folder
//!
//! Special folders (favorites, shares, gallery, recent changes, shared with
//! me) are server-side queries materialized under reserved negative ids.

use anyhow::Result;
use clap::Args;
use kdrive_core::domain::{SortType, SpecialFolder};
use kdrive_sync::FolderPage;
use tokio::sync::mpsc;

use super::cancel_on_ctrl_c;
use crate::output::{get_formatter, OutputFormat};
use crate::session::Session;

#[derive(Debug, Args)]
pub struct SpecialCommand {
    /// favorites, my_shares, gallery, recent_changes or shared_with_me
    pub kind: SpecialFolder,

    #[arg(long, default_value_t = SortType::RecentDate)]
    pub sort: SortType,

    /// Only read the mirror, never call the server
    #[arg(long)]
    pub cached: bool,
}

impl SpecialCommand {
    pub async fn execute(&self, session: &Session, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        if !self.cached {
            // The page stream is not displayed, only the final content
            let (tx, mut rx) = mpsc::channel::<FolderPage>(4);
            let drain = async move { while rx.recv().await.is_some() {} };
            let cancel = cancel_on_ctrl_c();
            let load = session.provider.load_special_folder(
                &session.user_drive,
                self.kind,
                self.sort,
                &cancel,
                tx,
            );
            let (pages, ()) = tokio::join!(load, drain);
            formatter.info(&format!("Loaded {} page(s) of {}", pages?, self.kind));
        }

        let files = session
            .provider
            .get_special_folder(&session.user_drive, self.kind, self.sort)
            .await?;
        formatter.print_files(&files);
        Ok(())
    }
}
