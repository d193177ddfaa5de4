//! Activities command - Catch a cached folder up through its activity feed

use anyhow::Result;
use clap::Args;
use kdrive_core::domain::FileId;

use super::cancel_on_ctrl_c;
use crate::output::{get_formatter, OutputFormat};
use crate::session::Session;

#[derive(Debug, Args)]
pub struct ActivitiesCommand {
    /// Folder id (defaults to the drive root)
    #[arg(default_value_t = 1)]
    pub folder: i64,
}

impl ActivitiesCommand {
    pub async fn execute(&self, session: &Session, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let folder_id = FileId::new(self.folder);
        let cancel = cancel_on_ctrl_c();

        let summary = session
            .provider
            .reconciler()
            .reconcile(&session.user_drive, folder_id, &cancel)
            .await?;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "folder_id": folder_id,
                "pages": summary.pages,
                "applied": summary.applied,
                "duplicates": summary.duplicates,
                "ignored": summary.ignored,
                "failed": summary.failed,
                "response_at": summary.response_at,
                "cancelled": summary.cancelled,
            }));
            return Ok(());
        }

        if summary.pages == 0 && !summary.cancelled {
            formatter.warn(&format!("Folder {folder_id} is not cached, nothing to catch up"));
            return Ok(());
        }
        formatter.success(&format!(
            "Applied {} activit(ies) from {} page(s)",
            summary.applied, summary.pages
        ));
        formatter.info(&format!(
            "{} duplicate, {} ignored, {} failed",
            summary.duplicates, summary.ignored, summary.failed
        ));
        if summary.cancelled {
            formatter.warn("Interrupted before the end of the feed");
        }
        Ok(())
    }
}
