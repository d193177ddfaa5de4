use anyhow::Result;
use clap::Args;
use kdrive_core::domain::FileId;

use crate::output::{get_formatter, OutputFormat};
use crate::session::Session;

/// Pin or unpin a cached node for offline access
///
/// Only the local flag changes; nothing is sent to the server.
#[derive(Debug, Args)]
pub struct OfflineCommand {
    pub file: i64,

    /// Remove the pin instead of setting it
    #[arg(long)]
    pub off: bool,
}

impl OfflineCommand {
    pub async fn execute(&self, session: &Session, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let file_id = FileId::new(self.file);

        let Some(file) = session.repo.get_by_id(file_id).await? else {
            formatter.warn(&format!("{file_id} is not cached"));
            return Ok(());
        };

        let offline = !self.off;
        session
            .actions
            .set_offline(&session.user_drive, file_id, offline)
            .await?;

        let verb = if offline { "Pinned" } else { "Unpinned" };
        formatter.success(&format!("{verb} '{}'", file.name));
        Ok(())
    }
}
