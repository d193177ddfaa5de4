use anyhow::Result;
use clap::Args;
use kdrive_core::domain::FileId;

use crate::output::{get_formatter, OutputFormat};
use crate::session::Session;

/// Resolve the path of a cached node from the drive root
#[derive(Debug, Args)]
pub struct PathCommand {
    pub file: i64,
}

impl PathCommand {
    pub async fn execute(&self, session: &Session, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let file_id = FileId::new(self.file);
        let path = session.repo.get_path(file_id).await?;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({ "file_id": file_id, "path": path }));
            return Ok(());
        }
        match path {
            Some(path) => println!("{path}"),
            None => formatter.warn(&format!("{file_id} has no resolvable path")),
        }
        Ok(())
    }
}
