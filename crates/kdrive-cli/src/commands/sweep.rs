use anyhow::Result;
use clap::Args;

use crate::output::{get_formatter, OutputFormat};
use crate::session::Session;

/// Remove cached nodes that no folder links to
///
/// The drive root and the special-folder containers are never removed.
#[derive(Debug, Args)]
pub struct SweepCommand {}

impl SweepCommand {
    pub async fn execute(&self, session: &Session, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let removed = session.repo.remove_orphans().await?;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({ "removed": removed }));
        } else {
            formatter.success(&format!("Removed {removed} orphan node(s)"));
        }
        Ok(())
    }
}
