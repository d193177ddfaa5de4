use anyhow::Result;
use clap::Args;
use kdrive_core::domain::SortType;

use crate::output::{get_formatter, OutputFormat};
use crate::session::Session;

/// Search cached nodes whose name contains the query
///
/// Matching ignores case and accents. Only the mirror is searched.
#[derive(Debug, Args)]
pub struct SearchCommand {
    pub query: String,

    #[arg(long, default_value_t = SortType::NameAz)]
    pub sort: SortType,
}

impl SearchCommand {
    pub async fn execute(&self, session: &Session, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let hits = session.repo.search(&self.query, self.sort).await?;
        formatter.info(&format!("{} match(es) for '{}'", hits.len(), self.query));
        formatter.print_files(&hits);
        Ok(())
    }
}
