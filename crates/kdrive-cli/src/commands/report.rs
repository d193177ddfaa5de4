//! Report command - Manage saved error and anomaly reports
//!
//! Provides the `kdrive report` CLI command with subcommands:
//! - `list`: Show all saved reports
//! - `view <id>`: Display a specific report
//! - `delete`: Remove reports from local storage

use anyhow::Result;
use clap::Subcommand;
use kdrive_core::config::Config;
use kdrive_telemetry::LocalReportStore;

use crate::output::{format_size, get_formatter, OutputFormat};

/// Report management subcommands
#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    /// List all saved reports
    List,
    /// View a specific report
    View {
        /// Report id
        id: String,
    },
    /// Delete reports from local storage
    Delete {
        /// Specific report id to delete
        #[arg(required_unless_present = "all")]
        id: Option<String>,
        /// Delete all reports
        #[arg(long)]
        all: bool,
    },
}

impl ReportCommand {
    pub fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let store = LocalReportStore::new(config.telemetry.reports_dir.clone());

        match self {
            ReportCommand::List => {
                let entries = store.list()?;
                if format.is_json() {
                    let json: Vec<serde_json::Value> = entries
                        .iter()
                        .map(|e| {
                            serde_json::json!({
                                "id": e.id,
                                "kind": e.kind,
                                "date": e.date,
                                "size_bytes": e.size_bytes,
                            })
                        })
                        .collect();
                    formatter.print_json(&serde_json::json!(json));
                    return Ok(());
                }
                if entries.is_empty() {
                    formatter.info("No reports found.");
                    return Ok(());
                }

                println!("{:<38} {:<8} {:<10} {:>10}", "ID", "Kind", "Date", "Size");
                println!("{}", "-".repeat(69));
                for entry in &entries {
                    println!(
                        "{:<38} {:<8} {:<10} {:>10}",
                        entry.id,
                        entry.kind,
                        entry.date,
                        format_size(entry.size_bytes as i64),
                    );
                }
                println!();
                println!("Total: {} report(s)", entries.len());
            }

            ReportCommand::View { id } => match store.read(id)? {
                Some(report) => {
                    if format.is_json() {
                        formatter.print_json(&serde_json::to_value(&report)?);
                    } else {
                        println!("id:        {}", report.id);
                        println!("kind:      {}", report.kind);
                        println!("timestamp: {}", report.timestamp);
                        println!("version:   {}", report.version);
                        println!("operation: {}", report.operation);
                        println!("message:   {}", report.message);
                        for (key, value) in &report.tags {
                            println!("  {key} = {value}");
                        }
                        for cause in &report.chain {
                            println!("  caused by: {cause}");
                        }
                    }
                }
                None => formatter.warn(&format!("Report '{id}' not found")),
            },

            ReportCommand::Delete { id, all } => {
                if *all {
                    let count = store.delete_all()?;
                    formatter.success(&format!("Deleted {count} report(s)"));
                } else if let Some(id) = id {
                    if store.delete(id)? {
                        formatter.success(&format!("Deleted report '{id}'"));
                    } else {
                        formatter.warn(&format!("Report '{id}' not found"));
                    }
                }
            }
        }

        Ok(())
    }
}
