//! kDrive CLI - Command-line access to the local kDrive mirror
//!
//! Provides commands for:
//! - Listing folders and special folders (cache-first, with refresh)
//! - Searching the mirror by name
//! - Catching a folder up through its activity feed
//! - Sweeping orphan nodes
//! - Pinning nodes for offline access
//! - Managing saved error reports and the configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod session;

use commands::{
    activities::ActivitiesCommand,
    config::ConfigCommand,
    ls::LsCommand,
    offline::OfflineCommand,
    path::PathCommand,
    report::ReportCommand,
    search::SearchCommand,
    special::SpecialCommand,
    sweep::SweepCommand,
};
use output::OutputFormat;
use session::{load_config, Session};

#[derive(Debug, Parser)]
#[command(name = "kdrive", version, about = "Local mirror of a kDrive file tree")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// User owning the store
    #[arg(long, global = true, default_value_t = 0)]
    user: i64,

    /// Drive to operate on
    #[arg(long, global = true, default_value_t = 0)]
    drive: i64,

    /// Use the "shared with me" store of the drive
    #[arg(long, global = true)]
    shared: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List a folder
    Ls(LsCommand),
    /// List a special folder (favorites, gallery, ...)
    Special(SpecialCommand),
    /// Search cached nodes by name
    Search(SearchCommand),
    /// Apply a folder's activity feed to the mirror
    Activities(ActivitiesCommand),
    /// Remove cached nodes no folder links to
    Sweep(SweepCommand),
    /// Pin or unpin a node for offline access
    Offline(OfflineCommand),
    /// Resolve the path of a cached node
    Path(PathCommand),
    /// Manage saved error reports
    #[command(subcommand)]
    Report(ReportCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config_path, config) = load_config(cli.config.as_ref())?;

    // Setup tracing
    let level = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = OutputFormat::from_flag(cli.json);

    // Commands that never open a store
    match &cli.command {
        Commands::Report(cmd) => return cmd.execute(&config, format),
        Commands::Config(cmd) => return cmd.execute(&config_path, &config, format),
        _ => {}
    }

    let session = Session::open(&config, cli.user, cli.drive, cli.shared).await?;
    let result = match &cli.command {
        Commands::Ls(cmd) => cmd.execute(&session, format).await,
        Commands::Special(cmd) => cmd.execute(&session, format).await,
        Commands::Search(cmd) => cmd.execute(&session, format).await,
        Commands::Activities(cmd) => cmd.execute(&session, format).await,
        Commands::Sweep(cmd) => cmd.execute(&session, format).await,
        Commands::Offline(cmd) => cmd.execute(&session, format).await,
        Commands::Path(cmd) => cmd.execute(&session, format).await,
        Commands::Report(_) | Commands::Config(_) => Ok(()),
    };

    let captured = session.reporter.errors_captured() + session.reporter.anomalies_captured();
    if captured > 0 {
        tracing::warn!(captured, "Problems were recorded, see `kdrive report list`");
    }
    result
}
