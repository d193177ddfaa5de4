//! Config command - Show and validate the configuration file

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use kdrive_core::config::Config;
use tracing::info;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Check the configuration file for errors
    Validate,
}

impl ConfigCommand {
    pub fn execute(&self, config_path: &Path, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        match self {
            ConfigCommand::Show => {
                info!(config_path = %config_path.display(), "Showing configuration");
                if format.is_json() {
                    let json = serde_json::to_value(config)
                        .context("Failed to serialize configuration to JSON")?;
                    formatter.print_json(&json);
                } else {
                    println!("# {}", config_path.display());
                    println!("cache.data_dir:            {}", config.cache.data_dir.display());
                    println!("cache.page_size:           {}", config.cache.page_size);
                    println!("cache.min_version_code:    {}", config.cache.min_version_code);
                    println!("cache.app_version_code:    {}", config.cache.app_version_code);
                    println!("cache.cache_expiry_months: {}", config.cache.cache_expiry_months);
                    println!("api.base_url:              {}", config.api.base_url);
                    println!("api.timeout_secs:          {}", config.api.timeout_secs);
                    println!("logging.level:             {}", config.logging.level);
                    println!("telemetry.enabled:         {}", config.telemetry.enabled);
                    println!(
                        "telemetry.reports_dir:     {}",
                        config.telemetry.reports_dir.display()
                    );
                }
            }

            ConfigCommand::Validate => {
                let errors = config.validate();
                if format.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "valid": errors.is_empty(),
                        "config_path": config_path.display().to_string(),
                        "file_found": config_path.exists(),
                        "errors": errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    }));
                    return Ok(());
                }

                if !config_path.exists() {
                    formatter.warn("Configuration file not found, defaults apply");
                }
                if errors.is_empty() {
                    formatter.success("Configuration is valid");
                } else {
                    for error in &errors {
                        formatter.warn(&error.to_string());
                    }
                    anyhow::bail!("{} configuration error(s)", errors.len());
                }
            }
        }
        Ok(())
    }
}
