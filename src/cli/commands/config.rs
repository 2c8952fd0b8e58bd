//! Config command - show current configuration

use crate::cli::output::{colors, print_header};
use crate::cli::OutputFormat;
use crate::core::config::Config;
use crate::core::services::Services;
use crate::core::xdg::XdgDirs;
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {}

/// Configuration response
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub config_file: String,
    pub config_file_exists: bool,
    #[serde(flatten)]
    pub config: Config,
}

/// Execute the config command
pub async fn execute(
    _args: ConfigArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let xdg = XdgDirs::new();
    let config_file = xdg.config_file();

    let response = ConfigResponse {
        config_file: config_file.to_string_lossy().into_owned(),
        config_file_exists: config_file.exists(),
        config: (*services.config).clone(),
    };

    match format {
        OutputFormat::Human => {
            let source = if response.config_file_exists {
                colors::file_path(&response.config_file).to_string()
            } else {
                format!(
                    "{} {}",
                    colors::dim("defaults (no file at"),
                    colors::dim(&format!("{})", response.config_file))
                )
            };
            print_header("Configuration:");
            println!("  source: {source}");
            println!();
            print!("{}", toml::to_string_pretty(&response.config)?);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
