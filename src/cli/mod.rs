//! CLI adapter for cadenza
//!
//! Provides the command-line interface to the feature pipeline. The
//! adapter only parses arguments and formats results; everything else
//! lives in `core/`.
//!
//! # Architecture
//!
//! ```text
//! +------------------+      +------------------+
//! |      cli/        | ---> |     core/        |
//! | (clap adapter)   |      |  (domain logic)  |
//! +------------------+      +------------------+
//! ```

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// cadenza - incremental feature extraction for music corpora
///
/// Extracts features from MusicXML scores and audio recordings into an
/// NDJSON log, recomputing only what changed since the previous run.
#[derive(Parser, Debug)]
#[command(name = "cadenza")]
#[command(version)]
#[command(about = "Incremental feature extraction for music corpora", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub format: OutputFormat,

    /// Diagnostic log format on stderr
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Format of the tracing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Plain text lines (default)
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract features from every input file of a directory
    Process(commands::ProcessArgs),

    /// Rebuild an output log from the sources embedded in a store dump
    #[command(name = "reprocess-dump")]
    ReprocessDump(commands::ReprocessArgs),

    /// Write the search schema for a domain
    #[command(name = "generate-schema")]
    GenerateSchema(commands::SchemaArgs),

    /// List registered feature processors
    #[command(name = "list-processors")]
    ListProcessors(commands::ProcessorsArgs),

    /// Show current configuration
    #[command(name = "show-config")]
    ShowConfig(commands::ConfigArgs),

    /// Generate shell completion scripts
    ///
    /// Output completion script to stdout. To install:
    ///
    ///   bash:  cadenza completions bash > ~/.local/share/bash-completion/completions/cadenza
    ///   zsh:   cadenza completions zsh > ~/.zfunc/_cadenza
    ///   fish:  cadenza completions fish > ~/.config/fish/completions/cadenza.fish
    Completions(commands::CompletionsArgs),
}

/// Install the tracing subscriber on stderr
///
/// `RUST_LOG` overrides the default `cadenza=info` filter.
pub fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cadenza=info".into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

/// Run the CLI with the provided arguments
pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    use crate::core::config::Config;
    use crate::core::services::Services;
    use crate::core::xdg::XdgDirs;
    use std::sync::Arc;

    // Handle completions command early (doesn't need services)
    if let Commands::Completions(args) = cli.command {
        return commands::completions::execute(args);
    }

    // Resolve XDG directories
    let xdg = XdgDirs::new();
    xdg.log_paths();

    // Load configuration
    let config = Config::load_with_xdg(&xdg)?;
    config.log_config();

    // Create services
    let services = Arc::new(Services::new(config)?);

    // Execute command
    match cli.command {
        Commands::Process(args) => commands::process::execute(args, &services, cli.format).await,
        Commands::ReprocessDump(args) => {
            commands::reprocess::execute(args, &services, cli.format).await
        }
        Commands::GenerateSchema(args) => {
            commands::schema::execute(args, &services, cli.format).await
        }
        Commands::ListProcessors(args) => {
            commands::processors::execute(args, &services, cli.format).await
        }
        Commands::ShowConfig(args) => commands::config::execute(args, &services, cli.format).await,
        Commands::Completions(_) => unreachable!(), // Handled above
    }
}
