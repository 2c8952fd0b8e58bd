//! Reprocess-dump command - rebuild an output log from a store dump

use crate::cli::commands::cancel_on_ctrl_c;
use crate::cli::output::{colors, format_duration, print_warning};
use crate::cli::OutputFormat;
use crate::core::pipeline::{DumpOptions, OutputLog};
use crate::core::services::Services;
use crate::core::types::RunStats;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the reprocess-dump command
#[derive(Args, Debug)]
pub struct ReprocessArgs {
    /// Dump snapshot (NDJSON of `_source` records)
    pub dump: PathBuf,

    /// Output log file (or directory, to use the configured log file name)
    #[arg(long, short = 'o')]
    pub output: PathBuf,

    /// Corpus assigned to every document (default: each record's own)
    #[arg(long, short = 'c')]
    pub corpus_id: Option<String>,

    /// Reprocess only records of this corpus
    #[arg(long)]
    pub corpus_filter: Option<String>,

    /// Metadata CSV used for records without metadata
    #[arg(long, short = 'm')]
    pub metadata: Option<PathBuf>,

    /// Number of records processed concurrently
    #[arg(long, short = 'w')]
    pub workers: Option<usize>,
}

/// Reprocess result response
#[derive(Debug, Serialize)]
pub struct ReprocessResponse {
    pub dump: String,
    pub output: String,
    #[serde(flatten)]
    pub stats: RunStats,
    pub duration_secs: f64,
}

/// Execute the reprocess-dump command
pub async fn execute(
    args: ReprocessArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(corpus_id) = &args.corpus_id {
        if corpus_id.trim().is_empty() {
            return Err("Corpus id cannot be empty.".into());
        }
    }

    let mut config = (*services.config).clone();
    if let Some(workers) = args.workers {
        config.pipeline.workers = workers;
    }
    config.validate()?;

    let log_path = OutputLog::resolve(&args.output, &config.output);

    let services = services.with_config(config);
    let metadata = services.metadata_source(args.metadata.as_deref())?;
    let driver = services.create_driver(metadata);
    cancel_on_ctrl_c(driver.cancellation_token());

    let options = DumpOptions {
        dump_path: args.dump.clone(),
        log_path: log_path.clone(),
        corpus_id: args.corpus_id,
        corpus_filter: args.corpus_filter,
    };
    let stats = driver.reprocess_dump(&options).await?;

    let response = ReprocessResponse {
        dump: args.dump.to_string_lossy().into_owned(),
        output: log_path.to_string_lossy().into_owned(),
        duration_secs: stats.duration_ms as f64 / 1000.0,
        stats,
    };

    match format {
        OutputFormat::Human => {
            println!(
                "{} {} of {} records in {}",
                colors::success("Reprocessed"),
                colors::number(&response.stats.documents_written.to_string()),
                colors::number(&response.stats.files_found.to_string()),
                format_duration(response.duration_secs)
            );
            println!(
                "  {}: {}",
                colors::label("Output"),
                colors::file_path(&response.output)
            );
            if response.stats.files_failed > 0 {
                print_warning(&format!(
                    "{} records failed; see the log above for details",
                    response.stats.files_failed
                ));
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
