//! Process command - extract features from a directory of inputs

use crate::cli::commands::cancel_on_ctrl_c;
use crate::cli::output::{colors, format_duration, print_warning};
use crate::cli::OutputFormat;
use crate::core::pipeline::{OutputLog, RunOptions};
use crate::core::services::Services;
use crate::core::types::{OverwriteSet, RunStats};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the process command
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Directory containing the input files
    pub input: PathBuf,

    /// Output log file (or directory, to use the configured log file name)
    #[arg(long, short = 'o')]
    pub output: PathBuf,

    /// Corpus the documents belong to
    #[arg(long, short = 'c')]
    pub corpus_id: String,

    /// Feature bucket to recompute for known files; 'all' recomputes
    /// everything, 'metadata' refreshes metadata (can be specified
    /// multiple times)
    #[arg(long, value_name = "NAME")]
    pub overwrite: Vec<String>,

    /// Metadata CSV matched to inputs by file name
    #[arg(long, short = 'm')]
    pub metadata: Option<PathBuf>,

    /// Descend into subdirectories
    #[arg(long, short = 'r')]
    pub recursive: bool,

    /// Do not embed the MusicXML source in symbolic documents
    #[arg(long)]
    pub no_original: bool,

    /// Number of files processed concurrently
    #[arg(long, short = 'w')]
    pub workers: Option<usize>,

    /// Suppress progress output
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

/// Process result response
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub corpus_id: String,
    pub input: String,
    pub output: String,
    pub overwrite: Vec<String>,
    #[serde(flatten)]
    pub stats: RunStats,
    pub duration_secs: f64,
}

/// Execute the process command
pub async fn execute(
    args: ProcessArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    // Validate input path
    let input = args.input.canonicalize().map_err(|e| {
        format!(
            "Invalid input path '{}': {}. Make sure the directory exists and is accessible.",
            args.input.display(),
            e
        )
    })?;

    if !input.is_dir() {
        return Err(format!("Input path '{}' is not a directory.", input.display()).into());
    }

    // Apply per-run overrides
    let mut config = (*services.config).clone();
    config.pipeline.recursive |= args.recursive;
    if let Some(workers) = args.workers {
        config.pipeline.workers = workers;
    }
    config.validate()?;

    let include_original = config.pipeline.include_original && !args.no_original;
    let log_path = OutputLog::resolve(&args.output, &config.output);
    let overwrite = OverwriteSet::from_names(&args.overwrite);

    let services = services.with_config(config);
    let metadata = services.metadata_source(args.metadata.as_deref())?;
    let driver = services.create_driver(metadata);
    cancel_on_ctrl_c(driver.cancellation_token());

    if !args.quiet && format == OutputFormat::Human {
        eprintln!(
            "Processing {} into {} (corpus '{}')...",
            colors::file_path(&input.display().to_string()),
            colors::file_path(&log_path.display().to_string()),
            colors::corpus_id(&args.corpus_id)
        );
    }

    let options = RunOptions {
        input_dir: input.clone(),
        log_path: log_path.clone(),
        corpus_id: args.corpus_id.clone(),
        overwrite: overwrite.clone(),
        include_original,
    };
    let stats = driver.run(&options).await?;

    let response = ProcessResponse {
        corpus_id: args.corpus_id,
        input: input.to_string_lossy().into_owned(),
        output: log_path.to_string_lossy().into_owned(),
        overwrite: overwrite.names(),
        duration_secs: stats.duration_ms as f64 / 1000.0,
        stats,
    };

    match format {
        OutputFormat::Human => print_human(&response),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}

fn print_human(response: &ProcessResponse) {
    let stats = &response.stats;
    if stats.resumed {
        print_warning("Previous run was interrupted; resumed from its backup and partial output");
    }

    println!(
        "{} {} of {} files in {}",
        colors::success("Processed"),
        colors::number(&stats.documents_written.to_string()),
        colors::number(&stats.files_found.to_string()),
        format_duration(response.duration_secs)
    );
    println!(
        "  {} new, {} merged, {} failed",
        colors::number(&stats.files_new.to_string()),
        colors::number(&stats.files_merged.to_string()),
        colors::number(&stats.files_failed.to_string())
    );
    println!(
        "  {}: {}",
        colors::label("Output"),
        colors::file_path(&response.output)
    );

    if stats.files_failed > 0 {
        print_warning(&format!(
            "{} files failed; see the log above for details",
            stats.files_failed
        ));
    }
    if stats.cancelled {
        print_warning(&format!(
            "Run cancelled, {} files not processed. Rerun to resume.",
            stats.files_skipped
        ));
    }
}
