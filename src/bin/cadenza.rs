//! cadenza CLI - incremental feature extraction for music corpora
//!
//! # Examples
//!
//! ```bash
//! # Extract features from a directory of scores and recordings
//! cadenza process ./corpus --output ./out --corpus-id folk-songs
//!
//! # Recompute only the tempo bucket for files seen before
//! cadenza process ./corpus -o ./out -c folk-songs --overwrite tempo
//!
//! # Write the audio schema, including metadata CSV columns
//! cadenza generate-schema --domain audio --metadata meta.csv -o audio.json
//!
//! # List processors
//! cadenza list-processors
//! ```

use clap::Parser;
use cadenza::cli::{init_tracing, run, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
