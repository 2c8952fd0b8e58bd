//! Generate-schema command - write the search schema for a domain

use crate::cli::output::{colors, print_success};
use crate::cli::OutputFormat;
use crate::core::schema::{self, SchemaDescription};
use crate::core::services::Services;
use crate::core::types::Domain;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the generate-schema command
#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Input domain: symbolic (or musicxml) or audio
    #[arg(long, short = 'd')]
    pub domain: Domain,

    /// Metadata CSV whose columns are mapped under `metadata`
    #[arg(long, short = 'm')]
    pub metadata: Option<PathBuf>,

    /// Existing schema file to extend with the generated fields
    #[arg(long)]
    pub merge_into: Option<PathBuf>,

    /// Write the schema to this file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Schema file result response
#[derive(Debug, Serialize)]
pub struct SchemaResponse {
    pub domain: Domain,
    pub path: String,
    pub fields: usize,
    pub merged: bool,
}

/// Build the schema requested by `args`
pub fn build_schema(
    args: &SchemaArgs,
    services: &Services,
) -> Result<SchemaDescription, Box<dyn std::error::Error>> {
    let columns = services
        .metadata_source(args.metadata.as_deref())?
        .columns();
    let generated = schema::generate(args.domain, &services.registry, columns.as_ref())?;

    match &args.merge_into {
        Some(path) => {
            let existing = schema::read_schema_file(path)?;
            Ok(schema::merge_into_existing(existing, &generated)?)
        }
        None => Ok(generated),
    }
}

/// Execute the generate-schema command
pub async fn execute(
    args: SchemaArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = build_schema(&args, services)?;

    let Some(path) = &args.output else {
        // The schema itself is the output
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    };

    schema::write_schema_file(path, &schema)?;

    let response = SchemaResponse {
        domain: args.domain,
        path: path.to_string_lossy().into_owned(),
        fields: schema.properties.len(),
        merged: args.merge_into.is_some(),
    };

    match format {
        OutputFormat::Human => {
            print_success(&format!(
                "Wrote {} schema ({} top-level fields)",
                response.domain, response.fields
            ));
            println!(
                "  {}: {}",
                colors::label("Path"),
                colors::file_path(&response.path)
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
