//! List-processors command - show the registered feature processors

use crate::cli::output::{colors, mapping_kind, print_header};
use crate::cli::OutputFormat;
use crate::core::registry::ProcessorSummary;
use crate::core::services::Services;
use crate::core::types::Domain;
use clap::Args;
use std::sync::Arc;

/// Arguments for the list-processors command
#[derive(Args, Debug)]
pub struct ProcessorsArgs {
    /// Only list processors of this domain
    #[arg(long, short = 'd')]
    pub domain: Option<Domain>,
}

/// Collect processor summaries in registry order
pub fn list(args: &ProcessorsArgs, services: &Services) -> Vec<ProcessorSummary> {
    let domains: Vec<Domain> = match args.domain {
        Some(domain) => vec![domain],
        None => Domain::ALL.to_vec(),
    };

    domains
        .into_iter()
        .flat_map(|domain| services.registry.descriptors_for(domain))
        .map(|descriptor| ProcessorSummary::from(&descriptor))
        .collect()
}

/// Execute the list-processors command
pub async fn execute(
    args: ProcessorsArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let summaries = list(&args, services);

    match format {
        OutputFormat::Human => {
            for domain in Domain::ALL {
                let rows: Vec<&ProcessorSummary> =
                    summaries.iter().filter(|s| s.domain == domain).collect();
                if rows.is_empty() {
                    continue;
                }

                print_header(&format!("{domain} processors ({})", rows.len()));
                for summary in rows {
                    let name = format!("{}/{}", summary.feature_name, summary.algorithm_name);
                    println!(
                        "  {:<40} {}",
                        colors::feature(&name),
                        colors::dim(&mapping_kind(&summary.mapping))
                    );
                }
                println!();
            }
            println!(
                "Use a feature name (the part before '/') with --overwrite; \
                 'metadata' and 'all' are also accepted."
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
    }

    Ok(())
}
