//! Tests for the list-processors CLI command

use crate::cli::test_helpers::create_cli_test_services;
use cadenza::cli::commands::processors::{execute, list, ProcessorsArgs};
use cadenza::cli::OutputFormat;
use cadenza::Domain;

/// Test listing every processor
#[tokio::test]
async fn test_list_all_processors() {
    let (services, _out) = create_cli_test_services();

    let summaries = list(&ProcessorsArgs { domain: None }, &services);
    assert_eq!(summaries.len(), services.registry.len());
    assert_eq!(summaries[0].domain, Domain::Symbolic);
    assert_eq!(summaries.last().unwrap().domain, Domain::Audio);
}

/// Test filtering by domain
#[tokio::test]
async fn test_list_audio_processors() {
    let (services, _out) = create_cli_test_services();

    let summaries = list(
        &ProcessorsArgs {
            domain: Some(Domain::Audio),
        },
        &services,
    );
    let names: Vec<&str> = summaries.iter().map(|s| s.feature_name.as_str()).collect();
    assert_eq!(names, vec!["file_info", "bpm", "pitch_contour", "chords", "loudness"]);
}

/// Test both output formats
#[tokio::test]
async fn test_list_processors_formats() {
    let (services, _out) = create_cli_test_services();

    for format in [OutputFormat::Human, OutputFormat::Json] {
        let result = execute(ProcessorsArgs { domain: None }, &services, format).await;
        assert!(result.is_ok(), "List ({format:?}) should succeed");
    }
}
