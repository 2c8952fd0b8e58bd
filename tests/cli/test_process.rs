//! Tests for the process CLI command
//!
//! Tests the process command handler:
//! - Processing into a log file or an output directory
//! - Overwrite names, recursion and --no-original
//! - Error cases (invalid input, unknown overwrite name)

use crate::cli::test_helpers::{create_cli_test_services, process_args};
use crate::common::{find_document, read_log, simple_score, TestCorpus};
use cadenza::cli::commands::process::execute;
use cadenza::cli::OutputFormat;

/// Test processing into an explicit log file
#[tokio::test]
async fn test_process_to_file_human() {
    let (services, out) = create_cli_test_services();
    let corpus = TestCorpus::symbolic();
    let log = out.path().join("folk.json");

    let result = execute(
        process_args(corpus.path(), &log, "folk"),
        &services,
        OutputFormat::Human,
    )
    .await;

    assert!(result.is_ok(), "Process should succeed: {:?}", result.err());
    assert_eq!(read_log(&log).len(), 3);
}

/// Test processing into an output directory (JSON format)
#[tokio::test]
async fn test_process_to_directory_json() {
    let (services, out) = create_cli_test_services();
    let corpus = TestCorpus::symbolic();

    let result = execute(
        process_args(corpus.path(), out.path(), "folk"),
        &services,
        OutputFormat::Json,
    )
    .await;

    assert!(result.is_ok(), "Process (JSON) should succeed: {:?}", result.err());
    assert_eq!(read_log(&out.path().join("results.json")).len(), 3);
}

/// Test rerunning with an overwrite name
#[tokio::test]
async fn test_process_rerun_with_overwrite() {
    let (services, out) = create_cli_test_services();
    let corpus = TestCorpus::symbolic();

    execute(process_args(corpus.path(), out.path(), "folk"), &services, OutputFormat::Json)
        .await
        .unwrap();

    let mut args = process_args(corpus.path(), out.path(), "folk-v2");
    args.overwrite = vec!["tempo".to_string(), "metadata".to_string()];
    let result = execute(args, &services, OutputFormat::Human).await;

    assert!(result.is_ok(), "Rerun should succeed: {:?}", result.err());
    for doc in read_log(&out.path().join("results.json")) {
        assert_eq!(doc["corpus_id"], "folk-v2");
    }
    assert!(out.path().join("results.json.backup.json").exists());
}

/// Test --recursive and --no-original
#[tokio::test]
async fn test_process_recursive_without_original() {
    let (services, out) = create_cli_test_services();
    let mut corpus = TestCorpus::new();
    corpus.add_score("top.musicxml", &simple_score("Top"));
    corpus.add_score("sub/deep.musicxml", &simple_score("Deep"));

    let mut args = process_args(corpus.path(), out.path(), "folk");
    args.recursive = true;
    args.no_original = true;
    args.workers = Some(1);
    execute(args, &services, OutputFormat::Json).await.unwrap();

    let lines = read_log(&out.path().join("results.json"));
    assert_eq!(lines.len(), 2);
    assert!(find_document(&lines, "deep.musicxml").get("original_file").is_none());
}

/// Test error for nonexistent input directory
#[tokio::test]
async fn test_process_invalid_input() {
    let (services, out) = create_cli_test_services();

    let result = execute(
        process_args(&out.path().join("missing"), out.path(), "folk"),
        &services,
        OutputFormat::Human,
    )
    .await;

    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Invalid input path"));
}

/// Test error for an unknown overwrite name
#[tokio::test]
async fn test_process_unknown_overwrite() {
    let (services, out) = create_cli_test_services();
    let corpus = TestCorpus::symbolic();

    let mut args = process_args(corpus.path(), out.path(), "folk");
    args.overwrite = vec!["no_such_bucket".to_string()];
    let result = execute(args, &services, OutputFormat::Human).await;

    assert!(result.is_err());
    assert!(!out.path().join("results.json").exists());
}

/// Test error for zero workers
#[tokio::test]
async fn test_process_zero_workers() {
    let (services, out) = create_cli_test_services();
    let corpus = TestCorpus::symbolic();

    let mut args = process_args(corpus.path(), out.path(), "folk");
    args.workers = Some(0);
    let result = execute(args, &services, OutputFormat::Human).await;

    assert!(result.is_err());
}

/// Test error for a metadata CSV without the join column
#[tokio::test]
async fn test_process_bad_metadata_csv() {
    let (services, out) = create_cli_test_services();
    let corpus = TestCorpus::symbolic();
    let csv = out.path().join("meta.csv");
    std::fs::write(&csv, "name,title\na.musicxml,Alpha\n").unwrap();

    let mut args = process_args(corpus.path(), out.path(), "folk");
    args.metadata = Some(csv);
    let result = execute(args, &services, OutputFormat::Human).await;

    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("filename"));
}
