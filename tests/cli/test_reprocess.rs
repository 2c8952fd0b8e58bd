//! Tests for the reprocess-dump CLI command

use crate::cli::test_helpers::create_cli_test_services;
use crate::common::{read_log, simple_score};
use cadenza::cli::commands::reprocess::{execute, ReprocessArgs};
use cadenza::cli::OutputFormat;
use serde_json::json;
use std::path::{Path, PathBuf};

fn write_dump(dir: &Path) -> PathBuf {
    let lines = [
        json!({"_id": "a", "_source": {
            "corpus_id": "old", "filename": "a.musicxml", "original_file": simple_score("A")
        }}),
        json!({"_id": "b", "_source": {"corpus_id": "old", "filename": "b.musicxml"}}),
    ];
    let path = dir.join("dump.ndjson");
    let text: String = lines.iter().map(|l| l.to_string() + "\n").collect();
    std::fs::write(&path, text + "not a record\n").unwrap();
    path
}

fn args(dump: PathBuf, output: &Path) -> ReprocessArgs {
    ReprocessArgs {
        dump,
        output: output.to_path_buf(),
        corpus_id: Some("new".to_string()),
        corpus_filter: None,
        metadata: None,
        workers: None,
    }
}

/// Test reprocessing a dump (human format)
#[tokio::test]
async fn test_reprocess_human() {
    let (services, out) = create_cli_test_services();
    let dump = write_dump(out.path());

    let result = execute(args(dump, out.path()), &services, OutputFormat::Human).await;
    assert!(result.is_ok(), "Reprocess should succeed: {:?}", result.err());

    let lines = read_log(&out.path().join("results.json"));
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["corpus_id"], "new");
}

/// Test reprocessing a dump (JSON format)
#[tokio::test]
async fn test_reprocess_json() {
    let (services, out) = create_cli_test_services();
    let dump = write_dump(out.path());

    let result = execute(args(dump, out.path()), &services, OutputFormat::Json).await;
    assert!(result.is_ok(), "Reprocess (JSON) should succeed: {:?}", result.err());
}

/// Test error for an empty corpus id
#[tokio::test]
async fn test_reprocess_empty_corpus_id() {
    let (services, out) = create_cli_test_services();
    let dump = write_dump(out.path());

    let mut args = args(dump, out.path());
    args.corpus_id = Some(" ".to_string());
    let result = execute(args, &services, OutputFormat::Human).await;

    assert!(result.is_err());
    assert!(!out.path().join("results.json").exists());
}

/// Test error for a missing dump file
#[tokio::test]
async fn test_reprocess_missing_dump() {
    let (services, out) = create_cli_test_services();

    let result = execute(
        args(out.path().join("missing.ndjson"), out.path()),
        &services,
        OutputFormat::Human,
    )
    .await;

    assert!(result.is_err());
}
