//! Tests for the generate-schema CLI command

use crate::cli::test_helpers::create_cli_test_services;
use crate::common::write_metadata_csv;
use cadenza::cli::commands::schema::{build_schema, execute, SchemaArgs};
use cadenza::cli::OutputFormat;
use cadenza::Domain;
use serde_json::json;

fn args(domain: Domain) -> SchemaArgs {
    SchemaArgs {
        domain,
        metadata: None,
        merge_into: None,
        output: None,
    }
}

/// Test printing the schema to stdout
#[tokio::test]
async fn test_schema_to_stdout() {
    let (services, _out) = create_cli_test_services();

    let result = execute(args(Domain::Audio), &services, OutputFormat::Human).await;
    assert!(result.is_ok(), "Schema should succeed: {:?}", result.err());
}

/// Test writing the schema with metadata columns to a file
#[tokio::test]
async fn test_schema_to_file_with_metadata() {
    let (services, out) = create_cli_test_services();
    let csv = write_metadata_csv(out.path(), &[("a.musicxml", "Alpha", "Ana")]);
    let path = out.path().join("symbolic.json");

    let mut args = args(Domain::Symbolic);
    args.metadata = Some(csv);
    args.output = Some(path.clone());
    let result = execute(args, &services, OutputFormat::Json).await;
    assert!(result.is_ok(), "Schema file should succeed: {:?}", result.err());

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        written["properties"]["metadata"]["properties"]["title"]["type"],
        "keyword"
    );
    assert_eq!(written["properties"]["corpus_id"], json!({"type": "keyword"}));
}

/// Test merging into an existing schema file
#[tokio::test]
async fn test_schema_merge_into_existing() {
    let (services, out) = create_cli_test_services();
    let existing = out.path().join("existing.json");
    std::fs::write(
        &existing,
        json!({"properties": {"legacy": {"type": "text"}}}).to_string(),
    )
    .unwrap();

    let mut args = args(Domain::Symbolic);
    args.merge_into = Some(existing);
    let schema = build_schema(&args, &services).unwrap();

    assert_eq!(schema.properties["legacy"], json!({"type": "text"}));
    assert!(schema.properties.contains_key("ngram_rhythm"));
}

/// Test error for an existing schema without properties
#[tokio::test]
async fn test_schema_merge_into_invalid() {
    let (services, out) = create_cli_test_services();
    let existing = out.path().join("existing.json");
    std::fs::write(&existing, "[1, 2, 3]").unwrap();

    let mut args = args(Domain::Audio);
    args.merge_into = Some(existing);

    assert!(build_schema(&args, &services).is_err());
}
