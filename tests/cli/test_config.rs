//! Tests for the show-config CLI command

use crate::cli::test_helpers::create_cli_test_services;
use cadenza::cli::commands::config::{execute, ConfigArgs};
use cadenza::cli::OutputFormat;

/// Test show-config (human format)
#[tokio::test]
async fn test_show_config_human() {
    let (services, _out) = create_cli_test_services();

    let result = execute(ConfigArgs {}, &services, OutputFormat::Human).await;
    assert!(result.is_ok(), "Show config should succeed: {:?}", result.err());
}

/// Test show-config (JSON format)
#[tokio::test]
async fn test_show_config_json() {
    let (services, _out) = create_cli_test_services();

    let result = execute(ConfigArgs {}, &services, OutputFormat::Json).await;
    assert!(result.is_ok(), "Show config (JSON) should succeed: {:?}", result.err());
}
