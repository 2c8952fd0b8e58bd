//! Tests for output formatting helpers

use cadenza::cli::output::{format_duration, mapping_kind};
use serde_json::json;

#[test]
fn test_format_duration_ranges() {
    assert_eq!(format_duration(0.25), "250ms");
    assert_eq!(format_duration(2.5), "2.50s");
    assert_eq!(format_duration(125.0), "2m 5.0s");
}

#[test]
fn test_mapping_kind_variants() {
    assert_eq!(mapping_kind(&json!({"type": "long"})), "long");
    assert_eq!(mapping_kind(&json!({"enabled": false})), "stored only");
    assert_eq!(
        mapping_kind(&json!({"properties": {"a": {}, "b": {}}})),
        "object (2 fields)"
    );
}
