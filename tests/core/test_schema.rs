//! Schema generation from the processor registry

use crate::common::write_metadata_csv;
use cadenza::core::metadata::{CsvMetadataSource, MetadataSource};
use cadenza::core::registry::ProcessorRegistry;
use cadenza::core::schema::{self, generate};
use cadenza::Domain;
use serde_json::json;
use tempfile::TempDir;

#[test]
fn test_schema_covers_every_processor() {
    let registry = ProcessorRegistry::builtin().unwrap();

    for domain in Domain::ALL {
        let schema = generate(domain, &registry, None).unwrap();

        for descriptor in registry.descriptors_for(domain) {
            let entry = &schema.properties[&descriptor.feature_name]["properties"]
                [&descriptor.algorithm_name];
            assert_eq!(
                entry,
                &descriptor.schema_fragment.to_mapping(),
                "{domain} schema entry for {}/{}",
                descriptor.feature_name,
                descriptor.algorithm_name
            );
        }
    }
}

#[test]
fn test_schema_domains_differ() {
    let registry = ProcessorRegistry::builtin().unwrap();
    let symbolic = generate(Domain::Symbolic, &registry, None).unwrap();
    let audio = generate(Domain::Audio, &registry, None).unwrap();

    assert!(symbolic.properties.contains_key("tempo"));
    assert!(!symbolic.properties.contains_key("loudness"));
    assert!(audio.properties.contains_key("loudness"));
    assert!(!audio.properties.contains_key("tempo"));
}

#[test]
fn test_schema_maps_metadata_columns() {
    let dir = TempDir::new().unwrap();
    let csv = write_metadata_csv(dir.path(), &[("a.musicxml", "Alpha", "Ana")]);
    let source = CsvMetadataSource::from_path(&csv, "filename").unwrap();
    let registry = ProcessorRegistry::builtin().unwrap();

    let schema = generate(Domain::Symbolic, &registry, source.columns().as_ref()).unwrap();
    let metadata = &schema.properties["metadata"]["properties"];

    assert!(metadata.get("filename").is_none());
    assert_eq!(metadata["title"]["type"], "keyword");
    assert_eq!(metadata["performer"]["fields"]["text"]["type"], "text");
}

#[test]
fn test_schema_file_round_trip_and_merge() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("schemas").join("symbolic.json");
    let registry = ProcessorRegistry::builtin().unwrap();
    let generated = generate(Domain::Symbolic, &registry, None).unwrap();

    schema::write_schema_file(&path, &generated).unwrap();
    assert_eq!(schema::read_schema_file(&path).unwrap(), generated.to_value());

    let existing = json!({
        "properties": {
            "legacy": {"type": "keyword"},
            "tempo": {"properties": {"old_algorithm": {"type": "long"}}},
        }
    });
    let merged = schema::merge_into_existing(existing, &generated).unwrap();

    assert_eq!(merged.properties["legacy"], json!({"type": "keyword"}));
    assert_eq!(
        merged.properties["tempo"]["properties"]["old_algorithm"],
        json!({"type": "long"})
    );
    assert_eq!(
        merged.properties["tempo"]["properties"]["metronome_mark"],
        json!({"type": "long"})
    );
}
