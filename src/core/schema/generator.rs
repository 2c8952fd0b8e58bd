//! Search schema generation from the processor registry.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::error::{CadenzaError, Result};
use crate::core::metadata::MetadataColumns;
use crate::core::registry::{FieldSchema, ProcessorRegistry};
use crate::core::types::{Domain, OverwriteSet};

/// Field mapping for one domain's documents
///
/// Serializes as `{"properties": {...}}`, the shape the corpus store
/// expects for an index mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescription {
    pub properties: Map<String, Value>,
}

impl SchemaDescription {
    /// JSON value of the whole description
    pub fn to_value(&self) -> Value {
        let mut root = Map::new();
        root.insert(
            "properties".to_string(),
            Value::Object(self.properties.clone()),
        );
        Value::Object(root)
    }

    /// Build from a JSON value; it must carry a top-level `properties` object
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(mut root) => match root.remove("properties") {
                Some(Value::Object(properties)) => Ok(Self { properties }),
                _ => Err(CadenzaError::ConfigError(
                    "Schema has no top-level 'properties' object".to_string(),
                )),
            },
            _ => Err(CadenzaError::ConfigError(
                "Schema must be a JSON object".to_string(),
            )),
        }
    }
}

/// Generate the schema for a domain
///
/// Reads only the static descriptor of each processor; no input is
/// parsed.
///
/// # Arguments
///
/// * `domain` - Domain whose processors contribute buckets
/// * `registry` - Processor catalog
/// * `metadata` - Column layout of the metadata source, if any
///
/// # Returns
///
/// The schema, or `RegistryConflict` when two processors of a bucket
/// share an algorithm name
pub fn generate(
    domain: Domain,
    registry: &ProcessorRegistry,
    metadata: Option<&MetadataColumns>,
) -> Result<SchemaDescription> {
    let mut properties = Map::new();

    // Step 1: Fixed document fields
    properties.insert("content_hash".to_string(), FieldSchema::Disabled.to_mapping());
    properties.insert("filename".to_string(), FieldSchema::Disabled.to_mapping());
    properties.insert("original_file".to_string(), FieldSchema::Disabled.to_mapping());
    properties.insert("corpus_id".to_string(), FieldSchema::Keyword.to_mapping());

    // Step 2: One bucket per distinct feature name, in registry order
    let mut buckets: Vec<(String, Map<String, Value>)> = Vec::new();
    for descriptor in registry.descriptors_for(domain) {
        let index = match buckets
            .iter()
            .position(|(name, _)| *name == descriptor.feature_name)
        {
            Some(index) => index,
            None => {
                buckets.push((descriptor.feature_name.clone(), Map::new()));
                buckets.len() - 1
            }
        };

        let bucket = &mut buckets[index].1;
        if bucket.contains_key(&descriptor.algorithm_name) {
            return Err(CadenzaError::RegistryConflict(format!(
                "algorithm '{}' appears twice in bucket '{}'",
                descriptor.algorithm_name, descriptor.feature_name
            )));
        }
        bucket.insert(
            descriptor.algorithm_name.clone(),
            descriptor.schema_fragment.to_mapping(),
        );
    }

    for (name, algorithms) in buckets {
        let mut bucket = Map::new();
        bucket.insert("properties".to_string(), Value::Object(algorithms));
        properties.insert(name, Value::Object(bucket));
    }

    // Step 3: Metadata columns, or a dynamic object when unknown
    let metadata_mapping = match metadata {
        Some(columns) => {
            FieldSchema::object(columns.indexed().map(|c| (c, FieldSchema::KeywordWithText)))
                .to_mapping()
        }
        None => FieldSchema::DynamicObject.to_mapping(),
    };
    properties.insert(OverwriteSet::METADATA.to_string(), metadata_mapping);

    tracing::debug!(
        "Generated {} schema with {} top-level fields",
        domain,
        properties.len()
    );

    Ok(SchemaDescription { properties })
}
