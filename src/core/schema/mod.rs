//! Search schema generation and merging.
//!
//! The schema is derived from the processor registry alone, so it
//! always covers every field a document of that domain can carry.

pub mod generator;
pub mod merge;

pub use generator::{generate, SchemaDescription};
pub use merge::merge_schema;

use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::core::error::{CadenzaError, Result};

/// Read a schema file as raw JSON
pub fn read_schema_file(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).map_err(|e| {
        CadenzaError::InvalidPath(format!("Cannot read schema file {}: {e}", path.display()))
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// Write a schema as pretty-printed JSON
pub fn write_schema_file(path: &Path, schema: &SchemaDescription) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut text = serde_json::to_string_pretty(schema)?;
    text.push('\n');
    fs::write(path, text)?;
    Ok(())
}

/// Merge a generated schema into an existing schema file's content
///
/// # Returns
///
/// The merged schema; the existing file must have a top-level
/// `properties` object
pub fn merge_into_existing(existing: Value, generated: &SchemaDescription) -> Result<SchemaDescription> {
    // Validate shape before merging
    let existing = SchemaDescription::from_value(existing)?;
    SchemaDescription::from_value(merge_schema(existing.to_value(), generated.to_value()))
}
