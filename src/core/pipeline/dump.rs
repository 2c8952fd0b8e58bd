//! Reader for store dump snapshots.
//!
//! A snapshot is NDJSON of `{"_id": ..., "_source": {...}}` records as
//! exported from the corpus store. Records whose `_source` embeds the
//! original MusicXML can be reprocessed without the source files.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::core::error::{CadenzaError, Result};

/// One reprocessable record of a dump snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct DumpRecord {
    /// Store identifier, when present
    pub id: Option<String>,
    pub filename: String,
    pub corpus_id: Option<String>,
    pub metadata: Map<String, Value>,
    pub original_file: String,
}

#[derive(Deserialize)]
struct RawRecord {
    #[serde(rename = "_id")]
    id: Option<Value>,
    #[serde(rename = "_source")]
    source: Map<String, Value>,
}

/// Read a dump snapshot
///
/// # Arguments
///
/// * `path` - Snapshot file
/// * `corpus_filter` - Keep only records of this corpus
///
/// # Returns
///
/// The records in file order. Malformed lines and records lacking
/// `original_file` or `filename` are skipped with a warning.
pub fn read(path: &Path, corpus_filter: Option<&str>) -> Result<Vec<DumpRecord>> {
    let file = fs::File::open(path).map_err(|e| {
        CadenzaError::InvalidPath(format!("Cannot open dump {}: {e}", path.display()))
    })?;
    let records = read_from(BufReader::new(file), path, corpus_filter)?;
    tracing::info!("Read {} records from dump {}", records.len(), path.display());
    Ok(records)
}

/// Read records from any line source
pub fn read_from(
    reader: impl BufRead,
    source: &Path,
    corpus_filter: Option<&str>,
) -> Result<Vec<DumpRecord>> {
    let mut records = Vec::new();

    for (number, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        let number = number + 1;

        let Ok(text) = std::str::from_utf8(&line) else {
            tracing::warn!("{}:{}: skipping line that is not UTF-8", source.display(), number);
            continue;
        };
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        let raw: RawRecord = match serde_json::from_str(text) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("{}:{}: skipping malformed record: {}", source.display(), number, e);
                continue;
            }
        };

        let corpus_id = raw
            .source
            .get("corpus_id")
            .and_then(Value::as_str)
            .map(str::to_string);

        if let Some(filter) = corpus_filter {
            if corpus_id.as_deref() != Some(filter) {
                continue;
            }
        }

        let filename = raw.source.get("filename").and_then(Value::as_str);
        let original = raw.source.get("original_file").and_then(Value::as_str);
        let (Some(filename), Some(original)) = (filename, original) else {
            tracing::warn!(
                "{}:{}: skipping record without original_file or filename",
                source.display(),
                number
            );
            continue;
        };

        let metadata = raw
            .source
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        records.push(DumpRecord {
            id: raw.id.map(|id| match id {
                Value::String(s) => s,
                other => other.to_string(),
            }),
            filename: filename.to_string(),
            corpus_id,
            metadata,
            original_file: original.to_string(),
        });
    }

    Ok(records)
}
