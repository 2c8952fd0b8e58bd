//! Corpus store boundary.
//!
//! The pipeline never talks to the search engine itself. An
//! [`Uploader`] is handed in explicitly, and [`upload_log`] replays a
//! finished output log through it. The log stays the durable record
//! whatever the upload outcome.

use async_trait::async_trait;
use serde::Serialize;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::core::error::{CadenzaError, Result};
use crate::core::schema::SchemaDescription;
use crate::core::types::Document;

/// Idempotent sink for documents, keyed by content hash
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Create the index mapping or extend an existing one
    async fn ensure_schema(&self, schema: &SchemaDescription) -> Result<()>;

    /// Insert or replace the document stored under `id`
    async fn upsert(&self, id: &str, document: &Document) -> Result<()>;
}

/// Outcome of replaying a log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadStats {
    pub uploaded: usize,
    pub failed: usize,
    /// Lines that did not parse as documents
    pub skipped: usize,
}

/// Replay an output log into the store
///
/// # Arguments
///
/// * `path` - Output log to replay
/// * `schema` - Mapping applied before the first document
/// * `uploader` - Store handle
///
/// # Returns
///
/// Per-document counts. A schema failure aborts the replay; a failed
/// upsert is counted and the replay continues.
pub async fn upload_log(
    path: &Path,
    schema: &SchemaDescription,
    uploader: &dyn Uploader,
) -> Result<UploadStats> {
    let file = fs::File::open(path).map_err(|e| {
        CadenzaError::InvalidPath(format!("Cannot open output log {}: {e}", path.display()))
    })?;

    // Step 1: Schema before any document
    uploader.ensure_schema(schema).await?;

    // Step 2: Documents, one upsert each
    let mut stats = UploadStats::default();
    for (number, line) in BufReader::new(file).split(b'\n').enumerate() {
        let line = line?;
        let number = number + 1;

        let Ok(text) = std::str::from_utf8(&line) else {
            tracing::warn!("{}:{}: skipping line that is not UTF-8", path.display(), number);
            stats.skipped += 1;
            continue;
        };
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        let document: Document = match serde_json::from_str(text) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!("{}:{}: skipping malformed line: {}", path.display(), number, e);
                stats.skipped += 1;
                continue;
            }
        };

        match uploader.upsert(&document.content_hash, &document).await {
            Ok(()) => stats.uploaded += 1,
            Err(e) => {
                tracing::error!("Failed to upload {}: {}", document.filename, e);
                stats.failed += 1;
            }
        }
    }

    tracing::info!(
        "Upload complete: {} uploaded, {} failed, {} skipped",
        stats.uploaded,
        stats.failed,
        stats.skipped
    );
    Ok(stats)
}
