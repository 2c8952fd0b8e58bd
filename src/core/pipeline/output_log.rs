//! Output log handling: prior-output index, backup, run marker and the
//! line writer.
//!
//! The output log is NDJSON, one document per line. Before a run
//! truncates it, the previous content is copied to a backup and a run
//! marker is written next to it. The marker is removed when the run
//! completes; finding it at startup means the previous run was
//! interrupted, in which case the backup is kept and the partial log
//! is overlaid on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::core::config::OutputConfig;
use crate::core::error::{CadenzaError, Result};
use crate::core::types::{Document, OverwriteSet};

/// Prior documents keyed by content hash
///
/// Built once before any worker starts and read-only afterwards.
#[derive(Debug, Default)]
pub struct ExistingOutputIndex {
    documents: HashMap<String, Document>,
}

impl ExistingOutputIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a log file; a missing file yields an empty index
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let file = fs::File::open(path)?;
        let index = Self::from_reader(BufReader::new(file), path)?;
        tracing::info!(
            "Loaded {} prior documents from {}",
            index.len(),
            path.display()
        );
        Ok(index)
    }

    /// Build from NDJSON lines
    ///
    /// Malformed lines and lines without a content hash are skipped
    /// with a warning. A later line wins over an earlier one with the
    /// same hash.
    pub fn from_reader(reader: impl BufRead, source: &Path) -> Result<Self> {
        let mut index = Self::new();

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

            let value: Value = match serde_json::from_str(text) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!("{}:{}: skipping malformed line: {}", source.display(), number, e);
                    continue;
                }
            };

            if !has_content_hash(&value) {
                tracing::warn!(
                    "{}:{}: skipping document without a content hash",
                    source.display(),
                    number
                );
                continue;
            }

            match serde_json::from_value::<Document>(value) {
                Ok(document) => index.insert(document),
                Err(e) => {
                    tracing::warn!("{}:{}: skipping invalid document: {}", source.display(), number, e);
                }
            }
        }

        Ok(index)
    }

    pub fn insert(&mut self, document: Document) {
        self.documents.insert(document.content_hash.clone(), document);
    }

    /// Add every document of `other`, replacing same-hash entries
    pub fn overlay(&mut self, other: ExistingOutputIndex) {
        self.documents.extend(other.documents);
    }

    pub fn get(&self, content_hash: &str) -> Option<&Document> {
        self.documents.get(content_hash)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn has_content_hash(value: &Value) -> bool {
    ["content_hash", "file_hash_sha256"].iter().any(|key| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(|h| !h.is_empty())
            .unwrap_or(false)
    })
}

/// Written next to the log while a run is in progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMarker {
    pub corpus_id: String,
    pub overwrite: Vec<String>,
    pub started_at: DateTime<Utc>,
}

impl RunMarker {
    pub fn new(corpus_id: &str, overwrite: &OverwriteSet) -> Self {
        Self {
            corpus_id: corpus_id.to_string(),
            overwrite: overwrite.names(),
            started_at: Utc::now(),
        }
    }
}

/// Result of preparing the output log for a run
#[derive(Debug)]
pub struct PreparedLog {
    pub index: ExistingOutputIndex,

    /// Whether an interrupted run was detected
    pub resumed: bool,
}

/// Paths of the output log and its companions
#[derive(Debug, Clone)]
pub struct OutputLog {
    pub path: PathBuf,
    pub backup_path: PathBuf,
    pub marker_path: PathBuf,
}

impl OutputLog {
    /// Companion paths for a log file
    pub fn new(path: impl Into<PathBuf>, config: &OutputConfig) -> Self {
        let path = path.into();
        let backup_path = with_suffix(&path, &config.backup_suffix);
        let marker_path = with_suffix(&path, &config.marker_suffix);
        Self {
            path,
            backup_path,
            marker_path,
        }
    }

    /// Log path for an output argument: a directory gets the configured
    /// log file name appended
    pub fn resolve(output: &Path, config: &OutputConfig) -> PathBuf {
        if output.is_dir() {
            output.join(&config.log_file_name)
        } else {
            output.to_path_buf()
        }
    }

    /// Back up, load and truncate the log before a run
    ///
    /// # Arguments
    ///
    /// * `marker` - Marker describing the run about to start
    ///
    /// # Returns
    ///
    /// The prior-output index and whether an interrupted run was
    /// detected
    pub fn prepare(&self, marker: &RunMarker) -> Result<PreparedLog> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(CadenzaError::InvalidPath(format!(
                    "Output directory does not exist: {}",
                    parent.display()
                )));
            }
        }

        let resumed = self.marker_path.exists();

        // Step 1: Build the index and secure the prior content
        let index = if resumed {
            match self.read_marker() {
                Some(previous) => tracing::warn!(
                    "Run for corpus '{}' started at {} was interrupted, resuming",
                    previous.corpus_id,
                    previous.started_at
                ),
                None => tracing::warn!(
                    "Found unreadable run marker {}, resuming",
                    self.marker_path.display()
                ),
            }
            let mut index = ExistingOutputIndex::load(&self.backup_path)?;
            index.overlay(ExistingOutputIndex::load(&self.path)?);
            if !self.backup_path.exists() && self.path.exists() {
                fs::copy(&self.path, &self.backup_path)?;
            }
            index
        } else if self.path.exists() {
            fs::copy(&self.path, &self.backup_path)?;
            tracing::info!("Backed up {} to {}", self.path.display(), self.backup_path.display());
            ExistingOutputIndex::load(&self.path)?
        } else {
            ExistingOutputIndex::new()
        };

        // Step 2: Mark the run as in progress
        fs::write(&self.marker_path, serde_json::to_string_pretty(marker)?)?;

        // Step 3: Truncate
        fs::File::create(&self.path)?;

        Ok(PreparedLog { index, resumed })
    }

    /// Marker of an interrupted run, if any
    pub fn read_marker(&self) -> Option<RunMarker> {
        let text = fs::read_to_string(&self.marker_path).ok()?;
        serde_json::from_str(&text).ok()
    }

    /// Remove the run marker after a completed run
    pub fn finish(&self) -> Result<()> {
        if self.marker_path.exists() {
            fs::remove_file(&self.marker_path)?;
        }
        Ok(())
    }

    /// Open the (already truncated) log for appending
    pub async fn writer(&self) -> Result<LogWriter> {
        let file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await?;
        Ok(LogWriter { file, written: 0 })
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Appends whole document lines to the output log
pub struct LogWriter {
    file: tokio::fs::File,
    written: usize,
}

impl LogWriter {
    /// Append one document as a single line and flush
    pub async fn append(&mut self, document: &Document) -> Result<()> {
        let mut line = document.to_line()?;
        line.push('\n');
        self.file.write_all(line.as_bytes()).await?;
        self.file.flush().await?;
        self.written += 1;
        Ok(())
    }

    /// Lines written so far
    pub fn written(&self) -> usize {
        self.written
    }
}
