//! External metadata lookup.
//!
//! A metadata source maps an input file to a flat map of descriptive
//! fields (title, performer, archive URL, ...). The CSV-backed source
//! is loaded once per run and matched by file stem, so a row for
//! `song.musicxml` also matches `song.xml`.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::core::error::{CadenzaError, Result};

/// Column layout of a metadata source, for schema generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataColumns {
    pub columns: Vec<String>,
    /// Column holding the file name; not indexed
    pub join_column: String,
}

impl MetadataColumns {
    /// Columns that end up in the schema (all but the join column)
    pub fn indexed(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .map(String::as_str)
            .filter(move |c| *c != self.join_column)
    }
}

/// Source of per-file metadata
pub trait MetadataSource: Send + Sync {
    /// Metadata for a file; empty when nothing matches
    fn lookup(&self, file: &Path) -> Map<String, Value>;

    /// Column layout, if the source has a fixed one
    fn columns(&self) -> Option<MetadataColumns>;
}

/// Source that never matches
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

impl MetadataSource for NoMetadata {
    fn lookup(&self, _file: &Path) -> Map<String, Value> {
        Map::new()
    }

    fn columns(&self) -> Option<MetadataColumns> {
        None
    }
}

/// Metadata table loaded from a CSV file
#[derive(Debug, Clone)]
pub struct CsvMetadataSource {
    headers: Vec<String>,
    join_column: String,
    rows: Vec<Map<String, Value>>,
    /// File stem -> index of the first row naming it
    by_stem: HashMap<String, usize>,
}

impl CsvMetadataSource {
    /// Load a CSV file
    ///
    /// # Arguments
    ///
    /// * `path` - CSV file with a header row
    /// * `join_column` - Header of the column holding file names
    ///
    /// # Returns
    ///
    /// The loaded source, or `MetadataSource` error when the header
    /// lacks the join column
    pub fn from_path(path: &Path, join_column: &str) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            CadenzaError::MetadataSource(format!(
                "Failed to read metadata file {}: {e}",
                path.display()
            ))
        })?;
        let source = Self::from_text(&text, join_column)?;
        tracing::info!(
            "Loaded {} metadata rows from {}",
            source.rows.len(),
            path.display()
        );
        Ok(source)
    }

    /// Parse CSV text
    pub fn from_text(text: &str, join_column: &str) -> Result<Self> {
        let text = text.trim_start_matches('\u{feff}');
        let delimiter = detect_delimiter(text);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let Some(join_index) = headers.iter().position(|h| h == join_column) else {
            return Err(CadenzaError::MetadataSource(format!(
                "Metadata CSV has no '{join_column}' column (found: {})",
                headers.join(", ")
            )));
        };

        let mut rows = Vec::new();
        let mut by_stem = HashMap::new();

        for record in reader.records() {
            let record = record?;
            let mut row = Map::new();
            for (header, value) in headers.iter().zip(record.iter()) {
                row.insert(header.clone(), Value::String(value.to_string()));
            }

            if let Some(stem) = record.get(join_index).and_then(file_stem) {
                // First matching row wins
                by_stem.entry(stem).or_insert(rows.len());
            }
            rows.push(row);
        }

        Ok(Self {
            headers,
            join_column: join_column.to_string(),
            rows,
            by_stem,
        })
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl MetadataSource for CsvMetadataSource {
    fn lookup(&self, file: &Path) -> Map<String, Value> {
        file.to_str()
            .and_then(file_stem)
            .and_then(|stem| self.by_stem.get(&stem))
            .and_then(|i| self.rows.get(*i))
            .cloned()
            .unwrap_or_default()
    }

    fn columns(&self) -> Option<MetadataColumns> {
        Some(MetadataColumns {
            columns: self.headers.clone(),
            join_column: self.join_column.clone(),
        })
    }
}

/// `,` when the header line contains one, else `;`
fn detect_delimiter(text: &str) -> u8 {
    let first_line = text.lines().next().unwrap_or_default();
    if first_line.contains(',') || !first_line.contains(';') {
        b','
    } else {
        b';'
    }
}

fn file_stem(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}
