//! Core data types for the cadenza pipeline.
//!
//! This module defines the data structures shared by the registry,
//! the merger and the driver: input domains, output documents,
//! overwrite directives and run statistics.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Input domain a file (and a processor) belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Symbolic music (MusicXML)
    Symbolic,
    /// Recorded audio
    Audio,
}

impl Domain {
    pub const ALL: [Domain; 2] = [Domain::Symbolic, Domain::Audio];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Symbolic => "symbolic",
            Domain::Audio => "audio",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "symbolic" | "musicxml" => Ok(Domain::Symbolic),
            "audio" => Ok(Domain::Audio),
            other => Err(format!(
                "Invalid domain '{other}'. Must be 'symbolic' (or 'musicxml') or 'audio'"
            )),
        }
    }
}

/// One output document, serialized as a single line of the output log
///
/// Feature buckets are flattened into the top level of the JSON
/// object, so a result lives at `<feature_name>.<algorithm_name>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Corpus the document belongs to in the current run
    #[serde(default)]
    pub corpus_id: String,

    /// Basename of the source file
    #[serde(default)]
    pub filename: String,

    /// SHA-256 of the raw source bytes (identity across runs)
    #[serde(alias = "file_hash_sha256")]
    pub content_hash: String,

    /// Values from the external metadata source
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// Feature buckets: feature_name -> algorithm_name -> result
    #[serde(flatten)]
    pub features: Map<String, Value>,

    /// Raw MusicXML text, symbolic inputs only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_file: Option<String>,
}

impl Document {
    /// Serialize to a single log line (without the trailing newline)
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Get one algorithm result inside a bucket
    pub fn feature(&self, feature_name: &str, algorithm_name: &str) -> Option<&Value> {
        self.features
            .get(feature_name)
            .and_then(|bucket| bucket.get(algorithm_name))
    }
}

/// Which feature buckets a run recomputes for files it has seen before
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OverwriteSet {
    /// Recompute everything and ignore prior output
    All,
    /// Recompute only the named buckets (empty = keep everything)
    Only(BTreeSet<String>),
    #[default]
    None,
}

impl OverwriteSet {
    /// Sentinel name selecting [`OverwriteSet::All`]
    pub const ALL: &'static str = "all";

    /// Special name requesting a metadata refresh
    pub const METADATA: &'static str = "metadata";

    /// Build from user-supplied names; `"all"` anywhere wins
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            if name == Self::ALL {
                return OverwriteSet::All;
            }
            set.insert(name.to_string());
        }

        if set.is_empty() {
            OverwriteSet::None
        } else {
            OverwriteSet::Only(set)
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, OverwriteSet::All)
    }

    /// Check whether a bucket (or `metadata`) is requested
    pub fn contains(&self, name: &str) -> bool {
        match self {
            OverwriteSet::All => true,
            OverwriteSet::Only(set) => set.contains(name),
            OverwriteSet::None => false,
        }
    }

    /// Names as given, `["all"]` for the sentinel
    pub fn names(&self) -> Vec<String> {
        match self {
            OverwriteSet::All => vec![Self::ALL.to_string()],
            OverwriteSet::Only(set) => set.iter().cloned().collect(),
            OverwriteSet::None => Vec::new(),
        }
    }
}

/// How a single file ended up in the output log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOutcome {
    /// No prior document: every processor ran
    New,
    /// Prior document found and merged with recomputed buckets
    Merged,
}

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Candidate inputs found (files or dump records)
    pub files_found: usize,

    /// Inputs processed without a prior document
    pub files_new: usize,

    /// Inputs merged with a prior document
    pub files_merged: usize,

    /// Inputs dropped because of a per-file error
    pub files_failed: usize,

    /// Inputs never dispatched because the run was cancelled
    pub files_skipped: usize,

    /// Lines appended to the output log
    pub documents_written: usize,

    /// Run duration in milliseconds
    pub duration_ms: u64,

    /// Whether the run stopped early on a cancellation signal
    pub cancelled: bool,

    /// Whether the run resumed after an interrupted one
    pub resumed: bool,
}
