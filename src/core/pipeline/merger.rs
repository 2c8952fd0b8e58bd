//! Incremental merge of fresh results into prior documents.
//!
//! Given the prior document for a content hash (if any) and the
//! overwrite set of the run, the merger decides which feature buckets
//! must be computed and combines the fresh buckets with the preserved
//! ones. Buckets are replaced whole; the merger never reaches inside a
//! bucket.
//!
//! Per-file states:
//!
//! - no prior document: every bucket is computed, nothing is merged
//! - prior document, overwrite `all`: every bucket is computed and the
//!   prior document is ignored
//! - prior document, partial overwrite: only requested or missing
//!   buckets are computed and merged over the prior document

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::core::registry::ProcessorRegistry;
use crate::core::types::{Document, Domain, FileOutcome, OverwriteSet};

/// What has to be computed for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePlan {
    pub outcome: FileOutcome,

    /// Feature buckets to compute, in registry order
    pub buckets: Vec<String>,

    /// Whether metadata must be looked up
    pub compute_metadata: bool,
}

impl MergePlan {
    /// Check whether a bucket is scheduled
    pub fn computes(&self, feature_name: &str) -> bool {
        self.buckets.iter().any(|b| b == feature_name)
    }

    /// Check whether no processor has to run
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Freshly computed parts of a document
#[derive(Debug, Clone, Default)]
pub struct FreshResult {
    pub filename: String,
    pub content_hash: String,

    /// Computed buckets only
    pub features: Map<String, Value>,

    /// `None` when the plan did not ask for metadata
    pub metadata: Option<Map<String, Value>>,

    /// `None` when inclusion was not requested or not applicable
    pub original_file: Option<String>,
}

/// Decides recomputation and merges per the run's overwrite set
pub struct IncrementalMerger {
    registry: Arc<ProcessorRegistry>,
    overwrite: OverwriteSet,
}

impl IncrementalMerger {
    pub fn new(registry: Arc<ProcessorRegistry>, overwrite: OverwriteSet) -> Self {
        Self {
            registry,
            overwrite,
        }
    }

    pub fn overwrite(&self) -> &OverwriteSet {
        &self.overwrite
    }

    /// Prior document to merge with, `None` when the run overwrites all
    pub fn effective_existing<'a>(&self, existing: Option<&'a Document>) -> Option<&'a Document> {
        if self.overwrite.is_all() {
            None
        } else {
            existing
        }
    }

    /// Decide which buckets to compute for one file
    ///
    /// # Arguments
    ///
    /// * `domain` - Domain of the file
    /// * `existing` - Prior document with the same content hash
    ///
    /// # Returns
    ///
    /// The plan; every registered bucket for new files and for an
    /// `all` overwrite, otherwise the requested buckets plus those the
    /// prior document lacks
    pub fn plan(&self, domain: Domain, existing: Option<&Document>) -> MergePlan {
        let features = self.registry.feature_names(domain);

        let Some(existing) = self.effective_existing(existing) else {
            return MergePlan {
                outcome: FileOutcome::New,
                buckets: features.into_iter().map(str::to_string).collect(),
                compute_metadata: true,
            };
        };

        let buckets = features
            .into_iter()
            .filter(|name| self.overwrite.contains(name) || !existing.features.contains_key(*name))
            .map(str::to_string)
            .collect();

        MergePlan {
            outcome: FileOutcome::Merged,
            buckets,
            compute_metadata: self.overwrite.contains(OverwriteSet::METADATA)
                || existing.metadata.is_empty(),
        }
    }

    /// Combine fresh results with the prior document
    ///
    /// # Arguments
    ///
    /// * `fresh` - Results computed according to [`Self::plan`]
    /// * `existing` - Prior document with the same content hash
    /// * `corpus_id` - Corpus of the current run
    ///
    /// # Returns
    ///
    /// The document to emit. `corpus_id` is always the current run's.
    pub fn merge(&self, fresh: FreshResult, existing: Option<&Document>, corpus_id: &str) -> Document {
        let Some(existing) = self.effective_existing(existing) else {
            return Document {
                corpus_id: corpus_id.to_string(),
                filename: fresh.filename,
                content_hash: fresh.content_hash,
                metadata: fresh.metadata.unwrap_or_default(),
                features: fresh.features,
                original_file: fresh.original_file,
            };
        };

        let mut document = existing.clone();
        document.corpus_id = corpus_id.to_string();
        document.filename = fresh.filename;
        document.content_hash = fresh.content_hash;

        // Replaced buckets keep their position; new ones are appended
        for (name, bucket) in fresh.features {
            document.features.insert(name, bucket);
        }

        if let Some(metadata) = fresh.metadata {
            document.metadata = metadata;
        }

        if fresh.original_file.is_some() {
            document.original_file = fresh.original_file;
        }

        document
    }
}
