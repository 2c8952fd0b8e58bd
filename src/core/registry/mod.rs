//! Processor registry.
//!
//! The registry is the single catalog of feature extractors. Schema
//! generation, the CLI listing and the per-file driver all enumerate
//! processors through it, so adding a processor here keeps the search
//! schema and the emitted documents in lockstep.
//!
//! Every processor owns exactly one leaf key, addressed as
//! `<feature_name>.<algorithm_name>`. Several algorithms may share a
//! feature bucket.

pub mod schema;

pub use schema::FieldSchema;

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

use crate::core::error::{CadenzaError, Result};
use crate::core::input::ParsedInput;
use crate::core::processors;
use crate::core::types::{Domain, OverwriteSet};

/// Trait for feature extractors
///
/// Implementations are stateless: the names and schema fragment are
/// readable without any input, which is all schema generation needs.
pub trait FeatureProcessor: Send + Sync {
    /// Domain whose inputs this processor accepts
    fn domain(&self) -> Domain;

    /// Bucket the result is stored under (e.g. `"key"`)
    fn feature_name(&self) -> &str;

    /// Leaf key inside the bucket (e.g. `"pitch_profile"`)
    fn algorithm_name(&self) -> &str;

    /// Shape of the result for the search schema
    fn schema_fragment(&self) -> FieldSchema;

    /// Compute the result for one parsed input
    fn run(&self, input: &ParsedInput) -> Result<Value>;

    /// `feature/algorithm`, used in logs and errors
    fn qualified_name(&self) -> String {
        format!("{}/{}", self.feature_name(), self.algorithm_name())
    }
}

/// Static description of a registered processor
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorDescriptor {
    pub domain: Domain,
    pub feature_name: String,
    pub algorithm_name: String,
    pub schema_fragment: FieldSchema,
}

/// Serializable view of a descriptor for CLI listings
#[derive(Debug, Clone, Serialize)]
pub struct ProcessorSummary {
    pub domain: Domain,
    pub feature_name: String,
    pub algorithm_name: String,
    pub mapping: Value,
}

impl From<&ProcessorDescriptor> for ProcessorSummary {
    fn from(d: &ProcessorDescriptor) -> Self {
        Self {
            domain: d.domain,
            feature_name: d.feature_name.clone(),
            algorithm_name: d.algorithm_name.clone(),
            mapping: d.schema_fragment.to_mapping(),
        }
    }
}

/// Ordered catalog of feature processors per domain
pub struct ProcessorRegistry {
    symbolic: Vec<Arc<dyn FeatureProcessor>>,
    audio: Vec<Arc<dyn FeatureProcessor>>,
}

impl ProcessorRegistry {
    /// Names no processor may use as its feature name
    pub const RESERVED_NAMES: [&'static str; 7] = [
        "corpus_id",
        "filename",
        "content_hash",
        "file_hash_sha256",
        OverwriteSet::METADATA,
        "original_file",
        OverwriteSet::ALL,
    ];

    /// Build a registry, validating names and uniqueness
    ///
    /// # Arguments
    ///
    /// * `processors` - Processors in registration order
    ///
    /// # Returns
    ///
    /// The registry, or `RegistryConflict` when a feature name is
    /// reserved or empty, or a `(domain, feature, algorithm)` triple
    /// is registered twice
    pub fn new(processors: Vec<Arc<dyn FeatureProcessor>>) -> Result<Self> {
        let mut seen: HashSet<(Domain, String, String)> = HashSet::new();
        let mut registry = Self {
            symbolic: Vec::new(),
            audio: Vec::new(),
        };

        for processor in processors {
            let feature = processor.feature_name();
            let algorithm = processor.algorithm_name();

            if feature.is_empty() || algorithm.is_empty() {
                return Err(CadenzaError::RegistryConflict(format!(
                    "processor '{}' has an empty feature or algorithm name",
                    processor.qualified_name()
                )));
            }

            if Self::RESERVED_NAMES.contains(&feature) {
                return Err(CadenzaError::RegistryConflict(format!(
                    "feature name '{feature}' is reserved"
                )));
            }

            let key = (
                processor.domain(),
                feature.to_string(),
                algorithm.to_string(),
            );
            if !seen.insert(key) {
                return Err(CadenzaError::RegistryConflict(format!(
                    "{} is registered twice for the {} domain",
                    processor.qualified_name(),
                    processor.domain()
                )));
            }

            match processor.domain() {
                Domain::Symbolic => registry.symbolic.push(processor),
                Domain::Audio => registry.audio.push(processor),
            }
        }

        Ok(registry)
    }

    /// Registry holding the builtin symbolic and audio processors
    pub fn builtin() -> Result<Self> {
        Self::new(processors::builtin())
    }

    /// Processors of a domain in registration order
    pub fn processors_for(&self, domain: Domain) -> &[Arc<dyn FeatureProcessor>] {
        match domain {
            Domain::Symbolic => &self.symbolic,
            Domain::Audio => &self.audio,
        }
    }

    /// Static descriptors of a domain's processors
    pub fn descriptors_for(&self, domain: Domain) -> Vec<ProcessorDescriptor> {
        self.processors_for(domain)
            .iter()
            .map(|p| ProcessorDescriptor {
                domain,
                feature_name: p.feature_name().to_string(),
                algorithm_name: p.algorithm_name().to_string(),
                schema_fragment: p.schema_fragment(),
            })
            .collect()
    }

    /// Distinct feature names of a domain, in first-registration order
    pub fn feature_names(&self, domain: Domain) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for processor in self.processors_for(domain) {
            let name = processor.feature_name();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Check whether any domain registers this feature name
    pub fn is_known_feature(&self, name: &str) -> bool {
        self.symbolic
            .iter()
            .chain(self.audio.iter())
            .any(|p| p.feature_name() == name)
    }

    /// Reject overwrite names that match no feature and are not `metadata`
    pub fn validate_overwrite(&self, overwrite: &OverwriteSet) -> Result<()> {
        if let OverwriteSet::Only(names) = overwrite {
            let unknown: Vec<&str> = names
                .iter()
                .map(String::as_str)
                .filter(|n| *n != OverwriteSet::METADATA && !self.is_known_feature(n))
                .collect();

            if !unknown.is_empty() {
                return Err(CadenzaError::ConfigError(format!(
                    "Unknown overwrite feature(s): {}. Run 'cadenza list-processors' to see valid names",
                    unknown.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Total number of registered processors
    pub fn len(&self) -> usize {
        self.symbolic.len() + self.audio.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
