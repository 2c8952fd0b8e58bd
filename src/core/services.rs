//! Unified service container for cadenza
//!
//! Provides shared access to the configuration, the processor
//! registry and the pipeline driver.

use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::metadata::{CsvMetadataSource, MetadataSource, NoMetadata};
use crate::core::pipeline::PipelineDriver;
use crate::core::registry::ProcessorRegistry;
use std::path::Path;
use std::sync::Arc;

/// Unified services container
///
/// All CLI commands use this same struct for service access.
#[derive(Clone)]
pub struct Services {
    /// Application configuration
    pub config: Arc<Config>,

    /// Catalog of feature processors
    pub registry: Arc<ProcessorRegistry>,
}

impl Services {
    /// Create services from configuration with the builtin processors
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(ProcessorRegistry::builtin()?),
        })
    }

    /// Same registry, different configuration (per-command overrides)
    pub fn with_config(&self, config: Config) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::clone(&self.registry),
        }
    }

    /// Load the metadata source for a run
    ///
    /// Pipelines are created per-request since the metadata CSV varies.
    pub fn metadata_source(&self, csv: Option<&Path>) -> Result<Arc<dyn MetadataSource>> {
        match csv {
            Some(path) => Ok(Arc::new(CsvMetadataSource::from_path(
                path,
                &self.config.metadata.join_column,
            )?)),
            None => Ok(Arc::new(NoMetadata)),
        }
    }

    /// Create a pipeline driver for one run
    pub fn create_driver(&self, metadata: Arc<dyn MetadataSource>) -> PipelineDriver {
        PipelineDriver::new(
            Arc::clone(&self.config),
            Arc::clone(&self.registry),
            metadata,
        )
    }
}
