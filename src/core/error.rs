//! Error types and error handling for the cadenza pipeline.
//!
//! This module defines the error types used throughout the
//! application. Errors fall into three groups that the driver
//! treats differently:
//!
//! - configuration errors stop a run before any file is touched
//! - per-file errors drop one document and the batch continues
//! - transport errors (IO, serialization) bubble up unchanged

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cadenza operations
pub type Result<T> = std::result::Result<T, CadenzaError>;

/// Main error type for the cadenza pipeline
#[derive(Error, Debug)]
pub enum CadenzaError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Processor registry conflict: {0}")]
    RegistryConflict(String),

    #[error("Metadata source error: {0}")]
    MetadataSource(String),

    #[error("File type not supported: {0}")]
    UnsupportedFile(PathBuf),

    #[error("Failed to parse {path}: {message}")]
    ParseFailed { path: PathBuf, message: String },

    #[error("Processor '{processor}' requires {dependency}, which does not exist")]
    MissingDependency {
        processor: String,
        dependency: PathBuf,
    },

    #[error("{path} is too long ({duration_sec:.1}s). Must be at most {limit_sec}s")]
    AudioTooLong {
        path: PathBuf,
        duration_sec: f64,
        limit_sec: u64,
    },

    #[error("Processor '{processor}' failed: {message}")]
    ProcessorFailed { processor: String, message: String },

    #[error("Processing {0} timed out after {1}s")]
    Timeout(PathBuf, u64),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl CadenzaError {
    /// Get user-friendly error message
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Check if this error must abort a run before any processing
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            CadenzaError::ConfigError(_)
                | CadenzaError::InvalidPath(_)
                | CadenzaError::RegistryConflict(_)
                | CadenzaError::MetadataSource(_)
        )
    }

    /// Check if this error is confined to a single input file
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            CadenzaError::UnsupportedFile(_)
                | CadenzaError::ParseFailed { .. }
                | CadenzaError::MissingDependency { .. }
                | CadenzaError::AudioTooLong { .. }
                | CadenzaError::ProcessorFailed { .. }
                | CadenzaError::Timeout(..)
        )
    }

    /// Shorthand for a processor failure
    pub fn processor(processor: impl Into<String>, message: impl Into<String>) -> Self {
        CadenzaError::ProcessorFailed {
            processor: processor.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a parse failure
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        CadenzaError::ParseFailed {
            path: path.into(),
            message: message.into(),
        }
    }
}
