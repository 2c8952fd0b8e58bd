//! Configuration management for the cadenza pipeline.
//!
//! This module handles loading configuration from TOML files and
//! environment variables, with sensible defaults for all settings.

use crate::core::error::{CadenzaError, Result};
use crate::core::xdg::XdgDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Number of files processed concurrently
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Per-file processing timeout in seconds
    #[serde(default = "default_file_timeout")]
    pub file_timeout_sec: u64,

    /// Descend into subdirectories of the input directory
    #[serde(default)]
    pub recursive: bool,

    /// Embed the MusicXML source in symbolic documents
    #[serde(default = "default_include_original")]
    pub include_original: bool,

    /// Extensions treated as symbolic music (without the dot)
    #[serde(default = "default_symbolic_extensions")]
    pub symbolic_extensions: Vec<String>,

    /// Extensions treated as audio (without the dot)
    #[serde(default = "default_audio_extensions")]
    pub audio_extensions: Vec<String>,

    /// Second-to-last filename components marking separation stems
    #[serde(default = "default_stem_suffixes")]
    pub stem_suffixes: Vec<String>,

    /// Audio files longer than this are rejected
    #[serde(default = "default_max_audio_duration")]
    pub max_audio_duration_sec: u64,
}

/// Output log configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Log file name used when only an output directory is given
    #[serde(default = "default_log_file_name")]
    pub log_file_name: String,

    /// Suffix appended to the log path for the pre-run backup
    #[serde(default = "default_backup_suffix")]
    pub backup_suffix: String,

    /// Suffix appended to the log path for the in-progress marker
    #[serde(default = "default_marker_suffix")]
    pub marker_suffix: String,
}

/// Metadata source configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetadataConfig {
    /// CSV column holding the file name to match against
    #[serde(default = "default_join_column")]
    pub join_column: String,
}

// Default value functions
fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8))
        .unwrap_or(1)
}

fn default_file_timeout() -> u64 {
    600
}

fn default_include_original() -> bool {
    true
}

fn default_symbolic_extensions() -> Vec<String> {
    vec!["xml".to_string(), "musicxml".to_string()]
}

fn default_audio_extensions() -> Vec<String> {
    vec![
        "wav".to_string(),
        "flac".to_string(),
        "ogg".to_string(),
        "mp3".to_string(),
    ]
}

fn default_stem_suffixes() -> Vec<String> {
    vec!["vocals".to_string(), "accompaniment".to_string()]
}

fn default_max_audio_duration() -> u64 {
    600
}

fn default_log_file_name() -> String {
    "results.json".to_string()
}

fn default_backup_suffix() -> String {
    ".backup.json".to_string()
}

fn default_marker_suffix() -> String {
    ".run.json".to_string()
}

fn default_join_column() -> String {
    "filename".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            file_timeout_sec: default_file_timeout(),
            recursive: false,
            include_original: default_include_original(),
            symbolic_extensions: default_symbolic_extensions(),
            audio_extensions: default_audio_extensions(),
            stem_suffixes: default_stem_suffixes(),
            max_audio_duration_sec: default_max_audio_duration(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_file_name: default_log_file_name(),
            backup_suffix: default_backup_suffix(),
            marker_suffix: default_marker_suffix(),
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            join_column: default_join_column(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| CadenzaError::ConfigError(format!("Failed to read config file: {e}")))?;

        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load config with priority: env vars > TOML > defaults
    ///
    /// This method uses XDG Base Directory specification for file locations.
    pub fn load() -> Result<Self> {
        let xdg = XdgDirs::new();
        Self::load_with_xdg(&xdg)
    }

    /// Load config with explicit XDG directories
    ///
    /// Priority order:
    /// 1. CADENZA_CONFIG env var
    /// 2. XDG config file (~/.config/cadenza/config.toml)
    /// 3. ./cadenza.toml in the working directory
    /// 4. Defaults
    pub fn load_with_xdg(xdg: &XdgDirs) -> Result<Self> {
        let mut config = if let Ok(config_path) = env::var("CADENZA_CONFIG") {
            Self::from_file(config_path)?
        } else {
            let xdg_config = xdg.config_file();
            if xdg_config.exists() {
                Self::from_file(xdg_config)?
            } else if Path::new("cadenza.toml").exists() {
                Self::from_file("cadenza.toml")?
            } else {
                Self::default()
            }
        };

        // Override with environment variables
        config.merge_env();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Merge configuration with environment variables
    pub fn merge_env(&mut self) {
        if let Ok(workers) = env::var("CADENZA_WORKERS") {
            if let Ok(w) = workers.parse() {
                self.pipeline.workers = w;
            }
        }
        if let Ok(timeout) = env::var("CADENZA_FILE_TIMEOUT_SEC") {
            if let Ok(t) = timeout.parse() {
                self.pipeline.file_timeout_sec = t;
            }
        }
        if let Ok(max_duration) = env::var("CADENZA_MAX_AUDIO_DURATION_SEC") {
            if let Ok(d) = max_duration.parse() {
                self.pipeline.max_audio_duration_sec = d;
            }
        }
        if let Ok(name) = env::var("CADENZA_LOG_FILE_NAME") {
            if !name.is_empty() {
                self.output.log_file_name = name;
            }
        }
        if let Ok(column) = env::var("CADENZA_JOIN_COLUMN") {
            if !column.is_empty() {
                self.metadata.join_column = column;
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.workers == 0 {
            return Err(CadenzaError::ConfigError(
                "Workers must be non-zero".to_string(),
            ));
        }

        if self.pipeline.file_timeout_sec == 0 {
            return Err(CadenzaError::ConfigError(
                "File timeout must be non-zero".to_string(),
            ));
        }

        if self.pipeline.symbolic_extensions.is_empty()
            && self.pipeline.audio_extensions.is_empty()
        {
            return Err(CadenzaError::ConfigError(
                "At least one symbolic or audio extension is required".to_string(),
            ));
        }

        if self
            .pipeline
            .symbolic_extensions
            .iter()
            .chain(&self.pipeline.audio_extensions)
            .any(|ext| ext.is_empty() || ext.starts_with('.'))
        {
            return Err(CadenzaError::ConfigError(
                "Extensions must be non-empty and given without a leading dot".to_string(),
            ));
        }

        if self.output.log_file_name.is_empty() {
            return Err(CadenzaError::ConfigError(
                "Log file name must be non-empty".to_string(),
            ));
        }

        if self.output.backup_suffix.is_empty() || self.output.marker_suffix.is_empty() {
            return Err(CadenzaError::ConfigError(
                "Backup and marker suffixes must be non-empty".to_string(),
            ));
        }

        if self.output.backup_suffix == self.output.marker_suffix {
            return Err(CadenzaError::ConfigError(
                "Backup and marker suffixes must differ".to_string(),
            ));
        }

        if self.metadata.join_column.is_empty() {
            return Err(CadenzaError::ConfigError(
                "Metadata join column must be non-empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Log configuration
    pub fn log_config(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Workers: {}", self.pipeline.workers);
        tracing::info!("  File timeout: {}s", self.pipeline.file_timeout_sec);
        tracing::info!("  Recursive: {}", self.pipeline.recursive);
        tracing::info!("  Include original: {}", self.pipeline.include_original);
        tracing::info!(
            "  Symbolic extensions: {:?}",
            self.pipeline.symbolic_extensions
        );
        tracing::info!("  Audio extensions: {:?}", self.pipeline.audio_extensions);
        tracing::info!("  Stem suffixes: {:?}", self.pipeline.stem_suffixes);
        tracing::info!(
            "  Max audio duration: {}s",
            self.pipeline.max_audio_duration_sec
        );
        tracing::info!("  Log file name: {}", self.output.log_file_name);
        tracing::info!("  Metadata join column: {}", self.metadata.join_column);
    }
}
