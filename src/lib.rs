//! cadenza - Incremental Feature Extraction for Music Corpora
//!
//! Extracts structured features from MusicXML scores and audio
//! recordings and writes one JSON document per input file to an
//! NDJSON output log that feeds a searchable corpus store.
//!
//! # Architecture
//!
//! The codebase is organized into two main modules:
//!
//! - **core**: Domain logic (interface-agnostic)
//!   - config, error, types, xdg
//!   - hasher, input (MusicXML, audio)
//!   - registry, processors (feature extractors)
//!   - pipeline (walker, merger, output log, driver, dump reader)
//!   - schema, metadata, store
//!   - services (unified service container)
//!
//! - **cli**: Command-line adapter (depends on core)
//!   - commands, output formatting
//!
//! # Key Features
//!
//! - Content-hash identity: unchanged files are never recomputed
//! - Per-bucket overwrite: recompute only the features you ask for
//! - Schema generated from the same registry that produces documents
//! - Crash-safe output log (backup, run marker, whole-line writes)
//! - Bounded parallelism with per-file timeouts

// Core domain logic (interface-agnostic)
pub mod core;

// Command-line adapter
pub mod cli;

// Re-export commonly used types for convenience
pub use core::config::Config;
pub use core::error::{CadenzaError, Result};
pub use core::registry::{FeatureProcessor, ProcessorRegistry};
pub use core::services::Services;
pub use core::types::*;
