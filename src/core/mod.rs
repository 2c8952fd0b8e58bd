//! Core domain logic (interface-agnostic)
//!
//! This module contains everything the CLI drives: input parsing,
//! feature processors, the incremental pipeline and schema generation.
//!
//! # Architecture
//!
//! - **config**: Configuration loading (TOML + environment)
//! - **error**: Error types and Result alias
//! - **types**: Documents, domains, overwrite sets, run statistics
//! - **xdg**: XDG directory handling
//! - **hasher**: Content identity (SHA-256)
//! - **input**: MusicXML parsing and audio decoding
//! - **registry**: Processor trait and catalog
//! - **processors**: Builtin symbolic and audio processors
//! - **metadata**: External per-file metadata (CSV)
//! - **schema**: Search schema generation and merging
//! - **pipeline**: Enumeration, merging, output log, driver
//! - **store**: Uploader boundary to the corpus store
//! - **services**: Unified service container

pub mod config;
pub mod error;
pub mod hasher;
pub mod input;
pub mod metadata;
pub mod pipeline;
pub mod processors;
pub mod registry;
pub mod schema;
pub mod services;
pub mod store;
pub mod types;
pub mod xdg;

// Re-export key types for convenience
pub use config::Config;
pub use error::{CadenzaError, Result};
pub use services::Services;
