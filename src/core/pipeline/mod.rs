//! Incremental feature pipeline.
//!
//! Turns a directory of inputs (or a dump snapshot) into an NDJSON
//! output log. Key features:
//!
//! - content-hash identity, so renamed files keep their prior results
//! - per-bucket recomputation driven by the overwrite set
//! - backup and resume of the output log
//! - bounded parallelism with per-file timeouts and failure isolation

pub mod driver;
pub mod dump;
pub mod merger;
pub mod output_log;
pub mod walker;

pub use driver::{DumpOptions, PipelineDriver, RunOptions};
pub use dump::DumpRecord;
pub use merger::{FreshResult, IncrementalMerger, MergePlan};
pub use output_log::{ExistingOutputIndex, OutputLog, RunMarker};
pub use walker::{FileWalker, InputFile};
