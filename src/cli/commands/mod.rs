//! CLI command implementations
//!
//! Each command module handles argument parsing and execution for a specific CLI command.

pub mod completions;
pub mod config;
pub mod process;
pub mod processors;
pub mod reprocess;
pub mod schema;

// Re-export argument types for use in mod.rs
pub use completions::CompletionsArgs;
pub use config::ConfigArgs;
pub use process::ProcessArgs;
pub use processors::ProcessorsArgs;
pub use reprocess::ReprocessArgs;
pub use schema::SchemaArgs;

use tokio_util::sync::CancellationToken;

/// Cancel `token` on the first Ctrl-C
///
/// Files already dispatched finish; no further file is started.
pub(crate) fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight files");
            token.cancel();
        }
    });
}
