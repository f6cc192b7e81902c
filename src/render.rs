//! Aggregation and graph rendering.
//!
//! - [`aggregate`]: fixed-width buckets with min/max/mean of present latencies
//! - [`GraphRenderer`]: writes the static "Ping graph" HTML artifact
//!
//! Used by both the daemon (rolling window) and the one-shot `graph` command
//! (full history).

mod aggregate;
mod graph;

use thiserror::Error;

pub use aggregate::{BucketStats, aggregate};
pub use graph::{GraphRenderer, RenderSummary, Series};

/// Errors raised while rendering the graph.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Template rendering failed.
    #[error("template error: {0}")]
    Template(#[from] askama::Error),

    /// Writing the artifact failed.
    #[error("failed to write graph: {0}")]
    Io(#[from] std::io::Error),
}
