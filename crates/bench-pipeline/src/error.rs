//! Error types for the bulk-load pipeline.

use crate::sink::SinkError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur configuring or running the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid pipeline parameters; reported immediately, never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// A loader's sink call failed fatally.
    #[error("sink failure after {inserted} records inserted: {source}")]
    Sink {
        inserted: u64,
        #[source]
        source: SinkError,
    },

    /// The loader pool failed to terminate within the grace period.
    #[error("loader pool did not terminate within {grace:?}; still running: {workers:?}")]
    StuckWorkers {
        grace: Duration,
        workers: Vec<String>,
    },

    /// A pipeline task panicked or was cancelled.
    #[error("pipeline task failed: {0}")]
    Join(String),

    /// The check-id snapshot was requested before a completed run.
    #[error("pipeline has not completed a run")]
    NotCompleted,

    /// `run` was called again after the pipeline already ran.
    #[error("pipeline has already executed its run")]
    AlreadyRan,
}
