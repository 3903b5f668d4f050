//! Pipeline configuration.

use crate::error::PipelineError;
use std::time::Duration;

/// Configuration for one bulk-load run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Total number of records to generate and load.
    pub target_record_count: u64,
    /// Maximum records per batch.
    pub bulk_size: usize,
    /// Number of loader tasks draining the channel.
    pub worker_count: usize,
    /// Channel capacity in batches; bounds how far the producer runs ahead.
    pub channel_capacity: usize,
    /// RNG seed for the record generator.
    pub seed: u64,
    /// How long a loader waits on the channel before re-checking state.
    pub poll_timeout: Duration,
    /// Bounded wait for the loader pool after the producer finishes;
    /// exceeding it is fatal.
    pub shutdown_grace: Duration,
}

impl PipelineConfig {
    /// Create a configuration with the given load parameters and the
    /// default channel capacity, seed, and timings.
    pub fn new(target_record_count: u64, bulk_size: usize, worker_count: usize) -> Self {
        Self {
            target_record_count,
            bulk_size,
            worker_count,
            channel_capacity: 4,
            seed: 42,
            poll_timeout: Duration::from_secs(1),
            shutdown_grace: Duration::from_secs(30),
        }
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Validate the configuration.
    pub(crate) fn validate(&self) -> Result<(), PipelineError> {
        if self.target_record_count == 0 {
            return Err(PipelineError::Config(
                "target record count must be greater than zero".to_string(),
            ));
        }
        if self.bulk_size == 0 {
            return Err(PipelineError::Config(
                "bulk size must be greater than zero".to_string(),
            ));
        }
        if self.worker_count == 0 {
            return Err(PipelineError::Config(
                "worker count must be greater than zero".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(PipelineError::Config(
                "channel capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
