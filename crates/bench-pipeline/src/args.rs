//! Common CLI argument definitions shared by all backends.

use crate::config::PipelineConfig;
use clap::Args;
use std::time::Duration;

/// Arguments common to every `populate` backend subcommand.
#[derive(Args, Clone, Debug)]
pub struct CommonBenchArgs {
    /// Number of records to generate and load
    #[arg(long, default_value = "10000")]
    pub record_count: u64,

    /// Maximum records per batch
    #[arg(long, default_value = "1000")]
    pub bulk_size: usize,

    /// Number of loader tasks
    #[arg(long, default_value = "4")]
    pub workers: usize,

    /// Channel capacity in batches
    #[arg(long, default_value = "4")]
    pub channel_capacity: usize,

    /// Random seed for record generation
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Grace period in seconds for loader-pool shutdown
    #[arg(long, default_value = "30")]
    pub shutdown_grace_secs: u64,

    /// Truncate existing data and rebuild indexes before loading
    #[arg(long)]
    pub truncate: bool,

    /// Create tables/collections before loading (relational backends)
    #[arg(long)]
    pub create_tables: bool,

    /// Number of random point reads to run after the load (0 = skip)
    #[arg(long, default_value = "0")]
    pub read_samples: u64,

    /// Emit the final report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl CommonBenchArgs {
    /// Build the pipeline configuration from these arguments.
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new(self.record_count, self.bulk_size, self.workers)
            .with_channel_capacity(self.channel_capacity)
            .with_seed(self.seed)
            .with_shutdown_grace(Duration::from_secs(self.shutdown_grace_secs))
    }
}
