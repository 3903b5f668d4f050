//! Concurrent bulk-load pipeline for lookup-bench.
//!
//! One producer task generates `Lookup` records and batches them into a
//! bounded channel; a pool of loader tasks drains the channel and hands each
//! batch to a [`BackendSink`]. The channel capacity bounds how far the
//! producer can run ahead, so peak memory is `capacity × bulk_size` records
//! regardless of the total dataset size.
//!
//! ```text
//!                  ┌────────────┐   put (blocks when full)
//!  LookupGenerator │  producer  │ ─────────────┐
//!                  └────────────┘              ▼
//!                                     bounded batch channel
//!                                              │ poll(timeout)
//!                  ┌────────────┐◄─────────────┤
//!                  │  loader-0  │──► sink      │
//!                  │  loader-N  │──► sink ◄────┘
//!                  └────────────┘
//!                        │ fetch-add
//!                        ▼
//!                 progress counter
//! ```

pub mod args;
pub mod channel;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod sink;

pub use args::CommonBenchArgs;
pub use config::PipelineConfig;
pub use error::PipelineError;
pub use metrics::{ReadResult, RunReport, RunResult};
pub use pipeline::Pipeline;
pub use sink::{BackendSink, Batch, RetryPolicy, SinkError, TransientPolicy};
