//! MongoDB bulk-load sink for lookup-bench.
//!
//! Submits each batch as one unordered `insertMany`. Transient socket
//! timeouts re-attempt the whole batch per the configured policy (unbounded
//! by default); bulk-write conflicts are logged and the batch is dropped
//! without failing the run.

pub mod args;
pub mod error;
pub mod insert;
pub mod sink;

pub use args::MongoDBArgs;
pub use error::MongoDBSinkError;
pub use sink::MongoDBSink;
