//! PostgreSQL bulk-load sink for lookup-bench.
//!
//! Each batch becomes one multi-row `INSERT` into the `lookup` table, with
//! the identifier map serialized into a single JSONB column. Any failure of
//! the batched execution is a hard error to the pipeline; there is no
//! partial-success path for this backend.

pub mod args;
pub mod error;
pub mod insert;
pub mod sink;

pub use args::PostgreSQLArgs;
pub use error::PostgreSQLSinkError;
pub use sink::PostgreSQLSink;
