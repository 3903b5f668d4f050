//! MySQL/MariaDB bulk-load sink for lookup-bench.
//!
//! The relational child-table variant: each batch becomes one batched
//! execution against the `lookup` parent table plus one against the
//! `lookup_identifier` child table, with list-valued identifiers flattened
//! to one row per scalar value. Any failure is a hard error to the
//! pipeline.

pub mod args;
pub mod error;
pub mod insert;
pub mod sink;

pub use args::MySQLArgs;
pub use error::MySQLSinkError;
pub use sink::MySQLSink;
