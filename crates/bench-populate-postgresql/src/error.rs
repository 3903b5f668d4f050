//! Error types for the PostgreSQL sink.

use thiserror::Error;

/// Errors that can occur setting up or maintaining the PostgreSQL sink.
#[derive(Error, Debug)]
pub enum PostgreSQLSinkError {
    /// PostgreSQL connection or query error.
    #[error("PostgreSQL error: {0}")]
    PostgreSQL(#[from] tokio_postgres::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A point read found no matching row or a mismatched one.
    #[error("read verification failed: expected CHECK_ID {expected}, found {found:?}")]
    ReadMismatch { expected: i64, found: Option<i64> },
}
