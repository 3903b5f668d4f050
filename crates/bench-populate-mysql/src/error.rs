//! Error types for the MySQL sink.

use thiserror::Error;

/// Errors that can occur setting up or maintaining the MySQL sink.
#[derive(Error, Debug)]
pub enum MySQLSinkError {
    /// MySQL connection or query error.
    #[error("MySQL error: {0}")]
    MySQL(#[from] mysql_async::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A point read found no matching row or a mismatched one.
    #[error("read verification failed: expected CHECK_ID {expected}, found {found:?}")]
    ReadMismatch {
        expected: i64,
        found: Option<String>,
    },
}
