//! Error types for the MongoDB sink.

use thiserror::Error;

/// Errors that can occur setting up or maintaining the MongoDB sink.
#[derive(Error, Debug)]
pub enum MongoDBSinkError {
    /// MongoDB connection or command error.
    #[error("MongoDB error: {0}")]
    MongoDB(#[from] mongodb::error::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A point read returned a record whose CHECK_ID did not match.
    #[error("read verification failed: expected CHECK_ID {expected}, found {found:?}")]
    ReadMismatch { expected: i64, found: Option<i64> },
}
