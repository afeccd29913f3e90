//! Error types for the job store.

use std::fmt;
use thiserror::Error;

/// Result type for store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Store error types.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Insert collided with an existing job id.
    #[error("job already exists: {0}")]
    Duplicate(String),

    /// A persisted value could not be decoded into the job model.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// I/O fault outside the database itself (paths, directories).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Store misconfiguration (bad path, missing data dir).
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl StorageError {
    /// Create a corrupt-record error.
    pub fn corrupt<E: fmt::Display>(err: E) -> Self {
        Self::Corrupt(err.to_string())
    }

    /// Create a configuration error.
    pub fn configuration<E: fmt::Display>(msg: E) -> Self {
        Self::Configuration(msg.to_string())
    }

    /// Check if this is a duplicate-id error.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}
