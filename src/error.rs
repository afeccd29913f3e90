//! Unified error type for queue operations.
//!
//! Control-surface errors map to a single stderr line and a nonzero exit
//! code. Execution failures never appear here: they become the job's
//! `error_message` and drive the retry path instead of surfacing to the
//! client.

use crate::job::{InvalidStateName, JobState};
use crate::storage::StorageError;
use thiserror::Error;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Error, Debug)]
pub enum QueueError {
    /// Client-submitted data is malformed or missing required fields.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Enqueue collided with an existing job id.
    #[error("job already exists: {0}")]
    Duplicate(String),

    /// Operation addressed a nonexistent job.
    #[error("job not found: {0}")]
    NotFound(String),

    /// Operation is illegal in the job's current state.
    #[error("job {job_id} is {actual}, expected {expected}")]
    InvalidState {
        job_id: String,
        expected: JobState,
        actual: JobState,
    },

    /// Supervisor start attempted while recorded workers are still alive.
    #[error("workers are already running")]
    AlreadyRunning,

    /// Durable-store I/O fault.
    #[error(transparent)]
    Store(StorageError),
}

impl QueueError {
    /// Create an invalid-input error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Process exit code for this error when it reaches the CLI boundary.
    pub fn exit_code(&self) -> i32 {
        match self {
            QueueError::InvalidInput(_) => 2,
            _ => 1,
        }
    }
}

impl From<StorageError> for QueueError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Duplicate(id) => QueueError::Duplicate(id),
            other => QueueError::Store(other),
        }
    }
}

impl From<InvalidStateName> for QueueError {
    fn from(err: InvalidStateName) -> Self {
        QueueError::InvalidInput(err.to_string())
    }
}
