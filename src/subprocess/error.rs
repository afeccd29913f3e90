//! Subprocess error types.
//!
//! These never reach the control surface: the worker folds them into the
//! job's `error_message` and the retry path takes over.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("failed to spawn process: {0}")]
    Spawn(std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
