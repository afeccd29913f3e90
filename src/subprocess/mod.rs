//! Subprocess abstraction for job execution.
//!
//! Jobs are shell command lines, so execution always goes through `sh -c`;
//! pipes and globs in submitted commands are expected to work. Submissions
//! are operator-controlled, which is the trust model that makes shell
//! execution acceptable.
//!
//! The layer is trait-based so the worker loop can be tested without
//! spawning real processes: [`ProcessRunner`] is the seam,
//! [`TokioProcessRunner`] the production implementation, and
//! [`MockProcessRunner`] the scripted test double.

pub mod builder;
pub mod error;
pub mod mock;
pub mod runner;


pub use builder::ProcessCommandBuilder;
pub use error::ProcessError;
pub use mock::MockProcessRunner;
pub use runner::{ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner, TokioProcessRunner};

use std::sync::Arc;

/// Factory for the process runner used by a worker.
#[derive(Clone)]
pub struct SubprocessManager {
    runner: Arc<dyn ProcessRunner>,
}

impl SubprocessManager {
    /// Create a manager with a custom runner (dependency injection).
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    /// Production manager backed by the tokio process runner.
    pub fn production() -> Self {
        Self::new(Arc::new(TokioProcessRunner))
    }

    /// Mock manager for tests, returning the mock for scripting outcomes.
    #[cfg(test)]
    pub fn mock() -> (Self, MockProcessRunner) {
        let mock = MockProcessRunner::new();
        let runner = Arc::new(mock.clone()) as Arc<dyn ProcessRunner>;
        (Self::new(runner), mock)
    }

    /// The underlying process runner.
    pub fn runner(&self) -> Arc<dyn ProcessRunner> {
        Arc::clone(&self.runner)
    }
}
