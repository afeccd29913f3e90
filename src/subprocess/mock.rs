//! Scripted process runner for worker tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::error::ProcessError;
use super::runner::{ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner};

/// Test double that replays queued outcomes instead of spawning processes.
///
/// Outcomes are consumed in FIFO order; with the queue empty every run
/// reports success. Each invocation is recorded for assertions.
#[derive(Clone, Default)]
pub struct MockProcessRunner {
    outcomes: Arc<Mutex<VecDeque<ExitStatus>>>,
    calls: Arc<Mutex<Vec<ProcessCommand>>>,
}

impl MockProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome for the next run.
    pub fn push_outcome(&self, status: ExitStatus) {
        self.outcomes.lock().unwrap().push_back(status);
    }

    /// Commands observed so far.
    pub fn calls(&self) -> Vec<ProcessCommand> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for MockProcessRunner {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        self.calls.lock().unwrap().push(command);
        let status = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ExitStatus::Success);
        Ok(ProcessOutput {
            status,
            duration: Duration::from_millis(1),
        })
    }
}
