//! Job data model and lifecycle management.
//!
//! A [`Job`] is one unit of work: an id, a shell command, and the metadata
//! the queue needs to schedule, retry, and dead-letter it. State transitions
//! are owned by [`JobManager`]; the store never decides policy.

pub mod backoff;
pub mod manager;

#[cfg(test)]
mod tests;

pub use manager::{JobManager, QueueStatus};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle state of a job.
///
/// `Failed` is reserved for a future terminal non-retriable outcome; no
/// transition currently produces it. Retriable failures go back to `Pending`
/// and exhausted ones to `Dead`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
    Dead,
}

impl JobState {
    /// All states, in display order.
    pub const ALL: [JobState; 5] = [
        JobState::Pending,
        JobState::Processing,
        JobState::Completed,
        JobState::Failed,
        JobState::Dead,
    ];

    /// Stable lowercase name, as persisted in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Dead => "dead",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized state names.
#[derive(Debug, Error)]
#[error("invalid job state: {0}")]
pub struct InvalidStateName(pub String);

impl FromStr for JobState {
    type Err = InvalidStateName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobState::Pending),
            "processing" => Ok(JobState::Processing),
            "completed" => Ok(JobState::Completed),
            "failed" => Ok(JobState::Failed),
            "dead" => Ok(JobState::Dead),
            other => Err(InvalidStateName(other.to_string())),
        }
    }
}

/// A persisted job record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Client-supplied primary key, unique within the store.
    pub id: String,
    /// Shell command line executed by a worker.
    pub command: String,
    pub state: JobState,
    /// Count of completed execution attempts.
    pub attempts: u32,
    /// Total attempts allowed before the job is dead-lettered.
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Earliest time the job is eligible to run; absent means immediately.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Diagnostic from the most recent failure.
    pub error_message: Option<String>,
    /// Identity of the worker currently holding the claim.
    pub lock_id: Option<String>,
}

/// Client-submitted enqueue payload.
///
/// `scheduled_at` is accepted as canonical timestamp text and validated by
/// the manager. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct EnqueueRequest {
    pub id: String,
    pub command: String,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub scheduled_at: Option<String>,
}
