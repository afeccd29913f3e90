//! Lifecycle manager: state transitions, retry policy, and aggregates.

use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};
use crate::job::{backoff, EnqueueRequest, Job, JobState};
use crate::storage::{JobChanges, JobStore};
use crate::timestamps;
use std::collections::HashMap;
use tracing::{info, warn};

/// Job counts per state, zero-filled over the full enum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStatus {
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
    pub dead: i64,
}

impl QueueStatus {
    pub fn get(&self, state: JobState) -> i64 {
        match state {
            JobState::Pending => self.pending,
            JobState::Processing => self.processing,
            JobState::Completed => self.completed,
            JobState::Failed => self.failed,
            JobState::Dead => self.dead,
        }
    }

    pub fn total(&self) -> i64 {
        JobState::ALL.iter().map(|s| self.get(*s)).sum()
    }
}

/// Enforces the job state machine over the store.
///
/// All mutations of job records flow through here (or through the store's
/// claim/release primitives); nothing else decides transitions.
#[derive(Clone)]
pub struct JobManager {
    store: JobStore,
    config: QueueConfig,
}

impl JobManager {
    pub fn new(store: JobStore, config: QueueConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Validate and persist a new job in `pending`.
    pub async fn enqueue(&self, request: EnqueueRequest) -> QueueResult<Job> {
        if request.id.trim().is_empty() {
            return Err(QueueError::invalid_input("job 'id' must not be empty"));
        }
        if request.command.trim().is_empty() {
            return Err(QueueError::invalid_input("job 'command' must not be empty"));
        }

        let max_retries = request.max_retries.unwrap_or(self.config.max_retries);
        if max_retries == 0 {
            return Err(QueueError::invalid_input("'max_retries' must be positive"));
        }

        let scheduled_at = request
            .scheduled_at
            .as_deref()
            .map(timestamps::parse_canonical)
            .transpose()
            .map_err(|e| QueueError::invalid_input(format!("invalid 'scheduled_at': {e}")))?;

        let now = timestamps::now();
        let job = Job {
            id: request.id,
            command: request.command,
            state: JobState::Pending,
            attempts: 0,
            max_retries,
            created_at: now,
            updated_at: now,
            scheduled_at,
            error_message: None,
            lock_id: None,
        };

        self.store.create(&job).await?;
        info!("Job enqueued: {}", job.id);
        Ok(job)
    }

    pub async fn get(&self, id: &str) -> QueueResult<Option<Job>> {
        Ok(self.store.get(id).await?)
    }

    /// List jobs, optionally filtered by state. State validation happens at
    /// parse time ([`JobState::from_str`]); this is a passthrough.
    pub async fn list(&self, state: Option<JobState>) -> QueueResult<Vec<Job>> {
        Ok(self.store.list(state).await?)
    }

    /// Record a successful execution. Leaves `attempts` untouched.
    pub async fn mark_completed(&self, id: &str) -> QueueResult<()> {
        self.store
            .update(
                id,
                JobChanges {
                    state: Some(JobState::Completed),
                    error_message: Some(None),
                    ..Default::default()
                },
            )
            .await?;
        info!("Job completed: {id}");
        Ok(())
    }

    /// Record a failed execution and apply the retry policy.
    ///
    /// Still-retriable jobs go back to `pending` with an exponential-backoff
    /// schedule; exhausted jobs go to `dead`. A missing job is an idempotent
    /// no-op so a worker racing a delete cannot wedge its loop.
    pub async fn mark_failed(&self, id: &str, error_message: &str) -> QueueResult<()> {
        let Some(job) = self.store.get(id).await? else {
            warn!("Job not found while recording failure: {id}");
            return Ok(());
        };

        let attempts = job.attempts + 1;

        if attempts >= job.max_retries {
            self.store
                .update(
                    id,
                    JobChanges {
                        state: Some(JobState::Dead),
                        attempts: Some(attempts),
                        error_message: Some(Some(error_message.to_string())),
                        lock_id: Some(None),
                        ..Default::default()
                    },
                )
                .await?;
            warn!("Job moved to DLQ after {attempts} attempts: {id}");
        } else {
            let delay = backoff::delay_seconds(attempts, self.config.backoff_base);
            let scheduled_at =
                timestamps::now() + chrono::Duration::milliseconds((delay * 1000.0).round() as i64);

            self.store
                .update(
                    id,
                    JobChanges {
                        state: Some(JobState::Pending),
                        attempts: Some(attempts),
                        error_message: Some(Some(error_message.to_string())),
                        scheduled_at: Some(Some(scheduled_at)),
                        lock_id: Some(None),
                    },
                )
                .await?;
            info!("Job scheduled for retry #{attempts} in {delay}s: {id}");
        }

        Ok(())
    }

    /// Requeue a dead-lettered job from scratch: `pending`, zero attempts,
    /// no schedule, no diagnostic.
    pub async fn retry_from_dlq(&self, id: &str) -> QueueResult<()> {
        let job = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;

        if job.state != JobState::Dead {
            return Err(QueueError::InvalidState {
                job_id: id.to_string(),
                expected: JobState::Dead,
                actual: job.state,
            });
        }

        self.store
            .update(
                id,
                JobChanges {
                    state: Some(JobState::Pending),
                    attempts: Some(0),
                    error_message: Some(None),
                    scheduled_at: Some(None),
                    lock_id: Some(None),
                },
            )
            .await?;
        info!("Job requeued from DLQ: {id}");
        Ok(())
    }

    /// Delete a job record outright.
    pub async fn delete(&self, id: &str) -> QueueResult<()> {
        if self.store.get(id).await?.is_none() {
            return Err(QueueError::NotFound(id.to_string()));
        }
        self.store.delete(id).await?;
        info!("Job deleted: {id}");
        Ok(())
    }

    /// Aggregate job counts per state via one grouped query.
    pub async fn status(&self) -> QueueResult<QueueStatus> {
        let counts: HashMap<JobState, i64> = self.store.counts_by_state().await?;
        Ok(QueueStatus {
            pending: counts.get(&JobState::Pending).copied().unwrap_or(0),
            processing: counts.get(&JobState::Processing).copied().unwrap_or(0),
            completed: counts.get(&JobState::Completed).copied().unwrap_or(0),
            failed: counts.get(&JobState::Failed).copied().unwrap_or(0),
            dead: counts.get(&JobState::Dead).copied().unwrap_or(0),
        })
    }
}
