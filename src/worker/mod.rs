//! Worker run loop.
//!
//! A worker is one OS process executing ready jobs sequentially: poll for a
//! ready job, claim it through the store's compare-and-swap, re-read the
//! claimed record, execute the command through the shell, record the
//! outcome, release the claim. Parallelism comes from running several
//! workers, never from concurrency inside one.
//!
//! Shutdown is cooperative: SIGTERM/SIGINT handlers only set an atomic
//! flag, the loop checks it each iteration, and an in-flight job runs to
//! its natural end (success, failure, or the execution timeout) before the
//! loop exits.

pub mod supervisor;


pub use supervisor::WorkerSupervisor;

use crate::config::QueueConfig;
use crate::error::QueueResult;
use crate::job::{Job, JobManager};
use crate::storage::JobStore;
use crate::subprocess::{
    ExitStatus, ProcessCommandBuilder, ProcessRunner, SubprocessManager,
};
use signal_hook::consts::{SIGINT, SIGTERM};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Hard ceiling on a single job execution.
pub const EXECUTION_TIMEOUT: Duration = Duration::from_secs(300);

/// A single worker: one claimant identity over the shared store.
pub struct Worker {
    worker_id: String,
    store: JobStore,
    manager: JobManager,
    config: QueueConfig,
    runner: Arc<dyn ProcessRunner>,
    shutdown: Arc<AtomicBool>,
    current_job_id: Option<String>,
}

impl Worker {
    pub fn new(
        worker_id: String,
        store: JobStore,
        config: QueueConfig,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self::with_runner(
            worker_id,
            store,
            config,
            shutdown,
            SubprocessManager::production().runner(),
        )
    }

    /// Construct with an injected process runner (tests).
    pub fn with_runner(
        worker_id: String,
        store: JobStore,
        config: QueueConfig,
        shutdown: Arc<AtomicBool>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        let manager = JobManager::new(store.clone(), config.clone());
        Self {
            worker_id,
            store,
            manager,
            config,
            runner,
            shutdown,
            current_job_id: None,
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Main loop. Runs until the shutdown flag is observed; store faults
    /// never escape, they are logged and the loop sleeps then continues.
    pub async fn run(&mut self) -> QueueResult<()> {
        info!("Worker {} started", self.worker_id);
        let poll_interval = Duration::from_secs_f64(self.config.worker_poll_interval);

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.poll_once().await {
                Ok(true) => {}
                Ok(false) => sleep(poll_interval).await,
                Err(e) => {
                    error!("Worker {} error: {e}", self.worker_id);
                    sleep(poll_interval).await;
                }
            }
        }

        // A claim can only still be held here if recording the outcome
        // failed mid-flight; give it back without touching state.
        if let Some(job_id) = self.current_job_id.take() {
            info!(
                "Worker {} releasing claim on job {job_id} before exit",
                self.worker_id
            );
            if let Err(e) = self.store.release(&job_id, &self.worker_id).await {
                error!("Worker {} failed to release {job_id}: {e}", self.worker_id);
            }
        }

        info!("Worker {} stopped", self.worker_id);
        Ok(())
    }

    /// One iteration: returns `true` if a job was claimed and executed,
    /// `false` if the queue was empty or the claim race was lost.
    async fn poll_once(&mut self) -> QueueResult<bool> {
        let candidates = self.store.ready(1).await?;
        let Some(candidate) = candidates.into_iter().next() else {
            return Ok(false);
        };

        if !self.store.try_claim(&candidate.id, &self.worker_id).await? {
            debug!(
                "Worker {} lost claim race for job {}",
                self.worker_id, candidate.id
            );
            return Ok(false);
        }

        // Re-read after the claim; the candidate row may be stale.
        let Some(job) = self.store.get(&candidate.id).await? else {
            warn!(
                "Worker {} claimed job {} but it vanished",
                self.worker_id, candidate.id
            );
            return Ok(true);
        };

        self.current_job_id = Some(job.id.clone());
        self.process(&job).await?;
        Ok(true)
    }

    async fn process(&mut self, job: &Job) -> QueueResult<()> {
        info!(
            "Worker {} processing job {}: {}",
            self.worker_id, job.id, job.command
        );

        match self.execute(job).await {
            Ok(()) => {
                self.manager.mark_completed(&job.id).await?;
                info!("Worker {} completed job {}", self.worker_id, job.id);
            }
            Err(message) => {
                self.manager.mark_failed(&job.id, &message).await?;
                error!(
                    "Worker {} failed job {}: {message}",
                    self.worker_id, job.id
                );
            }
        }

        self.store.release(&job.id, &self.worker_id).await?;
        self.current_job_id = None;
        Ok(())
    }

    /// Run the job's command through the shell with combined output in the
    /// per-job log file. `Err` carries the diagnostic that becomes the
    /// job's `error_message`.
    async fn execute(&self, job: &Job) -> Result<(), String> {
        let log_path = self.config.job_log_path(&job.id);
        let command = ProcessCommandBuilder::shell(&job.command)
            .timeout(EXECUTION_TIMEOUT)
            .log_path(&log_path)
            .build();

        match self.runner.run(command).await {
            Ok(output) => match output.status {
                ExitStatus::Success => Ok(()),
                ExitStatus::Error(code) => Err(format!(
                    "Non-zero exit code {code}. See {}",
                    log_path.display()
                )),
                ExitStatus::Signal(signal) => Err(format!(
                    "Terminated by signal {signal}. See {}",
                    log_path.display()
                )),
                ExitStatus::Timeout => Err(format!(
                    "Command timed out after {}s. See {}",
                    EXECUTION_TIMEOUT.as_secs(),
                    log_path.display()
                )),
            },
            Err(e) => Err(e.to_string()),
        }
    }
}

/// Entry point for a spawned worker process (the hidden `worker run`
/// subcommand). Installs the shutdown flag handlers and runs one worker to
/// completion; each process owns its store pool and signal state.
pub async fn run_worker_process(worker_id: String) -> anyhow::Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGTERM, Arc::clone(&shutdown))?;
    signal_hook::flag::register(SIGINT, Arc::clone(&shutdown))?;

    let config = QueueConfig::load();
    let store = JobStore::open(&config.db_path()).await?;

    let mut worker = Worker::new(worker_id, store, config, shutdown);
    worker.run().await?;
    Ok(())
}
