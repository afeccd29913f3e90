//! Command routing and execution.
//!
//! Each subcommand maps to one async handler. Results go to stdout as
//! single-line confirmations or tables; failures bubble up to the fatal
//! error handler, which prints one stderr line and exits nonzero.

use crate::cli::args::{Commands, ConfigCommands, DlqCommands, WorkerCommands};
use crate::cli::output;
use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::job::{EnqueueRequest, JobManager, JobState};
use crate::storage::JobStore;
use crate::worker::{self, WorkerSupervisor};
use anyhow::Result;
use std::str::FromStr;

/// Execute a parsed CLI command.
pub async fn execute_command(command: Commands) -> Result<()> {
    match command {
        Commands::Enqueue { job_json } => run_enqueue(job_json).await,
        Commands::List { state } => run_list(state).await,
        Commands::Status => run_status().await,
        Commands::Worker { command } => match command {
            WorkerCommands::Start { count } => run_worker_start(count).await,
            WorkerCommands::Stop => run_worker_stop().await,
            WorkerCommands::Run { worker_id } => worker::run_worker_process(worker_id).await,
        },
        Commands::Dlq { command } => match command {
            DlqCommands::List => run_dlq_list().await,
            DlqCommands::Retry { id } => run_dlq_retry(id).await,
        },
        Commands::Config { command } => match command {
            ConfigCommands::Set { key, value } => run_config_set(key, value).await,
            ConfigCommands::Show => run_config_show().await,
        },
        Commands::Delete { id } => run_delete(id).await,
    }
}

async fn open_manager() -> Result<JobManager> {
    let config = QueueConfig::load();
    let store = JobStore::open(&config.db_path()).await?;
    Ok(JobManager::new(store, config))
}

async fn run_enqueue(job_json: String) -> Result<()> {
    let request: EnqueueRequest = serde_json::from_str(&job_json)
        .map_err(|e| QueueError::invalid_input(format!("invalid job JSON: {e}")))?;

    let manager = open_manager().await?;
    let job = manager.enqueue(request).await?;

    println!("✓ Job enqueued successfully");
    println!("  ID: {}", job.id);
    println!("  Command: {}", job.command);
    println!("  State: {}", job.state);
    Ok(())
}

async fn run_list(state: Option<String>) -> Result<()> {
    let state = state
        .as_deref()
        .map(JobState::from_str)
        .transpose()
        .map_err(QueueError::from)?;

    let manager = open_manager().await?;
    let jobs = manager.list(state).await?;
    print!("{}", output::render_job_table(&jobs));
    Ok(())
}

async fn run_status() -> Result<()> {
    let manager = open_manager().await?;
    let status = manager.status().await?;
    print!("{}", output::render_status(&status));
    Ok(())
}

async fn run_worker_start(count: u32) -> Result<()> {
    if count == 0 {
        return Err(QueueError::invalid_input("worker count must be positive").into());
    }
    let supervisor = WorkerSupervisor::new(QueueConfig::load());
    supervisor.start(count)?;
    println!("✓ Started {count} workers");
    Ok(())
}

async fn run_worker_stop() -> Result<()> {
    let supervisor = WorkerSupervisor::new(QueueConfig::load());
    supervisor.stop().await?;
    println!("✓ Workers stopped");
    Ok(())
}

async fn run_dlq_list() -> Result<()> {
    let manager = open_manager().await?;
    let jobs = manager.list(Some(JobState::Dead)).await?;
    print!("{}", output::render_dlq_table(&jobs));
    Ok(())
}

async fn run_dlq_retry(id: String) -> Result<()> {
    let manager = open_manager().await?;
    manager.retry_from_dlq(&id).await?;
    println!("✓ Job requeued from DLQ: {id}");
    Ok(())
}

async fn run_config_set(key: String, value: String) -> Result<()> {
    let mut config = QueueConfig::load();
    config.set(&key, &value)?;
    println!("✓ Configuration updated: {key} = {value}");
    Ok(())
}

async fn run_config_show() -> Result<()> {
    let config = QueueConfig::load();
    println!("{}", serde_json::to_string_pretty(&config.show()?)?);
    Ok(())
}

async fn run_delete(id: String) -> Result<()> {
    let manager = open_manager().await?;
    manager.delete(&id).await?;
    println!("✓ Job deleted: {id}");
    Ok(())
}
