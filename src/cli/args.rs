//! CLI argument structures.
//!
//! Defines the full command tree for queuectl. Doc comments double as help
//! text.

use clap::{Parser, Subcommand};

/// Durable background job queue with retries and a dead-letter queue
#[derive(Parser)]
#[command(name = "queuectl")]
#[command(about = "queuectl - durable background job queue", long_about = None)]
#[command(version)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enqueue a new job from a JSON payload
    #[command(name = "enqueue")]
    Enqueue {
        /// JSON object with required "id" and "command", optional
        /// "max_retries" and "scheduled_at"
        job_json: String,
    },

    /// List jobs, oldest first
    #[command(name = "list")]
    List {
        /// Only show jobs in this state
        #[arg(long, value_name = "STATE")]
        state: Option<String>,
    },

    /// Show job counts per state
    #[command(name = "status")]
    Status,

    /// Manage worker processes
    Worker {
        #[command(subcommand)]
        command: WorkerCommands,
    },

    /// Inspect and replay the dead-letter queue
    Dlq {
        #[command(subcommand)]
        command: DlqCommands,
    },

    /// Read and write persistent configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Delete a job record
    #[command(hide = true)]
    Delete {
        /// Job id
        id: String,
    },
}

#[derive(Subcommand)]
pub enum WorkerCommands {
    /// Start worker processes
    Start {
        /// Number of workers to start
        #[arg(long, default_value = "3")]
        count: u32,
    },

    /// Stop all running workers
    Stop,

    /// Run a single worker in the foreground (spawned by `worker start`)
    #[command(hide = true)]
    Run {
        /// Unique worker identity within the pool
        #[arg(long)]
        worker_id: String,
    },
}

#[derive(Subcommand)]
pub enum DlqCommands {
    /// List dead-lettered jobs
    List,

    /// Requeue a dead-lettered job from scratch
    Retry {
        /// Job id
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Set a configuration key and persist it
    Set {
        /// Configuration key
        key: String,
        /// Value (numeric strings are coerced to integer, then float)
        value: String,
    },

    /// Show the merged configuration
    Show,
}
