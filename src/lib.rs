//! # queuectl
//!
//! A durable, multi-worker background job queue operated as a local CLI
//! service. Jobs are shell commands; a pool of worker processes claims and
//! executes them against a shared SQLite store, failures retry with
//! exponential backoff, and exhausted jobs land in a dead-letter queue for
//! manual replay.
//!
//! ## Usage
//!
//! ```bash
//! queuectl enqueue '{"id":"j1","command":"sleep 2"}'
//! queuectl worker start --count 3
//! queuectl status
//! queuectl dlq list
//! ```
//!
//! ## Modules
//!
//! - `app` - Application-level startup: logging, verbosity, fatal errors
//! - `cli` - Command-line argument structures and routing
//! - `config` - Persisted queue configuration under the data directory
//! - `error` - Unified error taxonomy for the control surface
//! - `job` - Job model, state machine, retry policy, and lifecycle manager
//! - `storage` - SQLite job store with the atomic claim primitive
//! - `subprocess` - Shell execution layer with log capture and timeouts
//! - `timestamps` - Canonical lexicographically-ordered timestamp form
//! - `worker` - Worker run loop and the worker-pool supervisor

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod job;
pub mod storage;
pub mod subprocess;
pub mod timestamps;
pub mod worker;
