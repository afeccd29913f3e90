//! Persistent queue configuration.
//!
//! Configuration lives as a JSON object at `<root>/config.json` and is
//! merged over hardcoded defaults on load: missing keys fall back, unknown
//! keys are preserved verbatim so operators can stash free-form values. The
//! root directory is `~/.queuectl`, overridable with the `QUEUECTL_HOME`
//! environment variable (also the isolation seam for tests).

use crate::error::{QueueError, QueueResult};
use crate::storage::StorageError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;

const CONFIG_FILE: &str = "config.json";

/// Queue-wide settings, persisted as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Default total attempts allowed before a job is dead-lettered.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base of the exponential retry backoff (`base ^ attempts` seconds).
    #[serde(default = "default_backoff_base")]
    pub backoff_base: f64,

    /// Seconds a worker sleeps between empty-queue polls.
    #[serde(default = "default_worker_poll_interval")]
    pub worker_poll_interval: f64,

    /// Directory holding the job database, logs, and pidfile.
    #[serde(default)]
    pub data_dir: PathBuf,

    /// Operator-defined keys, kept as submitted.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,

    /// Where this config was loaded from (not persisted).
    #[serde(skip)]
    root: PathBuf,
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base() -> f64 {
    2.0
}

fn default_worker_poll_interval() -> f64 {
    1.0
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base: default_backoff_base(),
            worker_poll_interval: default_worker_poll_interval(),
            data_dir: PathBuf::new(),
            extra: serde_json::Map::new(),
            root: PathBuf::new(),
        }
    }
}

/// Per-user root directory: `$QUEUECTL_HOME` or `~/.queuectl`.
pub fn default_root() -> PathBuf {
    if let Ok(home) = std::env::var("QUEUECTL_HOME") {
        return PathBuf::from(home);
    }
    dirs::home_dir()
        .map(|h| h.join(".queuectl"))
        .unwrap_or_else(|| PathBuf::from(".queuectl"))
}

impl QueueConfig {
    /// Load from the default root.
    pub fn load() -> Self {
        Self::load_from(&default_root())
    }

    /// Load from `<root>/config.json`, merging over defaults. An unreadable
    /// or malformed file falls back to defaults with a logged warning rather
    /// than failing the command.
    pub fn load_from(root: &Path) -> Self {
        let path = root.join(CONFIG_FILE);
        let mut config = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str::<QueueConfig>(&contents).unwrap_or_else(|e| {
                warn!("Failed to parse config at {}: {e}", path.display());
                QueueConfig::default()
            }),
            Err(_) => QueueConfig::default(),
        };

        config.root = root.to_path_buf();
        if config.data_dir.as_os_str().is_empty() {
            config.data_dir = root.to_path_buf();
        }
        config
    }

    /// Persist the current values to `<root>/config.json`.
    pub fn save(&self) -> QueueResult<()> {
        std::fs::create_dir_all(&self.root).map_err(StorageError::Io)?;
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| QueueError::invalid_input(e.to_string()))?;
        std::fs::write(self.root.join(CONFIG_FILE), contents).map_err(StorageError::Io)?;
        Ok(())
    }

    /// Set one key and persist. Known keys are validated; unknown keys are
    /// stored as-is. String values are auto-coerced integer, then float,
    /// then left as text.
    pub fn set(&mut self, key: &str, value: &str) -> QueueResult<()> {
        let coerced = coerce_value(value);
        match key {
            "max_retries" => {
                self.max_retries = coerced
                    .as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .filter(|n| *n > 0)
                    .ok_or_else(|| {
                        QueueError::invalid_input("'max_retries' must be a positive integer")
                    })?;
            }
            "backoff_base" => {
                self.backoff_base = coerced
                    .as_f64()
                    .filter(|b| *b > 0.0)
                    .ok_or_else(|| {
                        QueueError::invalid_input("'backoff_base' must be a positive number")
                    })?;
            }
            "worker_poll_interval" => {
                self.worker_poll_interval = coerced
                    .as_f64()
                    .filter(|i| *i > 0.0)
                    .ok_or_else(|| {
                        QueueError::invalid_input(
                            "'worker_poll_interval' must be a positive number",
                        )
                    })?;
            }
            "data_dir" => {
                self.data_dir = PathBuf::from(value);
            }
            other => {
                self.extra.insert(other.to_string(), coerced);
            }
        }
        self.save()
    }

    /// The merged configuration as a JSON object.
    pub fn show(&self) -> QueueResult<Value> {
        serde_json::to_value(self).map_err(|e| QueueError::invalid_input(e.to_string()))
    }

    /// Path of the job database file.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("jobs.db")
    }

    /// Directory holding per-job execution logs.
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    /// Combined stdout+stderr log file for one job.
    pub fn job_log_path(&self, job_id: &str) -> PathBuf {
        self.log_dir().join(format!("{job_id}.log"))
    }

    /// Pidfile recording the running worker pool.
    pub fn pid_file(&self) -> PathBuf {
        self.data_dir.join("workers.pid")
    }
}

/// Coerce a CLI-submitted value: integer, then float, else string.
fn coerce_value(value: &str) -> Value {
    if let Ok(n) = value.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(f) = value.parse::<f64>() {
        if let Some(v) = serde_json::Number::from_f64(f) {
            return Value::Number(v);
        }
    }
    Value::String(value.to_string())
}
