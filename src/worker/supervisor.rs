//! Worker pool supervision: spawn, probe, stop.
//!
//! Workers are fresh OS processes obtained by re-executing the current
//! binary with the hidden `worker run` subcommand, so each one initializes
//! its own store pool and signal handlers and inherits no parent-side
//! thread state. The pidfile under the data dir is the only record of the
//! pool; it is written once at start and read once at stop.

use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};
use crate::storage::StorageError;
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::process::Stdio;
use std::time::Duration;
use tracing::{info, warn};

/// Wait between SIGTERM and SIGKILL during stop.
pub const STOP_GRACE: Duration = Duration::from_secs(2);

pub struct WorkerSupervisor {
    config: QueueConfig,
}

impl WorkerSupervisor {
    pub fn new(config: QueueConfig) -> Self {
        Self { config }
    }

    /// Spawn `count` worker processes and record their PIDs.
    ///
    /// Refuses while any previously recorded PID is still alive: two pools
    /// would race each other's pidfile.
    pub fn start(&self, count: u32) -> QueueResult<Vec<i32>> {
        if self.any_running()? {
            return Err(QueueError::AlreadyRunning);
        }

        info!("Starting {count} workers");
        let exe = std::env::current_exe().map_err(StorageError::Io)?;

        let mut pids = Vec::with_capacity(count as usize);
        for i in 0..count {
            let worker_id = format!("worker-{i}-{}", id_suffix());

            let mut command = std::process::Command::new(&exe);
            command
                .arg("worker")
                .arg("run")
                .arg("--worker-id")
                .arg(&worker_id)
                .stdin(Stdio::null());

            // Separate process group: an interrupt aimed at the CLI must
            // not tear down the pool.
            #[cfg(unix)]
            {
                use std::os::unix::process::CommandExt;
                command.process_group(0);
            }

            let child = command.spawn().map_err(StorageError::Io)?;
            let pid = child.id() as i32;
            info!("Started worker {worker_id} (PID: {pid})");
            pids.push(pid);
        }

        self.save_pids(&pids)?;
        info!("All {count} workers started");
        Ok(pids)
    }

    /// Stop the recorded pool: SIGTERM each PID, wait the grace window,
    /// SIGKILL survivors, remove the pidfile. Missing PIDs are warned and
    /// skipped.
    pub async fn stop(&self) -> QueueResult<()> {
        let pids = self.load_pids()?;

        if pids.is_empty() {
            warn!("No running workers found");
            return Ok(());
        }

        info!("Stopping {} workers", pids.len());

        for &pid in &pids {
            match signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
                Ok(()) => info!("Sent SIGTERM to worker PID {pid}"),
                Err(Errno::ESRCH) => warn!("Worker PID {pid} not found"),
                Err(e) => warn!("Error stopping worker PID {pid}: {e}"),
            }
        }

        tokio::time::sleep(STOP_GRACE).await;

        for &pid in &pids {
            let _ = signal::kill(Pid::from_raw(pid), Signal::SIGKILL);
        }

        let pid_file = self.config.pid_file();
        if pid_file.exists() {
            std::fs::remove_file(&pid_file).map_err(StorageError::Io)?;
        }

        info!("All workers stopped");
        Ok(())
    }

    /// True if at least one recorded PID is still alive.
    pub fn any_running(&self) -> QueueResult<bool> {
        Ok(self.load_pids()?.iter().any(|&pid| process_alive(pid)))
    }

    fn save_pids(&self, pids: &[i32]) -> QueueResult<()> {
        let pid_file = self.config.pid_file();
        if let Some(parent) = pid_file.parent() {
            std::fs::create_dir_all(parent).map_err(StorageError::Io)?;
        }
        let contents: String = pids.iter().map(|pid| format!("{pid}\n")).collect();
        std::fs::write(&pid_file, contents).map_err(StorageError::Io)?;
        Ok(())
    }

    fn load_pids(&self) -> QueueResult<Vec<i32>> {
        let pid_file = self.config.pid_file();
        if !pid_file.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&pid_file).map_err(StorageError::Io)?;
        Ok(contents
            .lines()
            .filter_map(|line| line.trim().parse::<i32>().ok())
            .collect())
    }
}

/// Signal-0 probe: the process exists if the kernel accepts the signal,
/// including EPERM (alive but not ours).
fn process_alive(pid: i32) -> bool {
    match signal::kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Random suffix distinguishing worker identities across restarts.
fn id_suffix() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn supervisor_in(dir: &TempDir) -> WorkerSupervisor {
        WorkerSupervisor::new(QueueConfig::load_from(dir.path()))
    }

    #[test]
    fn no_pidfile_means_nothing_running() {
        let dir = TempDir::new().unwrap();
        assert!(!supervisor_in(&dir).any_running().unwrap());
    }

    #[test]
    fn pidfile_round_trips() {
        let dir = TempDir::new().unwrap();
        let supervisor = supervisor_in(&dir);
        supervisor.save_pids(&[123, 456]).unwrap();
        assert_eq!(supervisor.load_pids().unwrap(), vec![123, 456]);
    }

    #[test]
    fn live_pid_is_detected() {
        let dir = TempDir::new().unwrap();
        let supervisor = supervisor_in(&dir);
        supervisor.save_pids(&[std::process::id() as i32]).unwrap();
        assert!(supervisor.any_running().unwrap());
    }

    #[test]
    fn dead_pids_are_ignored() {
        // Far beyond any default pid_max, so never a live process.
        let dir = TempDir::new().unwrap();
        let supervisor = supervisor_in(&dir);
        supervisor.save_pids(&[999_999_999]).unwrap();
        assert!(!supervisor.any_running().unwrap());
    }

    #[tokio::test]
    async fn stop_skips_missing_pids_and_removes_the_pidfile() {
        let dir = TempDir::new().unwrap();
        let supervisor = supervisor_in(&dir);
        supervisor.save_pids(&[999_999_999]).unwrap();
        supervisor.stop().await.unwrap();
        assert!(!supervisor.config.pid_file().exists());
    }

    #[test]
    fn worker_ids_get_distinct_suffixes() {
        assert_eq!(id_suffix().len(), 8);
        assert_ne!(id_suffix(), id_suffix());
    }
}
