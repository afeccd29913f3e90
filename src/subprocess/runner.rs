use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Child;

use super::error::ProcessError;

/// A process invocation: program, arguments, and execution policy.
#[derive(Debug, Clone)]
pub struct ProcessCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
    /// Combined stdout+stderr destination. Without it, output is discarded.
    pub log_path: Option<PathBuf>,
}

/// Classified result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Error(i32),
    Timeout,
    Signal(i32),
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Success)
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            ExitStatus::Success => Some(0),
            ExitStatus::Error(code) => Some(*code),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub duration: Duration,
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError>;
}

/// Production runner on `tokio::process`.
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        let start = std::time::Instant::now();

        tracing::debug!(
            "Executing subprocess: {} {}",
            command.program,
            command.args.join(" ")
        );

        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args);

        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::null());
        match &command.log_path {
            Some(log_path) => {
                if let Some(parent) = log_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let log_file = std::fs::File::create(log_path)?;
                cmd.stdout(Stdio::from(log_file.try_clone()?));
                cmd.stderr(Stdio::from(log_file));
            }
            None => {
                cmd.stdout(Stdio::null());
                cmd.stderr(Stdio::null());
            }
        }

        // Own process group, so a timeout kill reaps the whole pipeline the
        // shell may have spawned.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProcessError::CommandNotFound(command.program.clone())
            } else {
                ProcessError::Spawn(e)
            }
        })?;

        let exit = if let Some(timeout) = command.timeout {
            match tokio::time::timeout(timeout, child.wait()).await {
                Ok(result) => result?,
                Err(_) => {
                    kill_process_group(&mut child).await;
                    let duration = start.elapsed();
                    tracing::warn!(
                        "Subprocess timed out after {:?}: {} {}",
                        timeout,
                        command.program,
                        command.args.join(" ")
                    );
                    return Ok(ProcessOutput {
                        status: ExitStatus::Timeout,
                        duration,
                    });
                }
            }
        } else {
            child.wait().await?
        };

        let duration = start.elapsed();
        let status = classify_exit(exit);

        match &status {
            ExitStatus::Success => {
                tracing::debug!(
                    "Subprocess completed successfully in {:?}: {} {}",
                    duration,
                    command.program,
                    command.args.join(" ")
                );
            }
            ExitStatus::Error(code) => {
                tracing::warn!(
                    "Subprocess failed with exit code {} in {:?}: {} {}",
                    code,
                    duration,
                    command.program,
                    command.args.join(" ")
                );
            }
            ExitStatus::Signal(signal) => {
                tracing::warn!(
                    "Subprocess terminated by signal {} in {:?}: {} {}",
                    signal,
                    duration,
                    command.program,
                    command.args.join(" ")
                );
            }
            ExitStatus::Timeout => unreachable!("timeout returns early"),
        }

        Ok(ProcessOutput { status, duration })
    }
}

fn classify_exit(exit: std::process::ExitStatus) -> ExitStatus {
    if exit.success() {
        return ExitStatus::Success;
    }
    if let Some(code) = exit.code() {
        return ExitStatus::Error(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = exit.signal() {
            return ExitStatus::Signal(signal);
        }
    }
    ExitStatus::Error(1)
}

/// Terminate the child's process group: SIGTERM, a short grace, then
/// SIGKILL for anything still alive, and finally reap the child.
async fn kill_process_group(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        let pgid = Pid::from_raw(-(pid as i32));
        let _ = signal::kill(pgid, Signal::SIGTERM);

        tokio::time::sleep(Duration::from_millis(100)).await;

        if let Ok(None) = child.try_wait() {
            let _ = signal::kill(pgid, Signal::SIGKILL);
        }
    }

    let _ = child.kill().await;
    let _ = child.wait().await;
}
