//! Process launch and termination.
//!
//! Launched processes run through the host shell and are detached: the
//! launch call does not block, and the supervisor re-discovers live
//! processes through the process table on the next reconciliation pass.
//! A background thread reaps each child once it exits so exited services
//! do not accumulate as zombies.

use chrono::{DateTime, Utc};
use std::process::{Command, Stdio};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, Signal, System};
use tracing::info;

use crate::error::{CircoError, Result};

/// Identity and start time of a freshly launched process.
#[derive(Debug, Clone)]
pub struct LaunchedProcess {
    /// OS process id.
    pub pid: u32,
    /// Launch timestamp.
    pub started_at: DateTime<Utc>,
}

/// Starts and signals OS processes on behalf of the supervisor.
pub trait ProcessLauncher: Send + Sync {
    /// Executes `command` through the host shell, detached.
    fn launch(&self, command: &str) -> Result<LaunchedProcess>;

    /// Sends a graceful termination signal to `pid`.
    fn terminate(&self, pid: u32) -> Result<()>;
}

/// Launcher backed by `sh -c` and SIGTERM.
#[derive(Debug, Default)]
pub struct ShellLauncher;

impl ShellLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessLauncher for ShellLauncher {
    fn launch(&self, command: &str) -> Result<LaunchedProcess> {
        if command.is_empty() {
            return Err(CircoError::launch(command, "empty command"));
        }

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CircoError::launch(command, e.to_string()))?;

        let pid = child.id();
        info!(pid, command, "Launched process");

        // Reap the child when it exits, off the launch path. Without this
        // wait every exited child stays in the process table as a zombie.
        std::thread::spawn(move || {
            let _ = child.wait();
        });

        Ok(LaunchedProcess {
            pid,
            started_at: Utc::now(),
        })
    }

    fn terminate(&self, pid: u32) -> Result<()> {
        let mut system = System::new();
        let target = Pid::from_u32(pid);
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[target]),
            true,
            ProcessRefreshKind::new(),
        );

        let process = system
            .process(target)
            .ok_or_else(|| CircoError::terminate(pid, "process not found"))?;

        match process.kill_with(Signal::Term) {
            Some(true) => {
                info!(pid, "Sent SIGTERM");
                Ok(())
            }
            Some(false) => Err(CircoError::terminate(pid, "signal delivery failed")),
            None => Err(CircoError::terminate(pid, "SIGTERM unsupported on platform")),
        }
    }
}
