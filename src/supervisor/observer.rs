//! Process observation - mapping launch commands to live OS processes.
//!
//! Matching is a best-effort substring heuristic over the process table.
//! It may produce false positives for short or generic commands; that is an
//! accepted tradeoff over precise process ancestry tracking. The rule itself
//! lives in [`invocation_matches`] so it can be unit-tested against recorded
//! invocation strings without a real process table.

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tracing::debug;

use crate::error::{CircoError, Result};

/// A live OS process that matched a launch command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedProcess {
    /// OS process id.
    pub pid: u32,
    /// Full invocation string (command line, space-joined).
    pub invocation: String,
}

/// Queries the OS process table for processes matching a launch command.
pub trait ProcessObserver: Send + Sync {
    /// Returns every live process matching `command`. The whole process
    /// table is enumerated on each call; an unreadable table is an
    /// observation error.
    fn matching(&self, command: &str) -> Result<Vec<ObservedProcess>>;
}

/// Decides whether a process belongs to a launch command.
///
/// A process matches when any of the following holds:
/// - its invocation string contains `command` as a contiguous substring,
/// - its executable path equals `command`,
/// - the file name of `command`'s program appears in the invocation
///   (tolerates processes re-exec'd under a resolved or relative path).
///
/// Matching is case-sensitive. An empty `command` never matches.
pub fn invocation_matches(command: &str, invocation: &str, exe: Option<&str>) -> bool {
    if command.is_empty() {
        return false;
    }

    if invocation.contains(command) {
        return true;
    }

    if exe == Some(command) {
        return true;
    }

    if let Some(file_name) = command_file_name(command) {
        if invocation.contains(&file_name) {
            return true;
        }
    }

    false
}

/// Extracts the file name of the program word of a shell command, e.g.
/// `/usr/bin/mpd --no-daemon` → `mpd`. Returns None for unparseable input.
fn command_file_name(command: &str) -> Option<String> {
    let words = shell_words::split(command).ok()?;
    let program = words.first()?;
    std::path::Path::new(program)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
}

/// A live host always shows at least the observing process itself; an
/// empty table means the read failed.
fn table_readable(system: &System) -> Result<()> {
    if system.processes().is_empty() {
        return Err(CircoError::observation(
            "process table read returned no processes",
        ));
    }
    Ok(())
}

/// Observer backed by the live OS process table.
#[derive(Debug, Default)]
pub struct SystemObserver;

impl SystemObserver {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessObserver for SystemObserver {
    fn matching(&self, command: &str) -> Result<Vec<ObservedProcess>> {
        if command.is_empty() {
            return Ok(Vec::new());
        }

        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::new()
                .with_cmd(UpdateKind::Always)
                .with_exe(UpdateKind::Always),
        );
        table_readable(&system)?;

        let own_pid = std::process::id();
        let mut matched = Vec::new();

        for (pid, process) in system.processes() {
            let pid = pid.as_u32();
            if pid == own_pid {
                continue;
            }

            let invocation = process
                .cmd()
                .iter()
                .map(|part| part.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ");
            let exe = process.exe().map(|p| p.to_string_lossy().into_owned());

            if invocation_matches(command, &invocation, exe.as_deref()) {
                debug!(pid, command, "Process matched command");
                matched.push(ObservedProcess { pid, invocation });
            }
        }

        Ok(matched)
    }
}
