//! Audit log - a human-readable trail of supervisor actions.
//!
//! Distinct from tracing diagnostics: this file records what the supervisor
//! did to services (launches, terminations, catalog edits) and is served
//! back verbatim through the API. Recording is fire-and-forget; I/O errors
//! are logged and never raised.

use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Append-only timestamped action log.
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    // Serializes appends from concurrent handler and supervisor tasks.
    write_lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a timestamped line. Never fails the caller.
    pub fn record(&self, message: &str) {
        let line = format!("[{}] {}\n", Utc::now().to_rfc3339(), message);

        let _guard = self.write_lock.lock().expect("audit lock poisoned");
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()));

        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "Audit write failed");
        }
    }

    /// Returns the full log contents; a missing file reads as empty.
    pub fn read(&self) -> String {
        std::fs::read_to_string(&self.path).unwrap_or_default()
    }
}
