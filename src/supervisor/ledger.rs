//! Start ledger - informational record of supervised launches.
//!
//! Records are keyed by (service, pid) and are meaningful only while the
//! referenced pid is alive and still matches the service. Stale records are
//! not evicted on process exit; consumers must cross-reference against the
//! currently observed pid set before trusting a timestamp.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// In-memory (service, pid) → start timestamp mapping.
#[derive(Debug, Default)]
pub struct StartLedger {
    records: HashMap<(String, u32), DateTime<Utc>>,
}

impl StartLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a launch. An existing record for the same (service, pid) is
    /// replaced; older records for the same service are pruned when their
    /// pid is no longer among `live_pids` (opportunistic cleanup).
    pub fn record(
        &mut self,
        service: &str,
        pid: u32,
        started_at: DateTime<Utc>,
        live_pids: &[u32],
    ) {
        self.records
            .retain(|(name, p), _| name != service || live_pids.contains(p) || *p == pid);
        self.records.insert((service.to_string(), pid), started_at);
    }

    /// Returns the most recent start timestamp for `service` among the
    /// given live pids. Records whose pid is not live are ignored.
    pub fn last_started(&self, service: &str, live_pids: &[u32]) -> Option<DateTime<Utc>> {
        self.records
            .iter()
            .filter(|((name, pid), _)| name == service && live_pids.contains(pid))
            .map(|(_, ts)| *ts)
            .max()
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
