//! Application state management.
//!
//! This module manages the shared state across HTTP request handlers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::audit::AuditLog;
use crate::config::Config;
use crate::peers::PeerDirectory;
use crate::supervisor::Supervisor;

/// Shared application state.
pub struct AppState {
    /// The reconciliation engine.
    pub supervisor: Arc<Supervisor>,
    /// Known peer agents.
    pub peers: Arc<PeerDirectory>,
    /// Action audit trail.
    pub audit: Arc<AuditLog>,
    /// Application start time.
    pub start_time: Instant,
    /// Agent name.
    pub agent_name: String,
    /// Server bind address.
    pub server_bind: String,
    /// Server port.
    pub server_port: u16,
    /// Statistics counters.
    pub stats: Stats,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        config: &Config,
        supervisor: Arc<Supervisor>,
        peers: Arc<PeerDirectory>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            supervisor,
            peers,
            audit,
            start_time: Instant::now(),
            agent_name: config.agent_name(),
            server_bind: config.server.bind.clone(),
            server_port: config.server.port,
            stats: Stats::default(),
        }
    }

    /// Returns the uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Increments the total request counter.
    pub fn increment_requests(&self) {
        self.stats.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the successful request counter.
    pub fn increment_success(&self) {
        self.stats.requests_success.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the failed request counter.
    pub fn increment_failed(&self) {
        self.stats.requests_failed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Statistics counters.
#[derive(Default)]
pub struct Stats {
    /// Total requests received.
    pub requests_total: AtomicU64,
    /// Successful requests.
    pub requests_success: AtomicU64,
    /// Failed requests.
    pub requests_failed: AtomicU64,
}

impl Stats {
    /// Gets the current statistics as a snapshot.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_success: self.requests_success.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of statistics counters.
#[derive(Debug, Clone, Default)]
pub struct StatsSnapshot {
    /// Total requests received.
    pub requests_total: u64,
    /// Successful requests.
    pub requests_success: u64,
    /// Failed requests.
    pub requests_failed: u64,
}
