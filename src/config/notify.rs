//! Peer notification configuration types.

use serde::{Deserialize, Serialize};

/// Configuration for the lifecycle event fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Per-peer delivery timeout in milliseconds.
    pub timeout_ms: u64,

    /// Port peers listen on for events (defaults to the local server port
    /// at startup when left at 0).
    pub peer_port: u16,

    /// Also try the .1 address of the local /24 as a likely controller.
    pub gateway_fallback: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 1000,
            peer_port: 0,
            gateway_fallback: true,
        }
    }
}

impl NotifyConfig {
    /// Returns the port peers are expected to listen on, falling back to
    /// the local server port when unset.
    pub fn effective_peer_port(&self, server_port: u16) -> u16 {
        if self.peer_port == 0 {
            server_port
        } else {
            self.peer_port
        }
    }
}
