//! Peer discovery configuration types.

use serde::{Deserialize, Serialize};

/// mDNS discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Enable mDNS advertisement and browsing.
    pub enabled: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
