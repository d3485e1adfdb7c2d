//! Supervisor configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Reconciliation loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Seconds between reconciliation passes.
    pub interval_seconds: u64,

    /// Path of the JSON service catalog.
    pub catalog_path: PathBuf,

    /// Path of the audit log file.
    pub audit_path: PathBuf,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 5,
            catalog_path: PathBuf::from("services.json"),
            audit_path: PathBuf::from("circo.log"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supervisor_config_default() {
        let config = SupervisorConfig::default();
        assert_eq!(config.interval_seconds, 5);
        assert_eq!(config.catalog_path, PathBuf::from("services.json"));
        assert_eq!(config.audit_path, PathBuf::from("circo.log"));
    }
}
