//! Configuration module for circo.
//!
//! The agent configuration is loaded from a YAML file. The service catalog
//! (desired state) lives in a separate JSON file referenced by
//! `supervisor.catalog_path` and is handled by [`crate::catalog`].

mod discovery;
mod logging;
mod notify;
mod server;
mod supervisor;

pub use discovery::DiscoveryConfig;
pub use logging::{LogFormat, LogLevel, LogOutput, LoggingConfig};
pub use notify::NotifyConfig;
pub use server::ServerConfig;
pub use supervisor::SupervisorConfig;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::CircoError;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Agent name (defaults to hostname).
    pub name: Option<String>,

    /// Server configuration.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Supervisor configuration.
    pub supervisor: SupervisorConfig,

    /// Peer discovery configuration.
    pub discovery: DiscoveryConfig,

    /// Peer notification configuration.
    pub notify: NotifyConfig,
}

impl Config {
    /// Loads configuration from an optional path.
    /// If path is None, uses default search paths.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self, CircoError> {
        match path {
            Some(p) => Self::load_from_path(p),
            None => {
                let default_paths = [
                    "/etc/circo/config.yaml",
                    "/etc/circo/config.yml",
                    "config.yaml",
                    "config.yml",
                ];

                for path in &default_paths {
                    if std::path::Path::new(path).exists() {
                        return Self::load_from_path(path);
                    }
                }

                // No config file found, use defaults
                Ok(Self::default())
            }
        }
    }

    /// Loads configuration from a YAML file.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, CircoError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            CircoError::config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::load_from_str(&content)
    }

    /// Loads configuration from a YAML string.
    pub fn load_from_str(content: &str) -> Result<Self, CircoError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| CircoError::config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validates configuration.
    fn validate(&self) -> Result<(), CircoError> {
        if self.server.port == 0 {
            return Err(CircoError::config("server.port must be > 0"));
        }

        if self.supervisor.interval_seconds == 0 {
            return Err(CircoError::config(
                "supervisor.interval_seconds must be > 0",
            ));
        }

        if self.supervisor.catalog_path.as_os_str().is_empty() {
            return Err(CircoError::config("supervisor.catalog_path must be set"));
        }

        if self.notify.timeout_ms == 0 {
            return Err(CircoError::config("notify.timeout_ms must be > 0"));
        }

        if self.logging.output == LogOutput::File && self.logging.file_path.is_none() {
            return Err(CircoError::config(
                "logging.file_path is required when output is file",
            ));
        }

        Ok(())
    }

    /// Returns the agent name (configured name or hostname).
    pub fn agent_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "unknown".to_string())
        })
    }
}
