//! Service catalog - the durable desired-state store.
//!
//! The catalog is a JSON file mapping service names to definitions. The
//! supervisor reloads it at the start of every reconciliation pass so that
//! external edits are picked up without restarting; writes happen only on
//! behalf of explicit edit requests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{CircoError, Result};

/// Desired run state of a service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceMode {
    /// Supervised: restarted when no matching process is observed.
    #[default]
    Auto,
    /// Actively suppressed: matching processes are terminated.
    Stopped,
}

impl std::fmt::Display for ServiceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceMode::Auto => write!(f, "auto"),
            ServiceMode::Stopped => write!(f, "stopped"),
        }
    }
}

impl FromStr for ServiceMode {
    type Err = CircoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ServiceMode::Auto),
            "stopped" => Ok(ServiceMode::Stopped),
            _ => Err(CircoError::invalid_request(format!(
                "Unknown service mode: {}",
                s
            ))),
        }
    }
}

/// A declaratively configured external process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceDefinition {
    /// Shell-executable launch command. Empty means "not launchable": the
    /// definition is inert and never matched, started or stopped.
    pub command: String,

    /// Refuse explicit start requests while a match is already observed.
    pub singleton: bool,

    /// Desired run state.
    pub mode: ServiceMode,

    /// Relaunch when no matching process is observed.
    pub auto_restart: bool,
}

impl Default for ServiceDefinition {
    fn default() -> Self {
        Self {
            command: String::new(),
            singleton: true,
            mode: ServiceMode::Auto,
            auto_restart: true,
        }
    }
}

impl ServiceDefinition {
    /// Returns true when the definition has no launch command and must be
    /// skipped by matching, starting and stopping alike.
    pub fn is_inert(&self) -> bool {
        self.command.is_empty()
    }
}

/// Partial update of a definition. Only supplied fields are changed.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DefinitionPatch {
    pub command: Option<String>,
    pub singleton: Option<bool>,
    pub mode: Option<ServiceMode>,
    pub auto_restart: Option<bool>,
}

impl DefinitionPatch {
    /// Applies the patch to a definition, leaving unset fields untouched.
    pub fn apply(&self, def: &mut ServiceDefinition) {
        if let Some(command) = &self.command {
            def.command = command.clone();
        }
        if let Some(singleton) = self.singleton {
            def.singleton = singleton;
        }
        if let Some(mode) = self.mode {
            def.mode = mode;
        }
        if let Some(auto_restart) = self.auto_restart {
            def.auto_restart = auto_restart;
        }
    }
}

/// A catalog snapshot: name → definition.
pub type Catalog = BTreeMap<String, ServiceDefinition>;

/// File-backed catalog store.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    /// Creates a store backed by the given JSON file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the whole catalog. A missing file is an empty catalog; a
    /// malformed file is a configuration error.
    pub fn load(&self) -> Result<Catalog> {
        if !self.path.exists() {
            return Ok(Catalog::new());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            CircoError::config(format!(
                "Failed to read catalog '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            CircoError::config(format!(
                "Failed to parse catalog '{}': {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Replaces the catalog file with the given snapshot.
    pub fn save(&self, catalog: &Catalog) -> Result<()> {
        let content = serde_json::to_string_pretty(catalog)?;
        std::fs::write(&self.path, content).map_err(|e| {
            CircoError::config(format!(
                "Failed to write catalog '{}': {}",
                self.path.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> CatalogStore {
        CatalogStore::new(dir.path().join("services.json"))
    }

    #[test]
    fn test_service_definition_defaults() {
        let def = ServiceDefinition::default();
        assert!(def.command.is_empty());
        assert!(def.singleton);
        assert_eq!(def.mode, ServiceMode::Auto);
        assert!(def.auto_restart);
        assert!(def.is_inert());
    }

    #[test]
    fn test_service_mode_parse() {
        assert_eq!("auto".parse::<ServiceMode>().unwrap(), ServiceMode::Auto);
        assert_eq!(
            "STOPPED".parse::<ServiceMode>().unwrap(),
            ServiceMode::Stopped
        );
        assert!("paused".parse::<ServiceMode>().is_err());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let catalog = store.load().unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut catalog = Catalog::new();
        catalog.insert(
            "mpd".to_string(),
            ServiceDefinition {
                command: "/usr/bin/mpd --no-daemon".to_string(),
                singleton: true,
                mode: ServiceMode::Auto,
                auto_restart: true,
            },
        );
        store.save(&catalog).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.len(), 1);
        let def = reloaded.get("mpd").unwrap();
        assert_eq!(def.command, "/usr/bin/mpd --no-daemon");
        assert!(def.singleton);
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "not json").unwrap();

        let result = store.load();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("parse"));
    }

    #[test]
    fn test_partial_fields_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), r#"{"demo": {"command": "/bin/true"}}"#).unwrap();

        let catalog = store.load().unwrap();
        let def = catalog.get("demo").unwrap();
        assert_eq!(def.command, "/bin/true");
        assert!(def.singleton);
        assert_eq!(def.mode, ServiceMode::Auto);
        assert!(def.auto_restart);
    }

    #[test]
    fn test_patch_only_touches_supplied_fields() {
        let mut def = ServiceDefinition {
            command: "/bin/sleep 100".to_string(),
            singleton: true,
            mode: ServiceMode::Auto,
            auto_restart: true,
        };

        let patch = DefinitionPatch {
            mode: Some(ServiceMode::Stopped),
            ..Default::default()
        };
        patch.apply(&mut def);

        assert_eq!(def.mode, ServiceMode::Stopped);
        assert_eq!(def.command, "/bin/sleep 100");
        assert!(def.singleton);
        assert!(def.auto_restart);
    }

    #[test]
    fn test_patch_deserializes_from_json() {
        let patch: DefinitionPatch =
            serde_json::from_str(r#"{"mode": "stopped", "auto_restart": false}"#).unwrap();
        assert_eq!(patch.mode, Some(ServiceMode::Stopped));
        assert_eq!(patch.auto_restart, Some(false));
        assert!(patch.command.is_none());
        assert!(patch.singleton.is_none());
    }
}
