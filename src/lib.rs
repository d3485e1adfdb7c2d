//! circo - Host-local process supervisor with peer discovery
//!
//! This crate keeps declaratively configured external processes running on
//! a host and lets agents on the same network discover and notify each
//! other via HTTP.
//!
//! # Overview
//!
//! Desired state lives in a JSON service catalog. A reconciliation loop
//! periodically compares it against the live OS process table and launches
//! or terminates processes to close the gap. Agents advertise themselves
//! over mDNS, learn peers from inbound requests, and broadcast lifecycle
//! events to every peer they know about.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface definitions
//! - [`config`] - Configuration file parsing and validation
//! - [`catalog`] - Service catalog (desired state) store
//! - [`supervisor`] - Reconciliation engine, process observer and launcher
//! - [`peers`] - Known peer directory
//! - [`notifier`] - Best-effort lifecycle event fan-out
//! - [`discovery`] - mDNS advertisement and browsing
//! - [`server`] - HTTP API
//! - [`client`] - HTTP client for remote agents
//! - [`audit`] - Append-only action log
//! - [`wol`] - Wake-on-LAN magic packets
//! - [`error`] - Error types and error handling

pub mod audit;
pub mod catalog;
pub mod cli;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod notifier;
pub mod peers;
pub mod server;
pub mod supervisor;
pub mod wol;

// Re-exports for convenience
pub use audit::AuditLog;
pub use catalog::{Catalog, CatalogStore, DefinitionPatch, ServiceDefinition, ServiceMode};
pub use cli::Cli;
pub use client::CircoClient;
pub use config::Config;
pub use discovery::Discovery;
pub use error::{CircoError, ErrorCode, Result};
pub use notifier::{EventBroadcaster, EventKind, Notifier, PeerEvent};
pub use peers::PeerDirectory;
pub use supervisor::{ShellLauncher, Supervisor, SystemObserver};
