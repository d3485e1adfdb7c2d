//! Command-line interface definition for circo.
//!
//! This module defines the CLI structure using clap derive macros,
//! including all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// circo - Host-local process supervisor with peer discovery
///
/// Keeps declaratively configured processes running on a host, and lets
/// agents on the same network discover and notify each other via HTTP.
#[derive(Debug, Parser)]
#[command(name = "circo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "CIRCO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Returns the effective log level based on verbose/quiet flags.
    /// Returns: (level_name, is_quiet)
    pub fn log_level(&self) -> (&'static str, bool) {
        if self.quiet {
            return ("error", true);
        }

        let level = match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };

        (level, false)
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the supervisor and its HTTP API
    Serve(ServeArgs),

    /// Check the status of a local or remote agent
    Status(StatusArgs),

    /// List services and their observed states
    Services(StatusArgs),

    /// Send a wake-on-LAN magic packet
    Wake(WakeArgs),

    /// Configuration file operations
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Arguments for the `serve` subcommand.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Bind address (overrides configuration)
    #[arg(long)]
    pub bind: Option<String>,

    /// Listen port (overrides configuration)
    #[arg(long)]
    pub port: Option<u16>,
}

/// Arguments for the `status` and `services` subcommands.
#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Remote agent address (host:port); defaults to the local agent
    #[arg(long)]
    pub target: Option<String>,
}

impl StatusArgs {
    /// Returns the base URL of the agent to query.
    pub fn base_url(&self, local_port: u16) -> String {
        match &self.target {
            Some(target) => format!("http://{}", target),
            None => format!("http://127.0.0.1:{}", local_port),
        }
    }
}

/// Arguments for the `wake` subcommand.
#[derive(Debug, Args)]
pub struct WakeArgs {
    /// Target hardware address (aa:bb:cc:dd:ee:ff)
    #[arg(short, long)]
    pub mac: String,

    /// Remote agent to relay through; broadcasts locally when omitted
    #[arg(long)]
    pub target: Option<String>,
}

/// Configuration subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Validate the configuration file
    Validate,

    /// Show the current configuration
    Show,
}
