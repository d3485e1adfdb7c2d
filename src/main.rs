//! circo - Host-local process supervisor with peer discovery
//!
//! Entry point for the circo application.

use clap::Parser;
use circo::cli::{Cli, Commands, ConfigCommands, ServeArgs, StatusArgs, WakeArgs};
use circo::config::Config;
use circo::error::exit_code;
use circo::notifier::EventBroadcaster;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on CLI flags
    if let Err(e) = init_logging(&cli) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::from(exit_code::GENERAL_ERROR as u8);
    }

    // Execute the command
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

/// Initialize the tracing subscriber based on CLI options.
fn init_logging(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let (level_str, _is_quiet) = cli.log_level();

    let level = match level_str {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .init();

    Ok(())
}

/// Main application logic.
fn run(cli: Cli) -> circo::Result<()> {
    match &cli.command {
        Commands::Serve(args) => cmd_serve(&cli, args),
        Commands::Status(args) => cmd_status(&cli, args),
        Commands::Services(args) => cmd_services(&cli, args),
        Commands::Wake(args) => cmd_wake(args),
        Commands::Config(subcmd) => cmd_config(&cli, subcmd),
    }
}

/// Handle the `serve` command.
fn cmd_serve(cli: &Cli, args: &ServeArgs) -> circo::Result<()> {
    let mut config = load_config(cli)?;

    // CLI args override configuration
    if let Some(bind) = &args.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!(
        agent_name = %config.agent_name(),
        bind = %config.server.bind,
        port = %config.server.port,
        catalog = %config.supervisor.catalog_path.display(),
        "Starting circo agent"
    );

    let runtime = tokio::runtime::Runtime::new().map_err(|e| {
        circo::CircoError::config_with_source("Failed to create async runtime", e)
    })?;

    runtime.block_on(run_agent(config))
}

/// Wires up and runs the agent: supervisor loop, discovery and HTTP API.
async fn run_agent(config: Config) -> circo::Result<()> {
    let agent_name = config.agent_name();

    let peers = Arc::new(circo::PeerDirectory::new());
    let audit = Arc::new(circo::AuditLog::new(&config.supervisor.audit_path));
    let notifier = Arc::new(circo::Notifier::new(
        peers.clone(),
        &agent_name,
        config.notify.effective_peer_port(config.server.port),
        Duration::from_millis(config.notify.timeout_ms),
        config.notify.gateway_fallback,
    )?);

    let supervisor = Arc::new(circo::Supervisor::new(
        circo::CatalogStore::new(&config.supervisor.catalog_path),
        Box::new(circo::SystemObserver::new()),
        Box::new(circo::ShellLauncher::new()),
        notifier.clone(),
        audit.clone(),
        Duration::from_secs(config.supervisor.interval_seconds),
    ));

    // Discovery is best-effort: a failure here leaves the agent running
    // with peers learned from inbound requests only.
    let discovery = if config.discovery.enabled {
        match circo::notifier::outward_address() {
            Some(addr) if !addr.is_loopback() => {
                match circo::Discovery::start(&agent_name, addr, config.server.port, peers.clone())
                {
                    Ok(discovery) => Some(discovery),
                    Err(e) => {
                        tracing::warn!(error = %e, "Peer discovery unavailable");
                        None
                    }
                }
            }
            _ => {
                tracing::warn!("No routable local address, peer discovery disabled");
                None
            }
        }
    } else {
        None
    };

    tokio::spawn(supervisor.clone().run());

    let state = Arc::new(circo::server::AppState::new(
        &config,
        supervisor,
        peers,
        audit,
    ));
    let mut server = tokio::spawn(circo::server::serve(state));

    tokio::select! {
        joined = &mut server => {
            match joined {
                Ok(result) => result?,
                Err(e) => {
                    return Err(circo::CircoError::config(format!("Server task failed: {}", e)));
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal");
            notifier.broadcast(circo::EventKind::Shutdown).await;
            if let Some(discovery) = &discovery {
                discovery.shutdown();
            }
            server.abort();
        }
    }

    Ok(())
}

/// Handle the `status` command.
fn cmd_status(cli: &Cli, args: &StatusArgs) -> circo::Result<()> {
    if args.target.is_some() {
        let config = load_config(cli)?;
        let base_url = args.base_url(config.server.port);
        tracing::info!(target = %base_url, "Checking remote agent status");

        let runtime = tokio::runtime::Runtime::new().map_err(|e| {
            circo::CircoError::config_with_source("Failed to create async runtime", e)
        })?;

        runtime.block_on(async {
            let client = circo::CircoClient::new(&base_url)?;
            let status = client.status().await?;

            println!("Agent Status");
            println!("============");
            println!("Name: {}", status.agent.name);
            println!("State: {:?}", status.agent.state);
            println!("Server: {}:{}", status.server.bind, status.server.port);
            println!("Peers: {}", status.peer_count);
            println!("Version: {}", status.version);
            println!("Uptime: {}s", status.uptime_seconds);
            println!("\nStatistics:");
            println!("  Total Requests: {}", status.stats.requests_total);
            println!("  Successful: {}", status.stats.requests_success);
            println!("  Failed: {}", status.stats.requests_failed);

            Ok(())
        })
    } else {
        // Local configuration summary; no running agent required.
        let config = load_config(cli)?;
        let catalog = circo::CatalogStore::new(&config.supervisor.catalog_path).load()?;

        println!("Agent Configuration");
        println!("===================");
        println!("Name: {}", config.agent_name());
        println!("Server: {}:{}", config.server.bind, config.server.port);
        println!("Catalog: {}", config.supervisor.catalog_path.display());
        println!("Interval: {}s", config.supervisor.interval_seconds);
        println!(
            "Discovery: {}",
            if config.discovery.enabled {
                "enabled"
            } else {
                "disabled"
            }
        );

        if !catalog.is_empty() {
            println!("\nConfigured Services:");
            for (name, def) in &catalog {
                println!("  - {} (mode {})", name, def.mode);
            }
        }

        Ok(())
    }
}

/// Handle the `services` command.
fn cmd_services(cli: &Cli, args: &StatusArgs) -> circo::Result<()> {
    let config = load_config(cli)?;
    let base_url = args.base_url(config.server.port);

    let runtime = tokio::runtime::Runtime::new().map_err(|e| {
        circo::CircoError::config_with_source("Failed to create async runtime", e)
    })?;

    runtime.block_on(async {
        let client = circo::CircoClient::new(&base_url)?;
        let data = client.services().await?;

        println!("{} service(s)", data.total);
        for (name, state) in &data.services {
            let running = if state.running { "running" } else { "down" };
            let pids = state
                .process_ids
                .iter()
                .map(|pid| pid.to_string())
                .collect::<Vec<_>>()
                .join(",");

            print!("  {:<24} {:<8} mode={}", name, running, state.mode);
            if !pids.is_empty() {
                print!(" pids={}", pids);
            }
            if let Some(started) = state.last_started {
                print!(" started={}", started.to_rfc3339());
            }
            println!();
        }

        Ok(())
    })
}

/// Handle the `wake` command.
fn cmd_wake(args: &WakeArgs) -> circo::Result<()> {
    if let Some(target) = &args.target {
        let base_url = format!("http://{}", target);
        tracing::info!(target = %base_url, mac = %args.mac, "Relaying wake request");

        let runtime = tokio::runtime::Runtime::new().map_err(|e| {
            circo::CircoError::config_with_source("Failed to create async runtime", e)
        })?;

        runtime.block_on(async {
            let client = circo::CircoClient::new(&base_url)?;
            let data = client.wake(&args.mac).await?;
            println!("Wake packet sent for {} via {}", data.mac, target);
            Ok(())
        })
    } else {
        let mac = circo::wol::MacAddress::parse(&args.mac)?;
        circo::wol::wake(&mac)?;
        println!("Wake packet sent for {}", mac);
        Ok(())
    }
}

/// Handle the `config` subcommand.
fn cmd_config(cli: &Cli, subcmd: &ConfigCommands) -> circo::Result<()> {
    match subcmd {
        ConfigCommands::Validate => {
            let config_path = cli.config.as_deref();
            match Config::load(config_path) {
                Ok(config) => {
                    println!("✓ Configuration is valid");
                    tracing::debug!(?config, "Validated configuration");
                    Ok(())
                }
                Err(e) => {
                    println!("✗ Configuration is invalid: {}", e);
                    Err(e)
                }
            }
        }
        ConfigCommands::Show => {
            let config = load_config(cli)?;
            let yaml = serde_yaml::to_string(&config).map_err(|e| {
                circo::CircoError::config_with_source("Failed to serialize configuration", e)
            })?;
            println!("{}", yaml);
            Ok(())
        }
    }
}

/// Load configuration with error handling.
fn load_config(cli: &Cli) -> circo::Result<Config> {
    let config_path = cli.config.as_deref();
    Config::load(config_path)
}
