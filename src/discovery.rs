//! mDNS peer discovery.
//!
//! Each agent advertises itself as `_circo._tcp.local.` and browses for the
//! same type, feeding resolved addresses into the peer directory. Discovery
//! is best-effort: a failure to start it is reported once and the agent
//! carries on with whatever peers it learns from inbound requests.

use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{CircoError, Result};
use crate::peers::PeerDirectory;

/// Service type under which agents advertise and browse.
pub const SERVICE_TYPE: &str = "_circo._tcp.local.";

/// Handle to the running mDNS daemon. Dropping it without calling
/// [`Discovery::shutdown`] leaves the advertisement to expire on its own.
pub struct Discovery {
    daemon: ServiceDaemon,
    registered: ServiceInfo,
}

impl Discovery {
    /// Registers this agent and spawns the browse task feeding `peers`.
    pub fn start(
        agent_name: &str,
        address: IpAddr,
        port: u16,
        peers: Arc<PeerDirectory>,
    ) -> Result<Self> {
        let daemon = ServiceDaemon::new()
            .map_err(|e| CircoError::discovery(format!("daemon start failed: {e}")))?;

        let hostname = format!("{agent_name}.local.");
        let txt_records = HashMap::from([("name".to_string(), agent_name.to_string())]);

        let service_info = ServiceInfo::new(
            SERVICE_TYPE,
            agent_name,
            &hostname,
            address,
            port,
            txt_records,
        )
        .map_err(|e| CircoError::discovery(format!("invalid service info: {e}")))?;

        daemon
            .register(service_info.clone())
            .map_err(|e| CircoError::discovery(format!("register failed: {e}")))?;
        info!(instance = %service_info.get_fullname(), port, "Advertising agent");

        let receiver = daemon
            .browse(SERVICE_TYPE)
            .map_err(|e| CircoError::discovery(format!("browse failed: {e}")))?;

        let own_fullname = service_info.get_fullname().to_string();
        tokio::spawn(async move {
            loop {
                match receiver.recv_async().await {
                    Ok(ServiceEvent::ServiceResolved(info)) => {
                        if info.get_fullname() == own_fullname {
                            continue;
                        }
                        for addr in info.get_addresses() {
                            match peers.try_admit(*addr) {
                                Ok(true) => {
                                    info!(peer = %addr, instance = %info.get_fullname(),
                                        "Discovered peer agent");
                                }
                                Ok(false) => {}
                                Err(e) => {
                                    debug!(error = %e, "Ignoring resolved peer address");
                                }
                            }
                        }
                    }
                    Ok(ServiceEvent::ServiceRemoved(_, fullname)) => {
                        // Peers are retained once learned; removal only logged.
                        debug!(instance = %fullname, "Peer advertisement withdrawn");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "mDNS browse channel closed");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            daemon,
            registered: service_info,
        })
    }

    /// Withdraws the advertisement. Errors are logged, not raised; this runs
    /// on shutdown where there is nothing left to recover.
    pub fn shutdown(&self) {
        if let Err(e) = self.daemon.unregister(self.registered.get_fullname()) {
            warn!(error = %e, "mDNS unregister failed");
        } else {
            info!(instance = %self.registered.get_fullname(), "Advertisement withdrawn");
        }
    }
}
