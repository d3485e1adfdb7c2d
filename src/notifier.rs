//! Best-effort fan-out of lifecycle events to peer supervisors.
//!
//! Delivery is bounded by a short timeout and every failure is swallowed
//! after logging; a broadcast never fails its caller. Besides the known
//! peers, one heuristic fallback address is tried: the .1 host of the local
//! /24, on the assumption that a controller often lives there. That guess is
//! a convenience, not a correctness mechanism, and is kept isolated here so
//! it can be changed or removed without touching reconciliation logic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{CircoError, Result};
use crate::peers::PeerDirectory;

/// Lifecycle event kinds shared between supervisors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A supervised service was launched.
    Startup,
    /// This supervisor is going away.
    Shutdown,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Startup => write!(f, "startup"),
            EventKind::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Wire format of a lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerEvent {
    /// Event kind.
    pub event: EventKind,
    /// Name of the sending agent.
    pub sender_name: String,
    /// Outward-facing address of the sender.
    pub sender_address: String,
    /// API port of the sender.
    pub sender_port: u16,
}

/// Outbound side of the event fan-out. The supervisor talks to peers
/// through this seam only.
#[async_trait]
pub trait EventBroadcaster: Send + Sync {
    /// Delivers `event` to every reachable peer. Returns the number of
    /// acknowledged deliveries; never fails.
    async fn broadcast(&self, event: EventKind) -> usize;
}

/// Fan-out sender for lifecycle events.
pub struct Notifier {
    client: reqwest::Client,
    peers: Arc<PeerDirectory>,
    agent_name: String,
    peer_port: u16,
    gateway_fallback: bool,
    local_addr_override: Option<IpAddr>,
}

impl Notifier {
    /// Creates a notifier delivering to `peer_port` on every known peer,
    /// with the given per-delivery timeout.
    pub fn new(
        peers: Arc<PeerDirectory>,
        agent_name: impl Into<String>,
        peer_port: u16,
        timeout: Duration,
        gateway_fallback: bool,
    ) -> Result<Self> {
        // A client without the timeout would break the bounded-delivery
        // guarantee, so construction failure is propagated.
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                CircoError::config_with_source("Failed to create notification HTTP client", e)
            })?;

        Ok(Self {
            client,
            peers,
            agent_name: agent_name.into(),
            peer_port,
            gateway_fallback,
            local_addr_override: None,
        })
    }

    /// Pins the local address instead of probing the routing table.
    #[cfg(test)]
    pub fn with_local_address(mut self, addr: IpAddr) -> Self {
        self.local_addr_override = Some(addr);
        self
    }

    /// Attempts a single bounded-timeout delivery.
    async fn deliver(&self, peer: IpAddr, payload: &PeerEvent) -> Result<()> {
        let url = match peer {
            IpAddr::V4(_) => format!("http://{}:{}/api/v1/events", peer, self.peer_port),
            IpAddr::V6(_) => format!("http://[{}]:{}/api/v1/events", peer, self.peer_port),
        };

        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| CircoError::notification(peer.to_string(), e.to_string()))?;

        if response.status().is_success() {
            debug!(%peer, "Peer acknowledged event");
            Ok(())
        } else {
            Err(CircoError::notification(
                peer.to_string(),
                format!("peer rejected event with status {}", response.status()),
            ))
        }
    }
}

/// Broadcasts an event to every known peer plus the fallback address.
/// Delivery failures are logged and swallowed.
#[async_trait]
impl EventBroadcaster for Notifier {
    async fn broadcast(&self, event: EventKind) -> usize {
        let local = match self.local_addr_override.or_else(outward_address) {
            Some(addr) => addr,
            None => {
                warn!("No outward-facing address, skipping broadcast");
                return 0;
            }
        };

        // A host on loopback cannot usefully notify peers of itself.
        if local.is_loopback() {
            debug!(%local, "Local address is loopback, skipping broadcast");
            return 0;
        }

        let payload = PeerEvent {
            event,
            sender_name: self.agent_name.clone(),
            sender_address: local.to_string(),
            sender_port: self.peer_port,
        };

        let mut acked = Vec::new();
        for peer in self.peers.snapshot() {
            match self.deliver(peer, &payload).await {
                Ok(()) => acked.push(peer),
                Err(e) => warn!(%peer, error = %e, "Event delivery failed"),
            }
        }

        if self.gateway_fallback {
            if let Some(fallback) = fallback_address(local) {
                if !acked.contains(&fallback) && !fallback.is_loopback() {
                    match self.deliver(fallback, &payload).await {
                        Ok(()) => acked.push(fallback),
                        Err(e) => debug!(peer = %fallback, error = %e, "Fallback delivery failed"),
                    }
                }
            }
        }

        info!(event = %event, acked = acked.len(), "Broadcast finished");
        acked.len()
    }
}

/// Determines the outward-facing address of this host by asking the routing
/// table which source address a public destination would use. No packet is
/// sent.
pub fn outward_address() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}

/// The "likely gateway/controller" guess: the local IPv4 address with its
/// last octet replaced by 1. None for IPv6 or when the guess is the local
/// address itself.
pub fn fallback_address(local: IpAddr) -> Option<IpAddr> {
    match local {
        IpAddr::V4(v4) => {
            let [a, b, c, _] = v4.octets();
            let guess = Ipv4Addr::new(a, b, c, 1);
            if guess == v4 {
                None
            } else {
                Some(IpAddr::V4(guess))
            }
        }
        IpAddr::V6(_) => None,
    }
}
