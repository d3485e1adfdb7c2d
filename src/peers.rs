//! Peer directory - the set of known peer supervisors.
//!
//! Peers are learned from mDNS discovery and from the source address of
//! inbound API requests. Once admitted, a peer is retained for the life of
//! the process; a dead peer simply times out on every notification attempt.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::RwLock;
use tracing::debug;

use crate::error::{CircoError, Result};

/// Concurrency-safe set of peer addresses, unique by address.
#[derive(Debug, Default)]
pub struct PeerDirectory {
    peers: RwLock<BTreeSet<IpAddr>>,
}

impl PeerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers an address to the directory. Loopback and link-local
    /// addresses are never admitted. Returns true when the address was
    /// newly added.
    pub fn admit(&self, addr: IpAddr) -> bool {
        if !is_admissible(addr) {
            debug!(%addr, "Rejected non-routable peer address");
            return false;
        }

        let mut peers = self.peers.write().expect("peer set lock poisoned");
        let added = peers.insert(addr);
        if added {
            debug!(%addr, "Learned peer");
        }
        added
    }

    /// Like [`admit`](Self::admit), but a non-routable address comes back
    /// as an error the caller can report. Returns true when the address
    /// was newly added.
    pub fn try_admit(&self, addr: IpAddr) -> Result<bool> {
        if !is_admissible(addr) {
            return Err(CircoError::invalid_address(addr));
        }
        Ok(self.admit(addr))
    }

    /// Returns the current peer set.
    pub fn snapshot(&self) -> Vec<IpAddr> {
        self.peers
            .read()
            .expect("peer set lock poisoned")
            .iter()
            .copied()
            .collect()
    }

    /// Number of known peers.
    pub fn len(&self) -> usize {
        self.peers.read().expect("peer set lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Returns true for addresses a peer can plausibly be reached at:
/// loopback, link-local and unspecified addresses are excluded.
pub fn is_admissible(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => !v4.is_loopback() && !v4.is_link_local() && !v4.is_unspecified(),
        IpAddr::V6(v6) => {
            // fe80::/10
            let link_local = (v6.segments()[0] & 0xffc0) == 0xfe80;
            !v6.is_loopback() && !link_local && !v6.is_unspecified()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_admit_routable_address() {
        let directory = PeerDirectory::new();
        assert!(directory.admit(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20))));
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_admit_is_idempotent() {
        let directory = PeerDirectory::new();
        let addr = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20));

        assert!(directory.admit(addr));
        assert!(!directory.admit(addr));
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_loopback_never_admitted() {
        let directory = PeerDirectory::new();
        assert!(!directory.admit(IpAddr::V4(Ipv4Addr::LOCALHOST)));
        assert!(!directory.admit(IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert!(directory.is_empty());
    }

    #[test]
    fn test_link_local_never_admitted() {
        let directory = PeerDirectory::new();
        assert!(!directory.admit(IpAddr::V4(Ipv4Addr::new(169, 254, 10, 1))));
        assert!(!directory.admit(IpAddr::V6("fe80::1".parse().unwrap())));
        assert!(directory.is_empty());
    }

    #[test]
    fn test_unspecified_never_admitted() {
        let directory = PeerDirectory::new();
        assert!(!directory.admit(IpAddr::V4(Ipv4Addr::UNSPECIFIED)));
        assert!(!directory.admit(IpAddr::V6(Ipv6Addr::UNSPECIFIED)));
        assert!(directory.is_empty());
    }

    #[test]
    fn test_snapshot_is_sorted_and_unique() {
        let directory = PeerDirectory::new();
        directory.admit(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 30)));
        directory.admit(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)));
        directory.admit(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 30)));

        let snapshot = directory.snapshot();
        assert_eq!(
            snapshot,
            vec![
                IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
                IpAddr::V4(Ipv4Addr::new(192, 168, 1, 30)),
            ]
        );
    }

    #[test]
    fn test_try_admit_reports_non_routable_address() {
        let directory = PeerDirectory::new();

        let err = directory.try_admit("127.0.0.1".parse().unwrap());
        assert!(matches!(err, Err(CircoError::InvalidAddress { .. })));
        assert!(directory.is_empty());

        assert_eq!(
            directory.try_admit("192.168.1.20".parse().unwrap()).ok(),
            Some(true)
        );
    }

    #[test]
    fn test_is_admissible() {
        assert!(is_admissible("192.168.1.1".parse().unwrap()));
        assert!(is_admissible("2001:db8::1".parse().unwrap()));
        assert!(!is_admissible("127.0.0.1".parse().unwrap()));
        assert!(!is_admissible("169.254.0.5".parse().unwrap()));
        assert!(!is_admissible("::1".parse().unwrap()));
        assert!(!is_admissible("fe80::dead".parse().unwrap()));
        assert!(!is_admissible("0.0.0.0".parse().unwrap()));
    }
}
