//! Known-peer list.
//!
//! Discovery only ever reads this through `PeerSource::snapshot`, taken
//! under a read lock once per round. Adding and removing peers belongs to
//! whatever owns the connection layer; the daemon seeds it from the
//! configured bootstrap peers.

use crate::network::addr::with_default_port;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub address: String,
    #[serde(default)]
    pub id: Option<String>,
}

impl Peer {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            id: None,
        }
    }
}

#[async_trait::async_trait]
pub trait PeerSource: Send + Sync {
    /// Point-in-time copy of the currently known peers
    async fn snapshot(&self) -> Vec<Peer>;
}

pub struct PeerManager {
    peers: Arc<RwLock<Vec<Peer>>>,
    default_port: u16,
}

impl PeerManager {
    pub fn new(default_port: u16) -> Self {
        Self {
            peers: Arc::new(RwLock::new(Vec::new())),
            default_port,
        }
    }

    /// Build a manager pre-populated with `addresses`.
    pub async fn with_bootstrap_peers(addresses: &[String], default_port: u16) -> Self {
        let manager = Self::new(default_port);
        let mut added = 0;
        for address in addresses {
            if manager.add_peer(Peer::new(address.clone())).await {
                added += 1;
            }
        }
        debug!("Seeded {} bootstrap peer(s)", added);
        manager
    }

    /// Add a peer; returns false for blank or already-known addresses.
    pub async fn add_peer(&self, mut peer: Peer) -> bool {
        let address = peer.address.trim();
        if address.is_empty() {
            return false;
        }
        peer.address = with_default_port(address, self.default_port);

        let mut peers = self.peers.write().await;
        if peers.iter().any(|p| p.address == peer.address) {
            return false;
        }
        peers.push(peer);
        true
    }

    pub async fn remove_peer(&self, address: &str) -> bool {
        let address = with_default_port(address.trim(), self.default_port);
        let mut peers = self.peers.write().await;
        let before = peers.len();
        peers.retain(|p| p.address != address);
        peers.len() != before
    }

    pub async fn peer_count(&self) -> usize {
        self.peers.read().await.len()
    }
}

#[async_trait::async_trait]
impl PeerSource for PeerManager {
    async fn snapshot(&self) -> Vec<Peer> {
        self.peers.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bootstrap_normalizes_and_dedups() {
        let addrs = vec![
            "198.51.100.1".to_string(),
            "198.51.100.1:9981".to_string(),
            "  ".to_string(),
            "198.51.100.2:4000".to_string(),
        ];
        let manager = PeerManager::with_bootstrap_peers(&addrs, 9981).await;

        let snapshot = manager.snapshot().await;
        let addresses: Vec<_> = snapshot.iter().map(|p| p.address.as_str()).collect();
        assert_eq!(addresses, vec!["198.51.100.1:9981", "198.51.100.2:4000"]);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached_copy() {
        let manager = PeerManager::new(9981);
        manager.add_peer(Peer::new("198.51.100.1")).await;

        let snapshot = manager.snapshot().await;
        manager.add_peer(Peer::new("198.51.100.2")).await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(manager.peer_count().await, 2);
    }

    #[tokio::test]
    async fn test_remove_peer() {
        let manager = PeerManager::new(9981);
        manager.add_peer(Peer::new("198.51.100.1")).await;
        assert!(manager.remove_peer("198.51.100.1").await);
        assert!(!manager.remove_peer("198.51.100.1").await);
        assert_eq!(manager.peer_count().await, 0);
    }
}
