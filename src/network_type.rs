use crate::constants::discovery::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum NetworkType {
    Mainnet,
    Testnet,
    Devnet,
}

impl NetworkType {
    pub fn magic_bytes(&self) -> [u8; 4] {
        match self {
            NetworkType::Mainnet => [0x50, 0x49, 0x50, 0x4D], // "PIPM"
            NetworkType::Testnet => [0x50, 0x49, 0x50, 0x54], // "PIPT"
            NetworkType::Devnet => [0x50, 0x49, 0x50, 0x44],  // "PIPD"
        }
    }

    pub fn default_p2p_port(&self) -> u16 {
        match self {
            NetworkType::Mainnet => 9981,
            NetworkType::Testnet => 9991,
            NetworkType::Devnet => 9971,
        }
    }

    /// Peers required both before polling and among successful answers
    pub fn min_peers_for_ip_discovery(&self) -> usize {
        match self {
            NetworkType::Mainnet => MAINNET_MIN_PEERS,
            NetworkType::Testnet => TESTNET_MIN_PEERS,
            NetworkType::Devnet => DEVNET_MIN_PEERS,
        }
    }

    pub fn peer_discovery_retry_interval(&self) -> Duration {
        match self {
            NetworkType::Mainnet => MAINNET_RETRY_INTERVAL,
            NetworkType::Testnet => TESTNET_RETRY_INTERVAL,
            NetworkType::Devnet => DEVNET_RETRY_INTERVAL,
        }
    }

    pub fn conn_std_deadline(&self) -> Duration {
        match self {
            NetworkType::Mainnet => MAINNET_CONN_DEADLINE,
            NetworkType::Testnet => TESTNET_CONN_DEADLINE,
            NetworkType::Devnet => DEVNET_CONN_DEADLINE,
        }
    }
}

impl std::fmt::Display for NetworkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkType::Mainnet => write!(f, "Mainnet"),
            NetworkType::Testnet => write!(f, "Testnet"),
            NetworkType::Devnet => write!(f, "Devnet"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_have_distinct_magic() {
        let nets = [NetworkType::Mainnet, NetworkType::Testnet, NetworkType::Devnet];
        for (i, a) in nets.iter().enumerate() {
            for b in nets.iter().skip(i + 1) {
                assert_ne!(a.magic_bytes(), b.magic_bytes());
            }
        }
    }

    #[test]
    fn test_mainnet_is_most_conservative() {
        assert!(
            NetworkType::Mainnet.min_peers_for_ip_discovery()
                > NetworkType::Devnet.min_peers_for_ip_discovery()
        );
        assert!(
            NetworkType::Mainnet.peer_discovery_retry_interval()
                > NetworkType::Devnet.peer_discovery_retry_interval()
        );
    }
}
