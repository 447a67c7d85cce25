//! Global constants for the peer IP discovery daemon
//!
//! Centralizes protocol magic numbers so the wire format and the discovery
//! defaults live in one place.

/// RPC protocol constants
pub mod rpc {
    /// Method name peers answer with the caller's observed address
    pub const DISCOVER_IP: &str = "DiscoverIP";

    /// Longest textual IP payload accepted from a peer (bytes on the wire)
    pub const MAX_IP_RESPONSE_LEN: u32 = 100;

    /// Ceiling for every other frame (RPC headers)
    pub const MAX_FRAME_SIZE: u32 = 64 * 1024;

    /// Longest method name carried in a handshake
    pub const MAX_METHOD_LEN: usize = 64;
}

/// Discovery defaults per network profile
pub mod discovery {
    use std::time::Duration;

    pub const MAINNET_MIN_PEERS: usize = 5;
    pub const TESTNET_MIN_PEERS: usize = 3;
    pub const DEVNET_MIN_PEERS: usize = 1;

    pub const MAINNET_RETRY_INTERVAL: Duration = Duration::from_secs(10);
    pub const TESTNET_RETRY_INTERVAL: Duration = Duration::from_secs(5);
    pub const DEVNET_RETRY_INTERVAL: Duration = Duration::from_millis(100);

    /// Deadline applied to each peer connection (connect, handshake, exchange)
    pub const MAINNET_CONN_DEADLINE: Duration = Duration::from_secs(300);
    pub const TESTNET_CONN_DEADLINE: Duration = Duration::from_secs(120);
    pub const DEVNET_CONN_DEADLINE: Duration = Duration::from_secs(30);
}

/// Shutdown coordination
pub mod shutdown {
    use std::time::Duration;

    /// How long registered tasks get to finish after ctrl+c
    pub const TASK_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);
}
