//! Peer-assisted discovery of a node's public IP address.
//!
//! The daemon binary (main.rs) wires these modules together; integration
//! tests drive them directly.

pub mod config;
pub mod constants;
pub mod error;
pub mod network;
pub mod network_type;
pub mod peer_manager;
pub mod shutdown;
