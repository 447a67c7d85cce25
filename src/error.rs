use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single RPC exchange with one peer.
///
/// These never escape the discovery loop: the coordinator turns them into an
/// empty vote, and the server logs them and moves on to the next connection.
#[derive(Error, Debug)]
pub enum CommunicationError {
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Deadline exceeded while {0}")]
    Timeout(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame too large: {len} bytes (max: {max})")]
    FrameTooLarge { len: u32, max: u32 },

    #[error("Codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Unknown RPC method: {0}")]
    UnknownMethod(String),

    #[error("Failed to split host from port in {0:?}")]
    InvalidRemoteAddr(String),

    #[error("Failed to parse ip address {0:?}")]
    MalformedAddress(String),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("interrupted by shutdown")]
    Interrupted,
}
