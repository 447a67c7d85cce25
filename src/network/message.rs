use crate::constants::rpc::MAX_METHOD_LEN;
use crate::error::CommunicationError;
use serde::{Deserialize, Serialize};

/// First frame of every RPC connection, sent by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcHeader {
    pub magic: [u8; 4],
    pub method: String,
}

impl RpcHeader {
    pub fn new(magic: [u8; 4], method: &str) -> Self {
        Self {
            magic,
            method: method.to_string(),
        }
    }

    /// Check the header against the network we serve.
    pub fn validate(&self, expected_magic: [u8; 4]) -> Result<(), CommunicationError> {
        if self.magic != expected_magic {
            return Err(CommunicationError::Handshake(format!(
                "wrong network magic {:02x?}",
                self.magic
            )));
        }
        if self.method.is_empty() || self.method.len() > MAX_METHOD_LEN {
            return Err(CommunicationError::Handshake(format!(
                "invalid method name length {}",
                self.method.len()
            )));
        }
        Ok(())
    }
}
