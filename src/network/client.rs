//! Outbound RPC calls.
//!
//! `RpcDispatch` is the seam the discovery coordinator talks through: given
//! a peer address and a method name it hands back an open channel on which
//! the handshake has already been performed. `TcpRpcClient` is the real
//! implementation over plain TCP.

use crate::error::CommunicationError;
use crate::network::message::RpcHeader;
use crate::network::peer_conn::{BoxedStream, PeerConn};
use std::time::Duration;
use tokio::net::TcpStream;

#[async_trait::async_trait]
pub trait RpcDispatch: Send + Sync {
    /// Open a channel to `peer_address` and announce `method` on it.
    async fn call(
        &self,
        peer_address: &str,
        method: &str,
    ) -> Result<PeerConn<BoxedStream>, CommunicationError>;
}

pub struct TcpRpcClient {
    magic: [u8; 4],
    conn_deadline: Duration,
}

impl TcpRpcClient {
    pub fn new(magic: [u8; 4], conn_deadline: Duration) -> Self {
        Self {
            magic,
            conn_deadline,
        }
    }
}

#[async_trait::async_trait]
impl RpcDispatch for TcpRpcClient {
    async fn call(
        &self,
        peer_address: &str,
        method: &str,
    ) -> Result<PeerConn<BoxedStream>, CommunicationError> {
        let stream = tokio::time::timeout(self.conn_deadline, TcpStream::connect(peer_address))
            .await
            .map_err(|_| CommunicationError::Timeout("connecting"))?
            .map_err(|source| CommunicationError::Connect {
                addr: peer_address.to_string(),
                source,
            })?;
        stream.set_nodelay(true)?;

        let remote = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| peer_address.to_string());

        // The deadline covers the handshake and whatever the caller reads next
        let mut conn = PeerConn::new(stream, remote);
        conn.set_deadline(self.conn_deadline);
        conn.write_frame(&RpcHeader::new(self.magic, method)).await?;

        Ok(conn.boxed())
    }
}
