//! Server side of `DiscoverIP`: tell the caller which address we saw it
//! connect from. This is what lets peers learn their public IP without a
//! central echo service.

use crate::error::CommunicationError;
use crate::network::addr::split_host_port;
use crate::network::peer_conn::{BoxedStream, PeerConn};
use crate::network::server::RpcHandler;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

/// Write the host part of the caller's endpoint back over `conn`.
pub async fn respond_with_peer_ip<S>(
    conn: &mut PeerConn<S>,
    deadline: Duration,
) -> Result<(), CommunicationError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    conn.set_deadline(deadline);
    let host = split_host_port(conn.remote_addr())?;
    conn.write_string(&host).await
}

pub struct DiscoverIpHandler {
    deadline: Duration,
}

impl DiscoverIpHandler {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }
}

#[async_trait::async_trait]
impl RpcHandler for DiscoverIpHandler {
    async fn handle(&self, conn: &mut PeerConn<BoxedStream>) -> Result<(), CommunicationError> {
        respond_with_peer_ip(conn, self.deadline).await
    }
}
