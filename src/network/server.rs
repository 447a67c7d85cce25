//! Inbound RPC server.
//!
//! Accepts TCP connections, reads the `RpcHeader` handshake and hands the
//! channel to whichever `RpcHandler` is registered for the method. Every
//! connection runs in its own task; a failing exchange is logged and never
//! takes the accept loop down with it.

use crate::constants::rpc::MAX_FRAME_SIZE;
use crate::error::CommunicationError;
use crate::network::message::RpcHeader;
use crate::network::peer_conn::{BoxedStream, PeerConn};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

#[async_trait::async_trait]
pub trait RpcHandler: Send + Sync {
    async fn handle(&self, conn: &mut PeerConn<BoxedStream>) -> Result<(), CommunicationError>;
}

pub struct RpcServer {
    listener: TcpListener,
    handlers: HashMap<String, Arc<dyn RpcHandler>>,
    magic: [u8; 4],
    handshake_deadline: Duration,
}

impl RpcServer {
    pub async fn bind(
        bind_addr: &str,
        magic: [u8; 4],
        handshake_deadline: Duration,
    ) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind(bind_addr).await?;

        Ok(Self {
            listener,
            handlers: HashMap::new(),
            magic,
            handshake_deadline,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    /// Register `handler` for `method`, replacing any earlier registration.
    pub fn register_rpc(&mut self, method: &str, handler: Arc<dyn RpcHandler>) {
        if self.handlers.insert(method.to_string(), handler).is_some() {
            tracing::warn!("RPC handler for {} replaced", method);
        }
    }

    /// Accept connections until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), std::io::Error> {
        let handlers = Arc::new(self.handlers);

        loop {
            let (stream, addr) = tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!("RPC server stopping");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        // Transient (e.g. EMFILE); keep serving
                        tracing::warn!("⚠️  Failed to accept connection: {}", e);
                        continue;
                    }
                },
            };

            let handlers = handlers.clone();
            let magic = self.magic;
            let deadline = self.handshake_deadline;

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, &handlers, magic, deadline).await {
                    tracing::debug!("RPC from {} failed: {}", addr, e);
                }
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    handlers: &HashMap<String, Arc<dyn RpcHandler>>,
    magic: [u8; 4],
    handshake_deadline: Duration,
) -> Result<(), CommunicationError> {
    let mut conn = PeerConn::new(stream, addr.to_string());
    conn.set_deadline(handshake_deadline);

    let header: RpcHeader = conn.read_frame(MAX_FRAME_SIZE).await?;
    header.validate(magic)?;

    let handler = handlers
        .get(&header.method)
        .ok_or_else(|| CommunicationError::UnknownMethod(header.method.clone()))?;

    tracing::trace!("RPC {} from {}", header.method, addr);
    let mut conn = conn.boxed();
    handler.handle(&mut conn).await
}
