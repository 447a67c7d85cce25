//! A single RPC channel to one peer.
//!
//! Wraps any async byte stream together with the remote endpoint it came
//! from and an optional absolute deadline. Once a deadline is set every
//! read and write on the channel fails with `CommunicationError::Timeout`
//! after it passes.

use crate::error::CommunicationError;
use crate::network::wire;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;

pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncStream for T {}

/// Type-erased transport, so TCP and in-memory streams share one channel type
pub type BoxedStream = Box<dyn AsyncStream>;

pub struct PeerConn<S> {
    stream: S,
    remote_addr: String,
    deadline: Option<Instant>,
}

impl<S> PeerConn<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, remote_addr: impl Into<String>) -> Self {
        Self {
            stream,
            remote_addr: remote_addr.into(),
            deadline: None,
        }
    }

    /// Endpoint descriptor of the other side, usually `host:port`
    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    /// Fail all further IO once `timeout` has elapsed from now.
    pub fn set_deadline(&mut self, timeout: Duration) {
        self.deadline = Some(Instant::now() + timeout);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub async fn read_string(&mut self, max_len: u32) -> Result<String, CommunicationError> {
        let deadline = self.deadline;
        with_deadline(deadline, "reading", wire::read_string(&mut self.stream, max_len)).await
    }

    pub async fn write_string(&mut self, value: &str) -> Result<(), CommunicationError> {
        let deadline = self.deadline;
        with_deadline(deadline, "writing", wire::write_string(&mut self.stream, value)).await
    }

    pub async fn read_frame<T: DeserializeOwned>(
        &mut self,
        max_len: u32,
    ) -> Result<T, CommunicationError> {
        let deadline = self.deadline;
        with_deadline(deadline, "reading", wire::read_frame(&mut self.stream, max_len)).await
    }

    pub async fn write_frame<T: Serialize + ?Sized>(
        &mut self,
        value: &T,
    ) -> Result<(), CommunicationError> {
        let deadline = self.deadline;
        with_deadline(deadline, "writing", wire::write_frame(&mut self.stream, value)).await
    }
}

impl<S> PeerConn<S>
where
    S: AsyncStream + 'static,
{
    pub fn boxed(self) -> PeerConn<BoxedStream> {
        PeerConn {
            stream: Box::new(self.stream),
            remote_addr: self.remote_addr,
            deadline: self.deadline,
        }
    }
}

async fn with_deadline<T, F>(
    deadline: Option<Instant>,
    what: &'static str,
    fut: F,
) -> Result<T, CommunicationError>
where
    F: Future<Output = Result<T, CommunicationError>>,
{
    match deadline {
        Some(at) => tokio::time::timeout_at(at, fut)
            .await
            .map_err(|_| CommunicationError::Timeout(what))?,
        None => fut.await,
    }
}
