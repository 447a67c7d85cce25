//! Learn our public IP by asking known peers what address they see us
//! connecting from.
//!
//! Each round polls every known peer in parallel and accepts an address only
//! when it holds a strict majority of the successful answers. Anything less
//! (too few peers, too few answers, a split vote) is not an error, just a
//! reason to wait and poll again. The loop has no round limit; shutdown is
//! the only other way out.

use crate::constants::rpc::{DISCOVER_IP, MAX_IP_RESPONSE_LEN};
use crate::error::{CommunicationError, DiscoveryError};
use crate::network::addr::parse_canonical_ip;
use crate::network::client::RpcDispatch;
use crate::network::retry::RetryScheduler;
use crate::peer_manager::PeerSource;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryParams {
    /// Needed both as known peers before polling and as successful answers
    pub min_peers_for_ip_discovery: usize,
    pub peer_discovery_retry_interval: Duration,
    pub conn_std_deadline: Duration,
}

/// Votes collected during one round. Never carried into the next one.
#[derive(Debug, Default)]
pub struct PollRound {
    tally: HashMap<IpAddr, usize>,
    successful_responses: usize,
    peers_queried: usize,
}

impl PollRound {
    /// Count one peer's answer; `None` is a peer that failed to answer.
    pub fn record(&mut self, answer: Option<IpAddr>) {
        self.peers_queried += 1;
        if let Some(ip) = answer {
            *self.tally.entry(ip).or_insert(0) += 1;
            self.successful_responses += 1;
        }
    }

    pub fn successful_responses(&self) -> usize {
        self.successful_responses
    }

    pub fn peers_queried(&self) -> usize {
        self.peers_queried
    }

    pub fn votes_for(&self, ip: &IpAddr) -> usize {
        self.tally.get(ip).copied().unwrap_or(0)
    }

    pub fn total_votes(&self) -> usize {
        self.tally.values().sum()
    }

    /// The address backed by more than half of the successful answers.
    /// At most one address can qualify, so iteration order is irrelevant.
    pub fn majority(&self) -> Option<IpAddr> {
        let half = self.successful_responses / 2;
        self.tally
            .iter()
            .find(|&(_, &count)| count > half)
            .map(|(ip, _)| *ip)
    }

    pub fn evaluate(&self, min_responses: usize) -> RoundOutcome {
        if self.successful_responses < min_responses {
            return RoundOutcome::InsufficientResponses {
                successful: self.successful_responses,
                queried: self.peers_queried,
            };
        }
        match self.majority() {
            Some(ip) => RoundOutcome::Converged(ip),
            None => RoundOutcome::NoMajority {
                candidates: self.tally.len(),
                successful: self.successful_responses,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Fewer known peers than the threshold; nothing was dispatched
    AwaitingPeers { known: usize },
    InsufficientResponses { successful: usize, queried: usize },
    NoMajority { candidates: usize, successful: usize },
    Converged(IpAddr),
}

pub struct IpDiscovery {
    peers: Arc<dyn PeerSource>,
    rpc: Arc<dyn RpcDispatch>,
    params: DiscoveryParams,
    shutdown: CancellationToken,
    scheduler: RetryScheduler,
}

impl IpDiscovery {
    pub fn new(
        peers: Arc<dyn PeerSource>,
        rpc: Arc<dyn RpcDispatch>,
        params: DiscoveryParams,
        shutdown: CancellationToken,
    ) -> Self {
        let scheduler = RetryScheduler::new(params.peer_discovery_retry_interval, shutdown.clone());
        Self {
            peers,
            rpc,
            params,
            shutdown,
            scheduler,
        }
    }

    /// Poll peers until a majority agrees on our address or shutdown fires.
    pub async fn discover_external_ip(&self) -> Result<IpAddr, DiscoveryError> {
        let mut round_no: u64 = 0;
        loop {
            if self.shutdown.is_cancelled() {
                return Err(DiscoveryError::Interrupted);
            }
            round_no += 1;

            match self.poll_round().await {
                RoundOutcome::Converged(ip) => {
                    info!("🌐 IP successfully discovered using peers: {}", ip);
                    return Ok(ip);
                }
                RoundOutcome::AwaitingPeers { known } => {
                    debug!(
                        "IP discovery round {}: {} known peer(s), need {}",
                        round_no, known, self.params.min_peers_for_ip_discovery
                    );
                }
                RoundOutcome::InsufficientResponses { successful, queried } => {
                    debug!(
                        "IP discovery round {}: {}/{} peer(s) answered, need {}",
                        round_no, successful, queried, self.params.min_peers_for_ip_discovery
                    );
                }
                RoundOutcome::NoMajority {
                    candidates,
                    successful,
                } => {
                    debug!(
                        "IP discovery round {}: no majority among {} answer(s) for {} address(es)",
                        round_no, successful, candidates
                    );
                }
            }

            self.scheduler.wait_and_retry().await;
        }
    }

    /// Run one snapshot → fan-out → collect → evaluate cycle.
    pub async fn poll_round(&self) -> RoundOutcome {
        let peers = self.peers.snapshot().await;
        if peers.len() < self.params.min_peers_for_ip_discovery {
            return RoundOutcome::AwaitingPeers { known: peers.len() };
        }

        let mut tasks = JoinSet::new();
        for peer in peers {
            let rpc = self.rpc.clone();
            let deadline = self.params.conn_std_deadline;
            tasks.spawn(async move { query_peer(rpc.as_ref(), &peer.address, deadline).await });
        }

        // Drain every task, even if shutdown fires meanwhile
        let mut round = PollRound::default();
        while let Some(joined) = tasks.join_next().await {
            let answer = joined.unwrap_or_else(|e| {
                debug!("IP discovery task failed: {}", e);
                None
            });
            round.record(answer);
        }
        debug_assert_eq!(round.total_votes(), round.successful_responses());
        debug_assert!(round.successful_responses() <= round.peers_queried());

        round.evaluate(self.params.min_peers_for_ip_discovery)
    }
}

/// Ask one peer for our address; every failure becomes `None`.
async fn query_peer(rpc: &dyn RpcDispatch, address: &str, deadline: Duration) -> Option<IpAddr> {
    let result = tokio::time::timeout(deadline, ask_peer(rpc, address))
        .await
        .unwrap_or(Err(CommunicationError::Timeout("waiting for peer")));

    match result {
        Ok(ip) => Some(ip),
        Err(e) => {
            debug!("Failed to receive ip address from {}: {}", address, e);
            None
        }
    }
}

async fn ask_peer(rpc: &dyn RpcDispatch, address: &str) -> Result<IpAddr, CommunicationError> {
    let mut conn = rpc.call(address, DISCOVER_IP).await?;
    let reported = conn.read_string(MAX_IP_RESPONSE_LEN).await?;
    parse_canonical_ip(&reported)
}
