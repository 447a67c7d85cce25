//! End-to-end IP discovery over loopback TCP.
//!
//! Real `RpcServer`s answer `DiscoverIP`, a real `TcpRpcClient` polls them,
//! and every caller connects from 127.0.0.1, so that is the address the
//! peers must agree on.

use peerip::constants::rpc::{DISCOVER_IP, MAX_IP_RESPONSE_LEN};
use peerip::error::DiscoveryError;
use peerip::network::client::{RpcDispatch, TcpRpcClient};
use peerip::network::ip_discovery::{DiscoveryParams, IpDiscovery, RoundOutcome};
use peerip::network::ip_responder::DiscoverIpHandler;
use peerip::network::server::RpcServer;
use peerip::network_type::NetworkType;
use peerip::peer_manager::{Peer, PeerManager};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const MAGIC: [u8; 4] = *b"PIPD";

async fn spawn_responder(token: &CancellationToken) -> String {
    let mut server = RpcServer::bind("127.0.0.1:0", MAGIC, Duration::from_secs(2))
        .await
        .unwrap();
    server.register_rpc(
        DISCOVER_IP,
        Arc::new(DiscoverIpHandler::new(Duration::from_secs(2))),
    );
    let addr = server.local_addr().unwrap().to_string();
    tokio::spawn(server.run(token.clone()));
    addr
}

/// An address with nothing listening on it
async fn dead_address() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);
    addr
}

fn params(min_peers: usize) -> DiscoveryParams {
    DiscoveryParams {
        min_peers_for_ip_discovery: min_peers,
        peer_discovery_retry_interval: Duration::from_millis(50),
        conn_std_deadline: Duration::from_secs(2),
    }
}

async fn discovery_for(
    addrs: &[String],
    min_peers: usize,
    token: &CancellationToken,
) -> (IpDiscovery, Arc<PeerManager>) {
    let peers = Arc::new(PeerManager::with_bootstrap_peers(addrs, 9971).await);
    let rpc = Arc::new(TcpRpcClient::new(MAGIC, Duration::from_secs(2)));
    let discovery = IpDiscovery::new(peers.clone(), rpc, params(min_peers), token.clone());
    (discovery, peers)
}

#[tokio::test]
async fn test_responder_reports_loopback_without_port() {
    let token = CancellationToken::new();
    let addr = spawn_responder(&token).await;

    let client = TcpRpcClient::new(MAGIC, Duration::from_secs(2));
    let mut conn = client.call(&addr, DISCOVER_IP).await.unwrap();
    let reply = conn.read_string(MAX_IP_RESPONSE_LEN).await.unwrap();

    assert_eq!(reply, "127.0.0.1");
    token.cancel();
}

#[tokio::test]
async fn test_discovers_loopback_from_three_peers() {
    let token = CancellationToken::new();
    let mut addrs = Vec::new();
    for _ in 0..3 {
        addrs.push(spawn_responder(&token).await);
    }

    let (discovery, _peers) = discovery_for(&addrs, 3, &token).await;
    let found = tokio::time::timeout(Duration::from_secs(10), discovery.discover_external_ip())
        .await
        .expect("discovery should converge")
        .unwrap();

    assert_eq!(found, IpAddr::V4(Ipv4Addr::LOCALHOST));
    token.cancel();
}

#[tokio::test]
async fn test_unreachable_peer_does_not_block_majority() {
    let token = CancellationToken::new();
    let mut addrs = Vec::new();
    for _ in 0..3 {
        addrs.push(spawn_responder(&token).await);
    }
    addrs.push(dead_address().await);

    let (discovery, _peers) = discovery_for(&addrs, 3, &token).await;
    assert_eq!(
        discovery.poll_round().await,
        RoundOutcome::Converged(IpAddr::V4(Ipv4Addr::LOCALHOST))
    );
    token.cancel();
}

#[tokio::test]
async fn test_too_few_answers_retries_until_shutdown() {
    let token = CancellationToken::new();
    let addrs = vec![
        spawn_responder(&token).await,
        spawn_responder(&token).await,
        dead_address().await,
    ];

    let (discovery, _peers) = discovery_for(&addrs, 3, &token).await;
    assert_eq!(
        discovery.poll_round().await,
        RoundOutcome::InsufficientResponses {
            successful: 2,
            queried: 3
        }
    );

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        canceller.cancel();
    });
    let result = tokio::time::timeout(Duration::from_secs(10), discovery.discover_external_ip())
        .await
        .expect("discovery should stop on shutdown");
    assert_eq!(result, Err(DiscoveryError::Interrupted));
}

#[tokio::test]
async fn test_peers_joining_later_are_picked_up() {
    let token = CancellationToken::new();
    let first = vec![spawn_responder(&token).await];

    let (discovery, peers) = discovery_for(&first, 2, &token).await;
    assert_eq!(discovery.poll_round().await, RoundOutcome::AwaitingPeers { known: 1 });

    let late = spawn_responder(&token).await;
    assert!(peers.add_peer(Peer::new(late)).await);

    let found = tokio::time::timeout(Duration::from_secs(10), discovery.discover_external_ip())
        .await
        .expect("discovery should converge once enough peers are known")
        .unwrap();
    assert_eq!(found, IpAddr::V4(Ipv4Addr::LOCALHOST));
    token.cancel();
}

#[tokio::test]
async fn test_other_network_peers_never_vote() {
    let token = CancellationToken::new();
    let addrs = vec![spawn_responder(&token).await, spawn_responder(&token).await];

    let peers = Arc::new(PeerManager::with_bootstrap_peers(&addrs, 9971).await);
    let rpc = Arc::new(TcpRpcClient::new(
        NetworkType::Mainnet.magic_bytes(),
        Duration::from_secs(2),
    ));
    let discovery = IpDiscovery::new(peers, rpc, params(1), token.clone());

    assert_eq!(
        discovery.poll_round().await,
        RoundOutcome::InsufficientResponses {
            successful: 0,
            queried: 2
        }
    );
    token.cancel();
}
