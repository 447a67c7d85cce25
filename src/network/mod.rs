pub mod addr;
pub mod client;
pub mod ip_discovery;
pub mod ip_responder;
pub mod message;
pub mod peer_conn;
pub mod retry;
pub mod server;
pub mod wire;
