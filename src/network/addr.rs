//! Address validation helpers shared by the responder and the coordinator.

use crate::error::CommunicationError;
use std::net::{IpAddr, SocketAddr};

/// Split a `host:port` endpoint descriptor and return the host part.
///
/// Accepts `1.2.3.4:80`, `[2001:db8::1]:80` and `name:80`. A bare IPv6
/// address without brackets is ambiguous and rejected.
pub fn split_host_port(endpoint: &str) -> Result<String, CommunicationError> {
    if let Ok(sock) = endpoint.parse::<SocketAddr>() {
        return Ok(sock.ip().to_string());
    }

    let invalid = || CommunicationError::InvalidRemoteAddr(endpoint.to_string());

    let (host, port) = if let Some(rest) = endpoint.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
        (host, tail.strip_prefix(':').ok_or_else(invalid)?)
    } else {
        let (host, port) = endpoint.rsplit_once(':').ok_or_else(invalid)?;
        if host.contains(':') {
            return Err(invalid());
        }
        (host, port)
    };

    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    Ok(host.to_string())
}

/// Parse a textual IP answer into its canonical form.
///
/// Surrounding whitespace is ignored and IPv4-mapped IPv6 addresses fold to
/// plain IPv4, so `" ::ffff:203.0.113.5"` and `"203.0.113.5"` count as the
/// same vote.
pub fn parse_canonical_ip(text: &str) -> Result<IpAddr, CommunicationError> {
    text.trim()
        .parse::<IpAddr>()
        .map(|ip| ip.to_canonical())
        .map_err(|_| CommunicationError::MalformedAddress(text.to_string()))
}

/// Append the default port when `address` does not carry one.
pub fn with_default_port(address: &str, port: u16) -> String {
    if split_host_port(address).is_ok() {
        return address.to_string();
    }
    match address.parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) => format!("[{}]:{}", v6, port),
        _ => format!("{}:{}", address, port),
    }
}
