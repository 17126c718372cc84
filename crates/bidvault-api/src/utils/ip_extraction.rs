//! Client address resolution for audit records.
//!
//! Order: `X-Forwarded-For` (skipping `trusted_proxy_count` hops from the
//! right), `X-Real-IP`, then the socket peer. Header values that do not parse
//! as an IP address are ignored.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| client_from_forwarded_for(v, trusted_proxy_count));
    if forwarded.is_some() {
        return forwarded;
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .and_then(parse_ip);
    if real_ip.is_some() {
        return real_ip;
    }

    socket_addr.map(|addr| addr.ip().to_string())
}

/// `X-Forwarded-For: client, proxy1, proxy2`. The last `trusted_proxy_count`
/// entries were appended by our own proxies; the entry before them is the
/// client. Short chains fall back to the hop nearest to us.
fn client_from_forwarded_for(header_value: &str, trusted_proxy_count: usize) -> Option<String> {
    let hops: Vec<&str> = header_value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let index = if trusted_proxy_count == 0 || hops.len() <= trusted_proxy_count {
        hops.len().checked_sub(1)?
    } else {
        hops.len() - trusted_proxy_count - 1
    };

    hops.get(index).copied().and_then(parse_ip)
}

fn parse_ip(value: &str) -> Option<String> {
    value.parse::<IpAddr>().ok().map(|ip| ip.to_string())
}

/// User agent header, if present and valid UTF-8.
pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
