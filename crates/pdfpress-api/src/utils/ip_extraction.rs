//! IP address extraction utilities
//!
//! Resolves the client address used to key the login throttle. Forwarding headers are
//! only honoured when a trusted proxy count is configured.

use crate::state::AppState;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// Key used when neither a trusted forwarding header nor a socket address is available.
///
/// Every such request shares one login-throttle bucket.
pub const UNKNOWN_CLIENT_IP: &str = "unknown";

/// Client address as resolved by [`extract_client_ip`]
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

impl FromRequestParts<Arc<AppState>> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let socket_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientIp(extract_client_ip(
            &parts.headers,
            socket_addr.as_ref(),
            state.config.trusted_proxy_count(),
        )))
    }
}

/// Extract and validate client IP from request headers
///
/// # Arguments
/// * `headers` - HTTP request headers
/// * `socket_addr` - Direct socket address (used when headers are not trusted)
/// * `trusted_proxy_count` - Number of trusted proxies/load balancers in front
///
/// # Returns
/// Validated client IP address as a string, or "unknown" if extraction fails
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> String {
    if trusted_proxy_count > 0 {
        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| extract_from_forwarded_for(v, trusted_proxy_count))
        {
            return ip;
        }
    }

    if let Some(addr) = socket_addr {
        return addr.ip().to_string();
    }

    UNKNOWN_CLIENT_IP.to_string()
}

/// Each trusted proxy appends the address it received the request from, so with N
/// trusted proxies the client is the Nth entry from the right. Anything further left
/// was written by the client and is ignored. A chain shorter than N did not pass
/// through every proxy; the caller falls back to the socket address.
fn extract_from_forwarded_for(header_value: &str, trusted_proxy_count: usize) -> Option<String> {
    let ips: Vec<&str> = header_value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    if trusted_proxy_count == 0 || ips.len() < trusted_proxy_count {
        return None;
    }

    ips[ips.len() - trusted_proxy_count]
        .parse::<IpAddr>()
        .ok()
        .map(|ip| ip.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn create_headers_with_xff(xff_value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_str(xff_value).expect("header value"),
        );
        headers
    }

    #[test]
    fn test_forwarded_for_with_one_proxy() {
        assert_eq!(
            extract_from_forwarded_for("203.0.113.7", 1),
            Some("203.0.113.7".to_string())
        );
    }

    #[test]
    fn test_forwarded_for_ignores_client_supplied_entries() {
        // The client sent "1.2.3.4"; the proxy appended the real peer
        assert_eq!(
            extract_from_forwarded_for("1.2.3.4, 203.0.113.7", 1),
            Some("203.0.113.7".to_string())
        );
    }

    #[test]
    fn test_forwarded_for_multiple_proxies() {
        // Outer proxy saw the client at 203.0.113.9 and the inner proxy saw 10.0.0.1
        assert_eq!(
            extract_from_forwarded_for("6.6.6.6, 203.0.113.9, 10.0.0.1", 2),
            Some("203.0.113.9".to_string())
        );
    }

    #[test]
    fn test_forwarded_for_short_chain_is_rejected() {
        assert_eq!(extract_from_forwarded_for("192.168.1.1", 2), None);
    }

    #[test]
    fn test_forwarded_for_invalid_ip() {
        assert_eq!(extract_from_forwarded_for("10.0.0.1, not.an.ip", 1), None);
    }

    #[test]
    fn test_headers_ignored_without_trusted_proxies() {
        let headers = create_headers_with_xff("192.168.1.1");
        let socket = SocketAddr::from(([127, 0, 0, 1], 8080));
        assert_eq!(extract_client_ip(&headers, Some(&socket), 0), "127.0.0.1");
    }

    #[test]
    fn test_headers_used_with_trusted_proxy() {
        let headers = create_headers_with_xff("1.2.3.4, 203.0.113.7");
        let socket = SocketAddr::from(([10, 0, 0, 1], 8080));
        assert_eq!(extract_client_ip(&headers, Some(&socket), 1), "203.0.113.7");
    }

    #[test]
    fn test_short_chain_falls_back_to_socket() {
        let headers = create_headers_with_xff("203.0.113.7");
        let socket = SocketAddr::from(([10, 0, 0, 1], 8080));
        assert_eq!(extract_client_ip(&headers, Some(&socket), 2), "10.0.0.1");
    }

    #[test]
    fn test_fallback_to_unknown() {
        assert_eq!(
            extract_client_ip(&HeaderMap::new(), None, 0),
            UNKNOWN_CLIENT_IP
        );
    }
}
