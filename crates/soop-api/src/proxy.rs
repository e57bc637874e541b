use reqwest::Proxy;

use crate::error::ApiError;

/// Kinds of outbound calls the crate issues. Only the quality-token
/// negotiation is geofenced by source IP; everything else goes direct to
/// keep bulk traffic off the proxy and out of its rate limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Original-quality token negotiation (auth-sensitive).
    QualityAuth,
    /// Channel/station metadata lookup.
    StationMetadata,
    /// Stream assignment (CDN address) lookup.
    StreamAssign,
}

/// Per-call routing decision: the configured endpoint for auth-sensitive
/// calls, direct for everything else.
pub fn proxy_for_call(kind: CallKind, endpoint: Option<&str>) -> Option<&str> {
    match kind {
        CallKind::QualityAuth => endpoint,
        CallKind::StationMetadata | CallKind::StreamAssign => None,
    }
}

/// Build a reqwest proxy from a `scheme://host:port` endpoint string.
///
/// Endpoints without a scheme are assumed to be SOCKS5 (the form a local
/// wireproxy listener is usually given as).
pub fn build_proxy(endpoint: &str) -> Result<Proxy, ApiError> {
    let url = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("socks5://{endpoint}")
    };

    Proxy::all(&url).map_err(|e| ApiError::InvalidProxy(format!("{url}: {e}")))
}
