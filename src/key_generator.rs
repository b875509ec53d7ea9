//! Client key derivation for throttling.
//!
//! The limiter only ever sees an opaque key string; which parts of a request
//! make up that key is decided here.

use axum::extract::{ConnectInfo, MatchedPath, Request};
use axum::http::HeaderMap;
use std::net::SocketAddr;
use std::str::FromStr;

pub const DEVICE_ID_HEADER: &str = "device-id";

/// The request facts a key may be built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub client_ip: String,
    pub device_id: Option<String>,
    pub route: String,
    pub method: String,
}

impl RequestContext {
    pub fn from_request(request: &Request) -> Self {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0);

        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map(|path| path.as_str().to_string())
            .unwrap_or_else(|| request.uri().path().to_string());

        Self {
            client_ip: extract_client_ip(request.headers(), peer),
            device_id: request
                .headers()
                .get(DEVICE_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
            route,
            method: request.method().as_str().to_string(),
        }
    }
}

/// Turns a request into the key its hits are counted under.
pub trait KeyExtractor: Send + Sync {
    fn extract(&self, ctx: &RequestContext) -> String;
}

/// Strategy for generating throttle keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStrategy {
    /// Client IP address only
    IpAddress,
    /// `device-id` header, falling back to the client IP
    DeviceId,
    /// Client IP, route and HTTP method
    #[default]
    Route,
}

impl KeyExtractor for KeyStrategy {
    fn extract(&self, ctx: &RequestContext) -> String {
        match self {
            KeyStrategy::IpAddress => ctx.client_ip.clone(),
            KeyStrategy::DeviceId => ctx
                .device_id
                .clone()
                .unwrap_or_else(|| ctx.client_ip.clone()),
            KeyStrategy::Route => format!("{}-{}-{}", ctx.client_ip, ctx.route, ctx.method),
        }
    }
}

impl FromStr for KeyStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ip" => Ok(KeyStrategy::IpAddress),
            "device" => Ok(KeyStrategy::DeviceId),
            "route" => Ok(KeyStrategy::Route),
            other => Err(format!(
                "Unknown throttle key strategy '{}'. Must be one of: ip, device, route",
                other
            )),
        }
    }
}

/// Extract client IP from proxy headers, falling back to the peer address.
pub fn extract_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}
