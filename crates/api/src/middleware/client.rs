//! Client identification for rate limiting.
//!
//! Usage: add `ClientId` as an extractor parameter.
//!
//! ```ignore
//! async fn my_handler(client: ClientId, ...) -> ... {
//!     state.stores.rate_limiter.check(&client.rate_limit_key("submit"))?;
//! }
//! ```
//!
//! Forwarding headers are only honoured when `trust_proxy_headers` is set;
//! otherwise any client could pick its own identity.

use std::{convert::Infallible, net::SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};

use crate::state::AppState;

/// Best-effort identity of the caller, usually an IP address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn rate_limit_key(&self, scope: &str) -> String {
        format!("{}:{}", scope, self.0)
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    forwarded_for.or_else(real_ip).map(str::to_string)
}

impl FromRequestParts<AppState> for ClientId {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let forwarded = if state.config.trust_proxy_headers {
            forwarded_ip(&parts.headers)
        } else {
            None
        };

        let peer = || {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        };

        Ok(ClientId(
            forwarded
                .or_else(peer)
                .unwrap_or_else(|| "unknown".to_string()),
        ))
    }
}
