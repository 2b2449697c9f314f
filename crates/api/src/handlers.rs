//! HTTP handlers.
//!
//! - GET /health - Database connectivity
//! - POST /api/validate-token - Check whether a token code can be redeemed
//! - POST /api/submit - Redeem a token and record the guess

pub mod health;
pub mod submissions;
pub mod tokens;

use axum::{
    Json, Router,
    extract::rejection::JsonRejection,
    http::{HeaderMap, HeaderValue},
};

use crate::{
    error::AppError, middleware::client::ClientId, state::AppState, stores::RateLimitDecision,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/health", health::router())
        .nest("/api", tokens::router().merge(submissions::router()))
}

const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

pub(crate) fn rate_limit_headers(decision: &RateLimitDecision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(
        X_RATELIMIT_RESET,
        HeaderValue::from(decision.retry_after_secs()),
    );
    headers
}

/// Count the request against the client's window for `scope`.
///
/// Returns the rate limit headers to attach to the response, whatever its
/// status. A failing limiter is logged and the request goes through unthrottled.
fn enforce_rate_limit(
    state: &AppState,
    client: &ClientId,
    scope: &str,
) -> Result<HeaderMap, AppError> {
    match state
        .stores
        .rate_limiter
        .check(&client.rate_limit_key(scope))
    {
        Ok(decision) if decision.allowed => Ok(rate_limit_headers(&decision)),
        Ok(decision) => {
            tracing::warn!(client = %client.0, scope, "rate limit exceeded");
            Err(AppError::RateLimited(decision))
        }
        Err(e) => {
            tracing::warn!(scope, "rate limiter failed, allowing request: {:?}", e);
            Ok(HeaderMap::new())
        }
    }
}

/// Unwrap a JSON body, turning malformed input into a 400.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}
