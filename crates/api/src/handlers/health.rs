//! Health check endpoint for load balancers and monitoring.
//!
//! Returns 200 OK if the database is reachable, 503 Service Unavailable otherwise.
//! The in-process cache and rate limiter cannot be unhealthy on their own.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: bool,
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = match state.repos.status.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("health check: database unreachable: {:?}", e);
            false
        }
    };

    let response = HealthResponse {
        status: if db_ok { "ok" } else { "unhealthy" },
        database: db_ok,
    };

    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
