//! Token validation endpoint.
//!
//! Lets the page layer check a code before showing the entry form. Verdicts are
//! cached per code for `cache_ttl_secs`, so repeated checks of the same code
//! (valid or not) skip the database until the entry expires. The submission
//! endpoint re-checks the token inside its transaction, so a stale positive
//! verdict can never let a used token through.
//!
//! ## Endpoints
//!
//! - POST /api/validate-token - `{ tokenCode }` → `{ message, valid }`

use axum::{
    Json, Router, debug_handler,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
    routing::post,
};
use garde::Validate;
use shared::api::{ValidateTokenPayload, ValidateTokenResponse};

use super::{enforce_rate_limit, json_body};
use crate::{error::AppError, middleware::client::ClientId, models::TokenVerdict, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/validate-token", post(validate_token))
}

/// Verdict for a normalized token code: cache first, then the database.
/// Cache failures are logged and treated as a miss.
pub(crate) async fn lookup_verdict(
    state: &AppState,
    token_code: &str,
) -> Result<TokenVerdict, AppError> {
    match state.stores.token_cache.get(token_code) {
        Ok(Some(verdict)) => return Ok(verdict),
        Ok(None) => {}
        Err(e) => tracing::warn!("token cache read failed: {:?}", e),
    }

    let verdict = state
        .repos
        .tokens
        .find_by_code(token_code)
        .await?
        .map_or(TokenVerdict::NotFound, |token| token.verdict());

    if let Err(e) = state
        .stores
        .token_cache
        .set(token_code, verdict, state.config.cache_ttl())
    {
        tracing::warn!("token cache write failed: {:?}", e);
    }

    Ok(verdict)
}

#[debug_handler]
async fn validate_token(
    client: ClientId,
    State(state): State<AppState>,
    payload: Result<Json<ValidateTokenPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let headers = enforce_rate_limit(&state, &client, "validate")?;

    Ok((headers, check_token(&state, &client, payload).await))
}

async fn check_token(
    state: &AppState,
    client: &ClientId,
    payload: Result<Json<ValidateTokenPayload>, JsonRejection>,
) -> Result<Json<ValidateTokenResponse>, AppError> {
    let mut payload = json_body(payload)?;
    payload.normalize();
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let verdict = lookup_verdict(state, &payload.token_code).await?;

    tracing::info!(client = %client.0, verdict = ?verdict, "token checked");

    Ok(Json(ValidateTokenResponse {
        message: verdict.message().to_string(),
        valid: verdict.is_valid(),
    }))
}
