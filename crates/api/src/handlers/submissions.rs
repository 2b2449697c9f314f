//! Contest submission endpoint.
//!
//! A token buys exactly one guess. The database transaction in
//! `PgSubmissionRepo::submit` re-checks the token, stores the guess, and marks
//! the token used; this handler only validates input and maps the outcome.
//!
//! ## Status Codes
//!
//! - 200 - Guess stored, body carries `responseId`
//! - 400 - Bad input, unknown token, or token not valid
//! - 409 - Token already used
//! - 429 - Rate limited
//! - 503 - Database unreachable
//!
//! ## Endpoints
//!
//! - POST /api/submit - Redeem a token and record the guess

use axum::{
    Json, Router, debug_handler,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use garde::Validate;
use shared::api::{SubmitPayload, SubmitResponse};

use super::{enforce_rate_limit, json_body};
use crate::{
    error::AppError,
    middleware::client::ClientId,
    models::TokenVerdict,
    repos::{NewSubmission, SubmitOutcome},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/submit", post(submit))
}

/// Record what the store now knows about a token so later validations skip the database.
fn remember_verdict(state: &AppState, token_code: &str, verdict: Option<TokenVerdict>) {
    let cache = &state.stores.token_cache;
    let result = match verdict {
        Some(verdict) => cache.set(token_code, verdict, state.config.cache_ttl()),
        None => cache.delete(token_code),
    };

    if let Err(e) = result {
        tracing::warn!("token cache update failed: {:?}", e);
    }
}

#[debug_handler]
async fn submit(
    client: ClientId,
    State(state): State<AppState>,
    payload: Result<Json<SubmitPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let headers = enforce_rate_limit(&state, &client, "submit")?;

    Ok((headers, record_submission(&state, &client, payload).await))
}

async fn record_submission(
    state: &AppState,
    client: &ClientId,
    payload: Result<Json<SubmitPayload>, JsonRejection>,
) -> Result<Json<SubmitResponse>, AppError> {
    let mut payload = json_body(payload)?;
    payload.normalize();
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let guess = payload
        .guess()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let contest_type = guess.contest_type();
    let submission = NewSubmission {
        token_code: payload.token_code,
        full_name: payload.full_name,
        contact_number: payload.contact_number,
        guess,
    };

    match state.repos.submissions.submit(&submission).await? {
        SubmitOutcome::Accepted { response_id } => {
            remember_verdict(state, &submission.token_code, Some(TokenVerdict::AlreadyUsed));

            tracing::info!(
                response_id = %response_id,
                contest_type = contest_type.as_str(),
                client = %client.0,
                "submission accepted"
            );

            Ok(Json(SubmitResponse {
                message: "Thank you! Your entry has been received.".to_string(),
                response_id: Some(response_id),
            }))
        }
        SubmitOutcome::Rejected(TokenVerdict::AlreadyUsed) => {
            remember_verdict(state, &submission.token_code, Some(TokenVerdict::AlreadyUsed));
            tracing::warn!(client = %client.0, "submission rejected: token already used");

            Err(AppError::External(
                StatusCode::CONFLICT,
                TokenVerdict::AlreadyUsed.message(),
            ))
        }
        SubmitOutcome::Rejected(verdict) => {
            remember_verdict(state, &submission.token_code, None);
            tracing::warn!(client = %client.0, verdict = ?verdict, "submission rejected");

            Err(AppError::External(StatusCode::BAD_REQUEST, verdict.message()))
        }
    }
}
