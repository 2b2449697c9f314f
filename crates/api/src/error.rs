use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use shared::api::ErrorResponse;

use crate::{handlers::rate_limit_headers, stores::RateLimitDecision};

#[derive(Debug)]
pub enum AppError {
    /// Internal errors - logged but return generic 500 to user
    Internal(anyhow::Error),
    /// Database unreachable - logged, returns 503
    Unavailable(anyhow::Error),
    /// User-facing errors - message is safe to show
    External(StatusCode, &'static str),
    /// Validation errors - safe to show
    Validation(String),
    /// Client exceeded its request budget
    RateLimited(RateLimitDecision),
}

fn json_message(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            message: message.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Internal(err) => {
                tracing::error!("internal error: {:?}", err);
                sentry::capture_error(
                    err.as_ref() as &(dyn std::error::Error + Send + Sync + 'static)
                );

                json_message(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong. Please try again later.",
                )
            }
            AppError::Unavailable(err) => {
                tracing::error!("database unavailable: {:?}", err);

                json_message(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service temporarily unavailable. Please try again shortly.",
                )
            }
            AppError::External(status, msg) => json_message(status, msg),
            AppError::Validation(msg) => json_message(StatusCode::BAD_REQUEST, msg),
            AppError::RateLimited(decision) => {
                let mut response = json_message(
                    StatusCode::TOO_MANY_REQUESTS,
                    "Too many requests. Please try again later.",
                );
                let headers = response.headers_mut();
                headers.extend(rate_limit_headers(&decision));
                headers.insert(
                    RETRY_AFTER,
                    HeaderValue::from(decision.retry_after_secs()),
                );
                response
            }
        }
    }
}

/// Connection-level failures mean the store is down rather than the query being wrong.
fn is_store_unavailable(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<sqlx::Error>(),
        Some(
            sqlx::Error::Io(_)
                | sqlx::Error::Tls(_)
                | sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
        )
    )
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        if is_store_unavailable(&err) {
            Self::Unavailable(err)
        } else {
            Self::Internal(err)
        }
    }
}
