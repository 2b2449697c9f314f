//! Database repositories (PostgreSQL).
//!
//! Each repository is abstracted behind a trait to enable mocking in tests.
//!
//! ## Repositories
//!
//! - **tokens** - Token lookup by code and bulk seeding
//! - **submissions** - Redeem a token and store the guess in one transaction
//! - **status** - Database connectivity probe for health checks
//!
//! ## Usage in Handlers
//!
//! Repositories are accessed via `state.repos`:
//!
//! ```ignore
//! async fn handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
//!     let token = state.repos.tokens.find_by_code("ABC123").await?;
//!     let outcome = state.repos.submissions.submit(&submission).await?;
//! }
//! ```

mod status;
mod submissions;
mod tokens;

pub use status::{PgStatusRepo, StatusRepo};
pub use submissions::{NewSubmission, PgSubmissionRepo, SubmissionRepo, SubmitOutcome};
pub use tokens::{PgTokenRepo, TokenRepo};

#[cfg(test)]
pub use status::MockStatusRepo;
#[cfg(test)]
pub use submissions::MockSubmissionRepo;
#[cfg(test)]
pub use tokens::MockTokenRepo;

use std::sync::Arc;

/// Collection of all database repositories.
#[derive(Clone)]
pub struct Repos {
    pub tokens: Arc<dyn TokenRepo>,
    pub submissions: Arc<dyn SubmissionRepo>,
    pub status: Arc<dyn StatusRepo>,
}
