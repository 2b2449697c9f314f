//! Submission repository for PostgreSQL.
//!
//! Redeeming a token and recording the guess happen in one transaction. The
//! token row is locked with `FOR UPDATE`, so two concurrent submissions for the
//! same code serialize: the second one sees `is_used = true`. The unique
//! constraint on `token_id` backs this up if the lock is ever bypassed.

use anyhow::Result;
use async_trait::async_trait;
use shared::api::Guess;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::models::{FlowerResponse, Response, Token, TokenVerdict};

/// A guess to record against a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubmission {
    pub token_code: String,
    pub full_name: String,
    pub contact_number: String,
    pub guess: Guess,
}

/// Result of a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Guess stored and token marked used.
    Accepted { response_id: Uuid },
    /// Token was missing, invalid, or already used; nothing was written.
    Rejected(TokenVerdict),
}

/// Repository for contest submissions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubmissionRepo: Send + Sync {
    /// Atomically redeem the token and store the guess.
    async fn submit(&self, submission: &NewSubmission) -> Result<SubmitOutcome>;
}

/// PostgreSQL implementation of SubmissionRepo.
#[derive(Clone)]
pub struct PgSubmissionRepo {
    pool: Pool<Postgres>,
}

impl PgSubmissionRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl SubmissionRepo for PgSubmissionRepo {
    async fn submit(&self, submission: &NewSubmission) -> Result<SubmitOutcome> {
        let mut tx = self.pool.begin().await?;

        let token = sqlx::query_as::<_, Token>(
            "SELECT * FROM tokens WHERE token_code = $1 FOR UPDATE",
        )
        .bind(&submission.token_code)
        .fetch_optional(&mut *tx)
        .await?;

        let token = match token {
            Some(token) => token,
            None => {
                tx.rollback().await?;
                return Ok(SubmitOutcome::Rejected(TokenVerdict::NotFound));
            }
        };

        let verdict = token.verdict();
        if !verdict.is_valid() {
            tx.rollback().await?;
            return Ok(SubmitOutcome::Rejected(verdict));
        }

        let contest_type = submission.guess.contest_type().as_str();
        let inserted = match &submission.guess {
            Guess::SeedCount(guess) => sqlx::query_as::<_, Response>(
                r#"
                INSERT INTO responses (contest_type, full_name, contact_number, guess, token_id)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
                "#,
            )
            .bind(contest_type)
            .bind(&submission.full_name)
            .bind(&submission.contact_number)
            .bind(guess)
            .bind(token.id)
            .fetch_one(&mut *tx)
            .await
            .map(|response| response.id),
            Guess::FlowerName(name) => sqlx::query_as::<_, FlowerResponse>(
                r#"
                INSERT INTO flower_responses
                    (contest_type, full_name, contact_number, secret_flower_name, token_id)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
                "#,
            )
            .bind(contest_type)
            .bind(&submission.full_name)
            .bind(&submission.contact_number)
            .bind(name)
            .bind(token.id)
            .fetch_one(&mut *tx)
            .await
            .map(|response| response.id),
        };

        let response_id = match inserted {
            Ok(id) => id,
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await?;
                return Ok(SubmitOutcome::Rejected(TokenVerdict::AlreadyUsed));
            }
            Err(e) => return Err(e.into()),
        };

        sqlx::query(
            "UPDATE tokens SET is_used = TRUE, used_at = now(), updated_at = now() WHERE id = $1",
        )
        .bind(token.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(SubmitOutcome::Accepted { response_id })
    }
}
