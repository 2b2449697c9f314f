//! Token repository for PostgreSQL.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::models::Token;

/// Repository for token lookups and seeding.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRepo: Send + Sync {
    /// Find a token by its (normalized) code.
    async fn find_by_code(&self, token_code: &str) -> Result<Option<Token>>;

    /// Insert new valid, unused tokens. Codes that already exist are skipped.
    /// Returns the codes that were actually inserted.
    async fn create_many(&self, token_codes: &[String]) -> Result<Vec<String>>;
}

/// PostgreSQL implementation of TokenRepo.
#[derive(Clone)]
pub struct PgTokenRepo {
    pool: Pool<Postgres>,
}

impl PgTokenRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepo for PgTokenRepo {
    async fn find_by_code(&self, token_code: &str) -> Result<Option<Token>> {
        let token = sqlx::query_as::<_, Token>("SELECT * FROM tokens WHERE token_code = $1")
            .bind(token_code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(token)
    }

    async fn create_many(&self, token_codes: &[String]) -> Result<Vec<String>> {
        let inserted = sqlx::query_scalar::<_, String>(
            r#"
            INSERT INTO tokens (token_code)
            SELECT * FROM UNNEST($1::text[])
            ON CONFLICT (token_code) DO NOTHING
            RETURNING token_code
            "#,
        )
        .bind(token_codes)
        .fetch_all(&self.pool)
        .await?;
        Ok(inserted)
    }
}
