//! Shared test utilities for API handler tests.
//!
//! Provides mock factories, an in-memory contest database, and a flexible
//! `TestStateBuilder` for constructing `AppState` with only the pieces each test needs.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::test_utils::{TestStateBuilder, mock_token};
//!
//! let mut token_repo = MockTokenRepo::new();
//! token_repo.expect_find_by_code().returning(|_| Ok(Some(mock_token("ABC123"))));
//!
//! let state = TestStateBuilder::new()
//!     .with_token_repo(token_repo)
//!     .build();
//! ```

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{Token, TokenVerdict};
use crate::repos::{
    MockStatusRepo, MockSubmissionRepo, MockTokenRepo, NewSubmission, Repos, StatusRepo,
    SubmissionRepo, SubmitOutcome, TokenRepo,
};
use crate::state::AppState;
use crate::stores::{MockRateLimiter, RateLimitDecision, RateLimiter, Stores, TokenCache, TtlCache};

/// Creates a test configuration with dummy values.
pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 3000,
        database_url: "postgres://test".to_string(),
        db_max_connections: 1,
        env: "test".to_string(),
        sentry_dsn: None,
        cache_ttl_secs: 300,
        cache_max_entries: 100,
        cache_sweep_secs: 60,
        rate_limit_max_requests: 10,
        rate_limit_window_secs: 60,
        rate_limit_max_clients: 100,
        trust_proxy_headers: false,
        cors_allowed_origins: None,
    }
}

/// Creates a valid, unused token with the given code.
pub fn mock_token(code: &str) -> Token {
    Token {
        id: Uuid::new_v4(),
        token_code: code.to_string(),
        is_valid: true,
        is_used: false,
        used_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Creates a token that has already been redeemed.
pub fn mock_used_token(code: &str) -> Token {
    Token {
        is_used: true,
        used_at: Some(Utc::now()),
        ..mock_token(code)
    }
}

/// In-memory stand-in for the tokens and responses tables.
///
/// `submit` holds the lock for the whole check-and-write, mirroring the row
/// lock the Postgres transaction takes.
#[derive(Default)]
pub struct InMemoryContest {
    tokens: Mutex<HashMap<String, Token>>,
    responses: Mutex<HashMap<Uuid, NewSubmission>>,
}

impl InMemoryContest {
    pub fn with_tokens(tokens: Vec<Token>) -> Arc<Self> {
        let contest = Self::default();
        {
            let mut map = contest.tokens.lock().unwrap();
            for token in tokens {
                map.insert(token.token_code.clone(), token);
            }
        }
        Arc::new(contest)
    }

    pub fn response_count(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl TokenRepo for InMemoryContest {
    async fn find_by_code(&self, token_code: &str) -> Result<Option<Token>> {
        Ok(self.tokens.lock().unwrap().get(token_code).cloned())
    }

    async fn create_many(&self, token_codes: &[String]) -> Result<Vec<String>> {
        let mut tokens = self.tokens.lock().unwrap();
        let mut inserted = Vec::new();
        for code in token_codes {
            if !tokens.contains_key(code) {
                tokens.insert(code.clone(), mock_token(code));
                inserted.push(code.clone());
            }
        }
        Ok(inserted)
    }
}

#[async_trait]
impl SubmissionRepo for InMemoryContest {
    async fn submit(&self, submission: &NewSubmission) -> Result<SubmitOutcome> {
        let mut tokens = self.tokens.lock().unwrap();
        let Some(token) = tokens.get_mut(&submission.token_code) else {
            return Ok(SubmitOutcome::Rejected(TokenVerdict::NotFound));
        };

        let verdict = token.verdict();
        if !verdict.is_valid() {
            return Ok(SubmitOutcome::Rejected(verdict));
        }

        token.is_used = true;
        token.used_at = Some(Utc::now());

        let response_id = Uuid::new_v4();
        self.responses
            .lock()
            .unwrap()
            .insert(response_id, submission.clone());
        Ok(SubmitOutcome::Accepted { response_id })
    }
}

/// Builder for constructing test `AppState` with custom mocks.
///
/// Uses defaults for any repo/store not explicitly set: empty mocks for repos,
/// a real in-memory cache, and a rate limiter that allows everything.
pub struct TestStateBuilder {
    config: Config,
    token_repo: Option<Arc<dyn TokenRepo>>,
    submission_repo: Option<Arc<dyn SubmissionRepo>>,
    status_repo: Option<Arc<dyn StatusRepo>>,
    token_cache: Option<Arc<dyn TokenCache>>,
    rate_limiter: Option<Arc<dyn RateLimiter>>,
}

impl TestStateBuilder {
    /// Creates a new builder with no mocks configured.
    pub fn new() -> Self {
        Self {
            config: test_config(),
            token_repo: None,
            submission_repo: None,
            status_repo: None,
            token_cache: None,
            rate_limiter: None,
        }
    }

    pub fn trust_proxy_headers(mut self) -> Self {
        self.config.trust_proxy_headers = true;
        self
    }

    pub fn with_token_repo(mut self, repo: impl TokenRepo + 'static) -> Self {
        self.token_repo = Some(Arc::new(repo));
        self
    }

    pub fn with_submission_repo(mut self, repo: impl SubmissionRepo + 'static) -> Self {
        self.submission_repo = Some(Arc::new(repo));
        self
    }

    pub fn with_status_repo(mut self, repo: impl StatusRepo + 'static) -> Self {
        self.status_repo = Some(Arc::new(repo));
        self
    }

    /// Backs both the token and submission repos with the same in-memory contest.
    pub fn with_contest(mut self, contest: Arc<InMemoryContest>) -> Self {
        self.token_repo = Some(contest.clone() as Arc<dyn TokenRepo>);
        self.submission_repo = Some(contest as Arc<dyn SubmissionRepo>);
        self
    }

    pub fn with_token_cache(mut self, cache: impl TokenCache + 'static) -> Self {
        self.token_cache = Some(Arc::new(cache));
        self
    }

    pub fn with_rate_limiter(mut self, limiter: impl RateLimiter + 'static) -> Self {
        self.rate_limiter = Some(Arc::new(limiter));
        self
    }

    /// Builds the `AppState` using configured mocks or defaults.
    pub fn build(self) -> AppState {
        let cache_max_entries = self.config.cache_max_entries;
        let repos = Repos {
            tokens: self
                .token_repo
                .unwrap_or_else(|| Arc::new(MockTokenRepo::new()) as Arc<dyn TokenRepo>),
            submissions: self
                .submission_repo
                .unwrap_or_else(|| Arc::new(MockSubmissionRepo::new()) as Arc<dyn SubmissionRepo>),
            status: self
                .status_repo
                .unwrap_or_else(|| Arc::new(MockStatusRepo::new()) as Arc<dyn StatusRepo>),
        };

        let stores = Stores {
            token_cache: self.token_cache.unwrap_or_else(|| {
                Arc::new(TtlCache::<TokenVerdict>::new(cache_max_entries)) as Arc<dyn TokenCache>
            }),
            rate_limiter: self
                .rate_limiter
                .unwrap_or_else(|| Arc::new(default_rate_limiter()) as Arc<dyn RateLimiter>),
        };

        AppState {
            config: self.config,
            repos,
            stores,
        }
    }
}

impl Default for TestStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Creates a rate limiter mock that allows every request.
fn default_rate_limiter() -> MockRateLimiter {
    let mut limiter = MockRateLimiter::new();
    limiter.expect_check().returning(|_| {
        Ok(RateLimitDecision {
            allowed: true,
            limit: 10,
            remaining: 9,
            reset_after: Duration::from_secs(60),
        })
    });
    limiter
}
