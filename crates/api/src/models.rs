use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Token {
    pub id: Uuid,
    pub token_code: String,
    pub is_valid: bool,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Token {
    pub fn verdict(&self) -> TokenVerdict {
        if !self.is_valid {
            TokenVerdict::Invalid
        } else if self.is_used {
            TokenVerdict::AlreadyUsed
        } else {
            TokenVerdict::Valid
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Response {
    pub id: Uuid,
    pub contest_type: String,
    pub full_name: String,
    pub contact_number: String,
    pub guess: i64,
    pub submitted_at: DateTime<Utc>,
    pub token_id: Uuid,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FlowerResponse {
    pub id: Uuid,
    pub contest_type: String,
    pub full_name: String,
    pub contact_number: String,
    pub secret_flower_name: String,
    pub submitted_at: DateTime<Utc>,
    pub token_id: Uuid,
}

/// Outcome of checking a token code. Cached per code, so it must stay cheap to clone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenVerdict {
    Valid,
    NotFound,
    Invalid,
    AlreadyUsed,
}

impl TokenVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, TokenVerdict::Valid)
    }

    pub fn message(&self) -> &'static str {
        match self {
            TokenVerdict::Valid => "Token is valid",
            TokenVerdict::NotFound => "Invalid token",
            TokenVerdict::Invalid => "Token is not valid",
            TokenVerdict::AlreadyUsed => "Token has already been used",
        }
    }
}
