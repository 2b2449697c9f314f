//! Shared API request/response types used by the contest server and its page layer.

use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Largest seed count a visitor may guess.
pub const MAX_GUESS: i64 = 1_000_000_000;
/// Longest accepted token code, after normalization.
const MAX_TOKEN_CODE_LEN: usize = 64;
const MAX_NAME_LEN: usize = 100;

/// Upper-cases and trims a token code so lookups are insensitive to how it was typed.
pub fn normalize_token_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Which contest a submission belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContestType {
    /// Guess how many seeds are in the jar.
    SeedCount,
    /// Guess the name of the secret flower.
    SecretFlower,
}

impl ContestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContestType::SeedCount => "seed-count",
            ContestType::SecretFlower => "secret-flower",
        }
    }
}

/// Check whether a token code can be redeemed.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValidateTokenPayload {
    #[garde(length(min = 1, max = MAX_TOKEN_CODE_LEN), pattern(r"^[A-Z0-9-]+$"))]
    pub token_code: String,
}

impl ValidateTokenPayload {
    pub fn normalize(&mut self) {
        self.token_code = normalize_token_code(&self.token_code);
    }
}

/// Verdict for a token code.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateTokenResponse {
    pub message: String,
    pub valid: bool,
}

/// Submit a guess against a token. Exactly one of `guess` or `secret_flower_name`
/// is expected, matching `contest_type`.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPayload {
    #[garde(length(min = 1, max = MAX_TOKEN_CODE_LEN), pattern(r"^[A-Z0-9-]+$"))]
    pub token_code: String,
    #[garde(skip)]
    pub contest_type: ContestType,
    #[garde(length(chars, min = 1, max = MAX_NAME_LEN))]
    pub full_name: String,
    #[garde(length(min = 7, max = 20), pattern(r"^[0-9+\-() ]+$"))]
    pub contact_number: String,
    #[garde(range(min = 1, max = MAX_GUESS))]
    #[serde(default)]
    pub guess: Option<i64>,
    #[garde(length(chars, min = 1, max = MAX_NAME_LEN))]
    #[serde(default)]
    pub secret_flower_name: Option<String>,
}

impl SubmitPayload {
    /// Trims free-text fields, normalizes the token code, and drops the answer
    /// field that does not belong to `contest_type`.
    pub fn normalize(&mut self) {
        match self.contest_type {
            ContestType::SeedCount => self.secret_flower_name = None,
            ContestType::SecretFlower => self.guess = None,
        }
        self.token_code = normalize_token_code(&self.token_code);
        self.full_name = self.full_name.trim().to_string();
        self.contact_number = self.contact_number.trim().to_string();
        if let Some(name) = self.secret_flower_name.as_mut() {
            *name = name.trim().to_string();
        }
    }

    /// Picks the guess matching the contest type.
    pub fn guess(&self) -> Result<Guess, &'static str> {
        match self.contest_type {
            ContestType::SeedCount => self
                .guess
                .map(Guess::SeedCount)
                .ok_or("guess: required for the seed-count contest"),
            ContestType::SecretFlower => self
                .secret_flower_name
                .clone()
                .map(Guess::FlowerName)
                .ok_or("secretFlowerName: required for the secret-flower contest"),
        }
    }
}

/// A validated guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guess {
    SeedCount(i64),
    FlowerName(String),
}

impl Guess {
    pub fn contest_type(&self) -> ContestType {
        match self {
            Guess::SeedCount(_) => ContestType::SeedCount,
            Guess::FlowerName(_) => ContestType::SecretFlower,
        }
    }
}

/// Returned after a submission attempt.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<Uuid>,
}

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_payload() -> SubmitPayload {
        SubmitPayload {
            token_code: " abc123 ".to_string(),
            contest_type: ContestType::SeedCount,
            full_name: " Ada Lovelace ".to_string(),
            contact_number: "+1 (555) 010-2030".to_string(),
            guess: Some(742),
            secret_flower_name: None,
        }
    }

    #[test]
    fn normalize_uppercases_and_trims_code() {
        let mut payload = seed_payload();
        payload.normalize();

        assert_eq!(payload.token_code, "ABC123");
        assert_eq!(payload.full_name, "Ada Lovelace");
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn submit_payload_uses_camel_case_fields() {
        let payload: SubmitPayload = serde_json::from_str(
            r#"{
                "tokenCode": "ABC123",
                "contestType": "secret-flower",
                "fullName": "Ada",
                "contactNumber": "5550102030",
                "secretFlowerName": "Rafflesia"
            }"#,
        )
        .unwrap();

        assert_eq!(payload.contest_type, ContestType::SecretFlower);
        assert_eq!(payload.guess(), Ok(Guess::FlowerName("Rafflesia".into())));
    }

    #[test]
    fn rejects_non_positive_guess() {
        let mut payload = seed_payload();
        payload.normalize();
        payload.guess = Some(0);

        assert!(payload.validate().is_err());
    }

    #[test]
    fn name_limits_count_characters_not_bytes() {
        let mut payload = seed_payload();
        payload.normalize();

        // 40 characters, 120 bytes.
        payload.full_name = "සූ".repeat(20);
        assert!(payload.validate().is_ok());

        payload.full_name = "é".repeat(MAX_NAME_LEN + 1);
        assert!(payload.validate().is_err());
    }

    #[test]
    fn flower_name_limit_counts_characters() {
        let mut payload = seed_payload();
        payload.contest_type = ContestType::SecretFlower;
        payload.secret_flower_name = Some("ලිලී".repeat(25));
        payload.normalize();

        assert!(payload.validate().is_ok());
    }

    #[test]
    fn stray_answer_for_other_contest_is_ignored() {
        let mut payload = seed_payload();
        payload.contest_type = ContestType::SecretFlower;
        payload.guess = Some(0);
        payload.secret_flower_name = Some("Rafflesia".to_string());
        payload.normalize();

        assert!(payload.validate().is_ok());
        assert_eq!(payload.guess(), Ok(Guess::FlowerName("Rafflesia".into())));

        let mut payload = seed_payload();
        payload.secret_flower_name = Some(String::new());
        payload.normalize();

        assert!(payload.validate().is_ok());
        assert_eq!(payload.guess(), Ok(Guess::SeedCount(742)));
    }

    #[test]
    fn rejects_bad_contact_number() {
        let mut payload = seed_payload();
        payload.normalize();
        payload.contact_number = "call me maybe".to_string();

        assert!(payload.validate().is_err());
    }

    #[test]
    fn rejects_token_code_with_symbols() {
        let mut payload = ValidateTokenPayload {
            token_code: "abc$123".to_string(),
        };
        payload.normalize();

        assert!(payload.validate().is_err());
    }

    #[test]
    fn guess_must_match_contest_type() {
        let mut payload = seed_payload();
        payload.guess = None;
        payload.secret_flower_name = Some("Tulip".to_string());

        assert!(payload.guess().is_err());
    }

    #[test]
    fn submit_response_omits_missing_id() {
        let body = serde_json::to_string(&SubmitResponse {
            message: "Token already used".to_string(),
            response_id: None,
        })
        .unwrap();

        assert_eq!(body, r#"{"message":"Token already used"}"#);
    }
}
