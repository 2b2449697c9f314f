//! Token seeding for `api --seed-tokens N`.
//!
//! Codes are 8 characters from an alphabet without look-alikes (no 0/O, 1/I),
//! since visitors type them by hand from a printed card.

use std::collections::HashSet;

use anyhow::{Result, bail};
use rand::Rng;

use crate::repos::TokenRepo;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 8;
/// Rounds of collision retries before giving up.
const MAX_ROUNDS: usize = 5;
const BATCH_SIZE: usize = 1_000;

pub fn generate_code(rng: &mut impl Rng) -> String {
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Create `count` new tokens and return their codes.
pub async fn seed_tokens(tokens: &dyn TokenRepo, count: usize) -> Result<Vec<String>> {
    let mut created: Vec<String> = Vec::with_capacity(count);

    for _ in 0..MAX_ROUNDS {
        if created.len() >= count {
            break;
        }

        let wanted = count - created.len();
        let candidates: Vec<String> = {
            let mut rng = rand::rng();
            let mut codes = HashSet::with_capacity(wanted);
            while codes.len() < wanted {
                codes.insert(generate_code(&mut rng));
            }
            codes.into_iter().collect()
        };

        for batch in candidates.chunks(BATCH_SIZE) {
            created.extend(tokens.create_many(batch).await?);
        }
    }

    if created.len() < count {
        bail!(
            "only created {} of {} tokens after {} rounds",
            created.len(),
            count,
            MAX_ROUNDS
        );
    }

    tracing::info!(count = created.len(), "tokens seeded");
    Ok(created)
}
