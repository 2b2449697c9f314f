//! In-process TTL cache for token verdicts.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use anyhow::{Result, anyhow};
use tokio::time::Instant;

use super::Sweep;
use crate::models::TokenVerdict;

/// Cache of token verdicts keyed by normalized token code.
#[cfg_attr(test, mockall::automock)]
pub trait TokenCache: Send + Sync {
    /// Cached verdict for a token code, if present and unexpired.
    fn get(&self, token_code: &str) -> Result<Option<TokenVerdict>>;

    /// Cache a verdict for `ttl`.
    fn set(&self, token_code: &str, verdict: TokenVerdict, ttl: Duration) -> Result<()>;

    /// Drop any cached verdict for a token code.
    fn delete(&self, token_code: &str) -> Result<()>;
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Capacity-bounded map with per-entry expiry.
///
/// When full, the tenth of the entries closest to expiry is evicted before an
/// insert. Expired entries are dropped on read and by [`Sweep::sweep`].
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, Entry<V>>>,
    max_entries: usize,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Entry<V>>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("cache lock poisoned"))
    }

    pub fn lookup(&self, key: &str) -> Result<Option<V>> {
        let mut entries = self.lock()?;
        let now = Instant::now();

        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub fn insert(&self, key: &str, value: V, ttl: Duration) -> Result<()> {
        let mut entries = self.lock()?;
        let now = Instant::now();

        if !entries.contains_key(key) && entries.len() >= self.max_entries {
            entries.retain(|_, entry| entry.expires_at > now);

            if entries.len() >= self.max_entries {
                let evict = (self.max_entries / 10).max(1);
                let mut by_expiry: Vec<(Instant, String)> = entries
                    .iter()
                    .map(|(key, entry)| (entry.expires_at, key.clone()))
                    .collect();
                by_expiry.sort_unstable();

                for (_, key) in by_expiry.into_iter().take(evict) {
                    entries.remove(&key);
                }
                tracing::debug!(evicted = evict, "cache full, evicted entries nearest expiry");
            }
        }

        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }
}

impl<V: Clone + Send> Sweep for TtlCache<V> {
    fn sweep(&self) -> Result<usize> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok(before - entries.len())
    }
}

fn token_key(token_code: &str) -> String {
    format!("token:{}", token_code)
}

impl TokenCache for TtlCache<TokenVerdict> {
    fn get(&self, token_code: &str) -> Result<Option<TokenVerdict>> {
        self.lookup(&token_key(token_code))
    }

    fn set(&self, token_code: &str, verdict: TokenVerdict, ttl: Duration) -> Result<()> {
        self.insert(&token_key(token_code), verdict, ttl)
    }

    fn delete(&self, token_code: &str) -> Result<()> {
        self.remove(&token_key(token_code))
    }
}
