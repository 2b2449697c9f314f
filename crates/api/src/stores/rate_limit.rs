//! In-process rate limiting.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use anyhow::{Result, anyhow};
use tokio::time::Instant;

use super::Sweep;

/// Rate limiter trait for checking and incrementing counters.
#[cfg_attr(test, mockall::automock)]
pub trait RateLimiter: Send + Sync {
    /// Count a request against `key`'s current window and report whether it may proceed.
    fn check(&self, key: &str) -> Result<RateLimitDecision>;
}

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the current window resets.
    pub reset_after: Duration,
}

impl RateLimitDecision {
    /// Whole seconds a rejected client should wait, never zero.
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.reset_after.as_secs();
        let rounded = if self.reset_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        };
        rounded.max(1)
    }
}

struct Window {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window counters held in memory.
///
/// A client's first request opens a window; the counter resets once the window
/// has elapsed. Tracked keys are capped at `max_clients`: when full, expired
/// windows are dropped first, then the windows closest to resetting.
pub struct MemoryRateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    max_requests: u32,
    window: Duration,
    max_clients: usize,
}

impl MemoryRateLimiter {
    pub fn new(max_requests: u32, window: Duration, max_clients: usize) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_requests: max_requests.max(1),
            window,
            max_clients: max_clients.max(1),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Window>>> {
        self.windows
            .lock()
            .map_err(|_| anyhow!("rate limiter lock poisoned"))
    }

    fn make_room(&self, windows: &mut HashMap<String, Window>, now: Instant) {
        windows.retain(|_, w| w.reset_at > now);
        if windows.len() < self.max_clients {
            return;
        }

        let evict = (self.max_clients / 10).max(1);
        let mut by_reset: Vec<(Instant, String)> = windows
            .iter()
            .map(|(key, w)| (w.reset_at, key.clone()))
            .collect();
        by_reset.sort_unstable();
        for (_, key) in by_reset.into_iter().take(evict) {
            windows.remove(&key);
        }
        tracing::warn!(evicted = evict, "rate limiter at capacity, dropped oldest windows");
    }

    #[cfg(test)]
    pub fn tracked(&self) -> usize {
        self.lock().map(|windows| windows.len()).unwrap_or(0)
    }
}

impl RateLimiter for MemoryRateLimiter {
    fn check(&self, key: &str) -> Result<RateLimitDecision> {
        let mut windows = self.lock()?;
        let now = Instant::now();

        if let Some(window) = windows.get_mut(key)
            && window.reset_at > now
        {
            let reset_after = window.reset_at - now;
            if window.count >= self.max_requests {
                return Ok(RateLimitDecision {
                    allowed: false,
                    limit: self.max_requests,
                    remaining: 0,
                    reset_after,
                });
            }

            window.count += 1;
            return Ok(RateLimitDecision {
                allowed: true,
                limit: self.max_requests,
                remaining: self.max_requests - window.count,
                reset_after,
            });
        }

        if !windows.contains_key(key) && windows.len() >= self.max_clients {
            self.make_room(&mut windows, now);
        }

        windows.insert(
            key.to_string(),
            Window {
                count: 1,
                reset_at: now + self.window,
            },
        );

        Ok(RateLimitDecision {
            allowed: true,
            limit: self.max_requests,
            remaining: self.max_requests - 1,
            reset_after: self.window,
        })
    }
}

impl Sweep for MemoryRateLimiter {
    fn sweep(&self) -> Result<usize> {
        let mut windows = self.lock()?;
        let now = Instant::now();
        let before = windows.len();
        windows.retain(|_, w| w.reset_at > now);
        Ok(before - windows.len())
    }
}
