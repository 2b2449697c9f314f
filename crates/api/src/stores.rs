//! Ephemeral in-process stores.
//!
//! Both stores are local to one server process: nothing here is shared across
//! instances or survives a restart. Handlers treat them as optimizations and
//! fall back to the database (cache) or let the request through (limiter) when
//! they fail.
//!
//! ## Stores
//!
//! - **cache** - Token verdicts keyed by normalized code, TTL-bounded
//! - **rate_limit** - Fixed-window request counters per client and endpoint
//!
//! ## Key Patterns
//!
//! ```text
//! token:{CODE}              → TokenVerdict (expires after cache TTL)
//! validate:{client}         → request window for POST /api/validate-token
//! submit:{client}           → request window for POST /api/submit
//! ```

mod cache;
mod rate_limit;

pub use cache::{TokenCache, TtlCache};
pub use rate_limit::{MemoryRateLimiter, RateLimitDecision, RateLimiter};

#[cfg(test)]
pub use cache::MockTokenCache;
#[cfg(test)]
pub use rate_limit::MockRateLimiter;

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use anyhow::Result;
use tokio::task::JoinHandle;

/// Stores that hold expiring state and need periodic cleanup.
pub trait Sweep {
    /// Remove expired state, returning how many entries were dropped.
    fn sweep(&self) -> Result<usize>;
}

/// Runs `target.sweep()` every `every` until `target` is dropped.
pub fn spawn_sweeper<T>(target: &Arc<T>, every: Duration, name: &'static str) -> JoinHandle<()>
where
    T: Sweep + Send + Sync + 'static,
{
    let target: Weak<T> = Arc::downgrade(target);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every.max(Duration::from_millis(1)));
        loop {
            interval.tick().await;

            let Some(target) = target.upgrade() else {
                break;
            };

            match target.sweep() {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(store = name, removed, "swept expired entries"),
                Err(e) => tracing::warn!(store = name, "sweep failed: {:?}", e),
            }
        }
    })
}

/// Collection of all ephemeral stores.
#[derive(Clone)]
pub struct Stores {
    pub token_cache: Arc<dyn TokenCache>,
    pub rate_limiter: Arc<dyn RateLimiter>,
}
