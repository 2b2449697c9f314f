use crate::{config::Config, repos::Repos, stores::Stores};

#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Database repositories.
    pub repos: Repos,
    /// In-process cache and rate limiter.
    pub stores: Stores,
}
