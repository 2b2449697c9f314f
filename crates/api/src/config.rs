use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    /// Set to "production" for JSON logging, anything else for human-readable.
    #[serde(default)]
    pub env: String,
    /// Sentry DSN for error tracking
    #[serde(default)]
    pub sentry_dsn: Option<String>,
    /// How long a token verdict stays cached.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,
    #[serde(default = "default_sweep_secs")]
    pub cache_sweep_secs: u64,
    /// Requests allowed per client and endpoint within one window.
    #[serde(default = "default_rate_limit_max_requests")]
    pub rate_limit_max_requests: u32,
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
    #[serde(default = "default_rate_limit_max_clients")]
    pub rate_limit_max_clients: usize,
    /// Identify clients by X-Forwarded-For / X-Real-IP. Only enable behind a trusted proxy.
    #[serde(default)]
    pub trust_proxy_headers: bool,
    /// Comma-separated origins allowed to call the API from a browser.
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,
}

impl Config {
    pub fn is_production(&self) -> bool {
        self.env == "production"
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_cache_max_entries() -> usize {
    10_000
}

fn default_sweep_secs() -> u64 {
    60
}

fn default_rate_limit_max_requests() -> u32 {
    10
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

fn default_rate_limit_max_clients() -> usize {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_from_prefixed_env_with_defaults() {
        let vars = vec![
            ("CONTEST_HOST".to_string(), "0.0.0.0".to_string()),
            ("CONTEST_PORT".to_string(), "8080".to_string()),
            (
                "CONTEST_DATABASE_URL".to_string(),
                "postgres://localhost/contest".to_string(),
            ),
        ];

        let config = envy::prefixed("CONTEST_")
            .from_iter::<_, Config>(vars)
            .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.rate_limit_max_requests, 10);
        assert!(!config.trust_proxy_headers);
        assert!(config.cors_origins().is_empty());
    }

    #[test]
    fn splits_cors_origins() {
        let vars = vec![
            ("CONTEST_HOST".to_string(), "0.0.0.0".to_string()),
            ("CONTEST_PORT".to_string(), "8080".to_string()),
            ("CONTEST_DATABASE_URL".to_string(), "postgres://x".to_string()),
            (
                "CONTEST_CORS_ALLOWED_ORIGINS".to_string(),
                "https://contest.example.com, https://www.example.com,".to_string(),
            ),
        ];

        let config = envy::prefixed("CONTEST_")
            .from_iter::<_, Config>(vars)
            .unwrap();

        assert_eq!(
            config.cors_origins(),
            vec!["https://contest.example.com", "https://www.example.com"]
        );
    }
}
