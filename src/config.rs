//! Sync core configuration loaded from environment variables.
//!
//! Everything has a sensible default so the core can be constructed in
//! tests without any environment setup.

use std::env;

/// Configuration for the sync core, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the feed service API
    pub remote_base_url: String,
    /// Country code prepended to 10-digit contact numbers (digits only)
    pub default_country_code: String,
    /// Offset from UTC, in minutes, used to localize feed-week boundaries
    pub utc_offset_minutes: i32,
    /// Maximum collectibles kept for users other than the current user
    pub max_other_user_collectibles: usize,
    /// Maximum entries held in each store's memory tier before eviction
    pub cache_capacity: usize,
    /// Phone-number prefixes filtered from leaderboard results
    pub spam_prefixes: Vec<String>,
    /// Feed page size for paginated refreshes
    pub feed_page_size: u32,
}

impl Default for Config {
    /// Default config for testing and local development.
    fn default() -> Self {
        Self {
            remote_base_url: "http://localhost:8080/api/v1".to_string(),
            default_country_code: "1".to_string(),
            utc_offset_minutes: 0,
            max_other_user_collectibles: 12,
            cache_capacity: 500,
            spam_prefixes: vec![
                "+1800".to_string(),
                "+1833".to_string(),
                "+1844".to_string(),
                "+1855".to_string(),
                "+1866".to_string(),
                "+1877".to_string(),
                "+1888".to_string(),
            ],
            feed_page_size: 50,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Only `STRIDE_REMOTE_URL` is required; everything else falls back to
    /// the defaults above.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = Self::default();

        Ok(Self {
            remote_base_url: env::var("STRIDE_REMOTE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("STRIDE_REMOTE_URL"))?,
            default_country_code: env::var("STRIDE_COUNTRY_CODE")
                .unwrap_or(defaults.default_country_code),
            utc_offset_minutes: env::var("STRIDE_UTC_OFFSET_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.utc_offset_minutes),
            max_other_user_collectibles: env::var("STRIDE_MAX_OTHER_COLLECTIBLES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_other_user_collectibles),
            cache_capacity: env::var("STRIDE_CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_capacity),
            spam_prefixes: env::var("STRIDE_SPAM_PREFIXES")
                .map(|v| v.split(',').map(|p| p.trim().to_string()).collect())
                .unwrap_or(defaults.spam_prefixes),
            feed_page_size: env::var("STRIDE_FEED_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.feed_page_size),
        })
    }
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_usable() {
        let config = Config::default();
        assert!(config.cache_capacity > 0);
        assert!(config.feed_page_size > 0);
        assert!(config.spam_prefixes.iter().all(|p| p.starts_with('+')));
    }

    #[test]
    fn default_offset_is_utc() {
        assert_eq!(Config::default().utc_offset_minutes, 0);
    }
}
