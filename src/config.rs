//! Engine and server configuration
//!
//! Everything is read once from the environment at startup and shared
//! immutably. API keys are never logged; use [`mask_secret`] wherever a
//! config value ends up in a log line.

use std::time::Duration;

use crate::utils::constants::{
    DEFAULT_BALANCE_TTL_SECS, DEFAULT_EXPLORER_BASE_URL, DEFAULT_INDEXER_BASE_URL,
    DEFAULT_MARKET_BASE_URL, DEFAULT_PARTIAL_TTL_SECS, DEFAULT_PROVIDER_TIMEOUT_SECS,
    DEFAULT_REGISTRY_BASE_URL, DEFAULT_RESOLUTION_DEADLINE_SECS, DEFAULT_TRANSACTION_TTL_SECS,
};

/// Configuration for the analysis engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Chain explorer base URL (Etherscan v2 unified endpoint)
    pub explorer_base_url: String,

    /// Chain explorer API key
    pub explorer_api_key: String,

    /// Balance/token indexer base URL (Moralis)
    pub indexer_base_url: String,

    /// Indexer API key
    pub indexer_api_key: String,

    /// Verification registry base URL (Sourcify, no key needed)
    pub registry_base_url: String,

    /// Market data base URL (CoinGecko)
    pub market_base_url: String,

    /// Market data API key, optional (public tier works without one)
    pub market_api_key: Option<String>,

    /// Per-provider-call timeout
    pub provider_timeout: Duration,

    /// Outer deadline for one full resolution (all providers)
    pub resolution_deadline: Duration,

    /// TTL for cached address/contract results
    pub balance_ttl: Duration,

    /// TTL for cached transaction results (immutable once mined)
    pub transaction_ttl: Duration,

    /// TTL for cached partial results
    pub partial_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            explorer_base_url: std::env::var("EXPLORER_API_URL")
                .unwrap_or_else(|_| DEFAULT_EXPLORER_BASE_URL.to_string()),
            explorer_api_key: std::env::var("EXPLORER_API_KEY").unwrap_or_default(),
            indexer_base_url: std::env::var("INDEXER_API_URL")
                .unwrap_or_else(|_| DEFAULT_INDEXER_BASE_URL.to_string()),
            indexer_api_key: std::env::var("INDEXER_API_KEY").unwrap_or_default(),
            registry_base_url: std::env::var("REGISTRY_API_URL")
                .unwrap_or_else(|_| DEFAULT_REGISTRY_BASE_URL.to_string()),
            market_base_url: std::env::var("MARKET_API_URL")
                .unwrap_or_else(|_| DEFAULT_MARKET_BASE_URL.to_string()),
            market_api_key: std::env::var("MARKET_API_KEY").ok().filter(|k| !k.is_empty()),
            provider_timeout: env_duration_secs(
                "PROVIDER_TIMEOUT_SECS",
                DEFAULT_PROVIDER_TIMEOUT_SECS,
            ),
            resolution_deadline: env_duration_secs(
                "RESOLUTION_DEADLINE_SECS",
                DEFAULT_RESOLUTION_DEADLINE_SECS,
            ),
            balance_ttl: env_duration_secs("BALANCE_TTL_SECS", DEFAULT_BALANCE_TTL_SECS),
            transaction_ttl: env_duration_secs(
                "TRANSACTION_TTL_SECS",
                DEFAULT_TRANSACTION_TTL_SECS,
            ),
            partial_ttl: env_duration_secs("PARTIAL_TTL_SECS", DEFAULT_PARTIAL_TTL_SECS),
        }
    }
}

/// Configuration for the HTTP server binary
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Inbound API key; when unset the API is open (rate limiting still applies)
    pub api_auth_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            api_auth_key: std::env::var("API_AUTH_KEY").ok().filter(|k| !k.is_empty()),
        }
    }
}

fn env_duration_secs(name: &str, default_secs: u64) -> Duration {
    let secs = std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default_secs);
    Duration::from_secs(secs)
}

/// Keep the first 4 characters, hide the rest
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "(unset)".to_string();
    }
    if secret.len() <= 4 {
        return "****".to_string();
    }
    format!("{}****", &secret[..4])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = EngineConfig::default();
        assert_eq!(config.provider_timeout, Duration::from_secs(8));
        assert_eq!(config.resolution_deadline, Duration::from_secs(15));
        assert!(config.partial_ttl < config.balance_ttl);
        assert!(config.balance_ttl < config.transaction_ttl);
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "(unset)");
        assert_eq!(mask_secret("abc"), "****");
        assert_eq!(mask_secret("abcdef123456"), "abcd****");
    }
}
