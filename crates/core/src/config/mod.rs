//! Application configuration with layered loading.
//!
//! Configuration is loaded with figment from multiple sources:
//!
//! 1. Environment variables (STOREFRONT_*)
//! 2. TOML config file (if STOREFRONT_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (STOREFRONT_*)
/// 2. TOML config file (if STOREFRONT_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the catalog API (the host serving `/api/...`).
    ///
    /// Set via STOREFRONT_API_BASE_URL environment variable.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Bearer token sent with API requests, if any.
    ///
    /// Set via STOREFRONT_AUTH_TOKEN environment variable.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Validity window for cached catalog lists in milliseconds.
    ///
    /// Set via STOREFRONT_CACHE_TTL_MS environment variable.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via STOREFRONT_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Delay between a data-updated event and the refresh callbacks.
    ///
    /// Set via STOREFRONT_REFRESH_DELAY_MS environment variable.
    #[serde(default = "default_refresh_delay_ms")]
    pub refresh_delay_ms: u64,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via STOREFRONT_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Path to the SQLite file used for persisted lists and the
    /// cross-process change channel. Memory-only when unset.
    ///
    /// Set via STOREFRONT_DB_PATH environment variable.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// Poll interval of the SQLite change channel in milliseconds.
    ///
    /// Set via STOREFRONT_CHANNEL_POLL_MS environment variable.
    #[serde(default = "default_channel_poll_ms")]
    pub channel_poll_ms: u64,
}

fn default_api_base_url() -> String {
    "http://localhost:3000".into()
}

fn default_cache_ttl_ms() -> u64 {
    300_000 // 5 minutes
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_refresh_delay_ms() -> u64 {
    500
}

fn default_user_agent() -> String {
    "storefront-cache/0.1".into()
}

fn default_channel_poll_ms() -> u64 {
    1_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            auth_token: None,
            cache_ttl_ms: default_cache_ttl_ms(),
            timeout_ms: default_timeout_ms(),
            refresh_delay_ms: default_refresh_delay_ms(),
            user_agent: default_user_agent(),
            db_path: None,
            channel_poll_ms: default_channel_poll_ms(),
        }
    }
}

impl AppConfig {
    /// Cache TTL as Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }

    pub fn channel_poll_interval(&self) -> Duration {
        Duration::from_millis(self.channel_poll_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `STOREFRONT_`
    /// 2. TOML file from `STOREFRONT_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("STOREFRONT_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("STOREFRONT_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Whether persistence (and the cross-process channel) is enabled.
    pub fn persistence_enabled(&self) -> bool {
        self.db_path.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.api_base_url, "http://localhost:3000");
        assert_eq!(config.cache_ttl_ms, 300_000);
        assert_eq!(config.timeout_ms, 10_000);
        assert_eq!(config.refresh_delay_ms, 500);
        assert_eq!(config.user_agent, "storefront-cache/0.1");
        assert_eq!(config.channel_poll_ms, 1_000);
        assert!(config.auth_token.is_none());
        assert!(config.db_path.is_none());
        assert!(!config.persistence_enabled());
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.refresh_delay(), Duration::from_millis(500));
        assert_eq!(config.channel_poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_persistence_enabled_with_db_path() {
        let config = AppConfig { db_path: Some(PathBuf::from("./catalog.sqlite")), ..Default::default() };
        assert!(config.persistence_enabled());
    }
}
