//! Per-platform WooCommerce store configuration.
//!
//! A platform is considered configured only when base URL, key and secret are
//! all non-empty; anything less and the platform is treated as absent. The
//! configuration set is built once at process start and passed by reference
//! into every client call - no ambient environment lookups inside the engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use tomo_core::Platform;

use crate::error::{WooError, WooResult};
use crate::rate_limit::RateLimitConfig;
use crate::retry::RetryPolicy;

/// Connection settings for a single store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Per-request read timeout in seconds.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_read_timeout_secs() -> u64 {
    30
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
        }
    }
}

/// Configuration for one WooCommerce store.
#[derive(Clone, Serialize, Deserialize)]
pub struct WooConfig {
    /// Base URL of the store's REST API root (e.g. `https://shop.example/wp-json/wc/v3`).
    pub base_url: String,
    /// Consumer key for HTTP Basic authentication.
    pub key: String,
    /// Consumer secret for HTTP Basic authentication.
    pub secret: String,
    /// Rate limiting configuration.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Retry configuration.
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Connection timeouts.
    #[serde(default)]
    pub connection: ConnectionSettings,
}

impl std::fmt::Debug for WooConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WooConfig")
            .field("base_url", &self.base_url)
            .field("key", &self.key)
            .field("secret", &"***")
            .finish()
    }
}

impl WooConfig {
    /// Create a config with default rate limit and retry settings.
    pub fn new(
        base_url: impl Into<String>,
        key: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            key: key.into(),
            secret: secret.into(),
            rate_limit: RateLimitConfig::default(),
            retry: RetryPolicy::default(),
            connection: ConnectionSettings::default(),
        }
    }

    /// Replace the rate limit configuration.
    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Whether all three credentials are present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.base_url.trim().is_empty()
            && !self.key.trim().is_empty()
            && !self.secret.trim().is_empty()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> WooResult<()> {
        if !self.is_complete() {
            return Err(WooError::configuration(
                "base_url, key and secret must all be non-empty",
            ));
        }
        let parsed = url::Url::parse(&self.base_url)
            .map_err(|e| WooError::configuration(format!("invalid base_url: {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(WooError::configuration(format!(
                "unsupported scheme: {}",
                parsed.scheme()
            )));
        }
        Ok(())
    }
}

/// The full set of platform configurations known to the process.
///
/// Platforms missing from the map (or configured incompletely) are treated
/// as absent: outbound sync silently no-ops for them with a warning.
#[derive(Debug, Clone, Default)]
pub struct PlatformConfigs {
    configs: HashMap<Platform, WooConfig>,
}

impl PlatformConfigs {
    /// Create an empty configuration set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a platform configuration. Incomplete configs are dropped.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform, config: WooConfig) -> Self {
        if config.is_complete() {
            self.configs.insert(platform, config);
        } else {
            tracing::warn!(
                platform = %platform,
                "Ignoring incomplete platform configuration"
            );
        }
        self
    }

    /// Configuration for a platform, if it is fully configured.
    #[must_use]
    pub fn get(&self, platform: Platform) -> Option<&WooConfig> {
        self.configs.get(&platform)
    }

    /// Whether the platform is fully configured.
    #[must_use]
    pub fn is_configured(&self, platform: Platform) -> bool {
        self.configs.contains_key(&platform)
    }

    /// Iterate over configured platforms.
    pub fn platforms(&self) -> impl Iterator<Item = Platform> + '_ {
        self.configs.keys().copied()
    }
}
