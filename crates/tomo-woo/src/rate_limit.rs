//! Per-platform request throttling.
//!
//! One limiter instance exists per platform client, so stores never interfere
//! with each other. Acquisition suspends the caller until a slot is available;
//! it never fails, only delays. This is the engine's sole backpressure
//! mechanism: callers block rather than error when over budget.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, trace};

/// Configuration for rate limiting behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Maximum requests per second (default: 10).
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Maximum concurrent in-flight requests (default: 5).
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: u32,
}

fn default_enabled() -> bool {
    true
}

fn default_requests_per_second() -> u32 {
    10
}

fn default_max_concurrent() -> u32 {
    5
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            requests_per_second: default_requests_per_second(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl RateLimitConfig {
    /// Create a rate limit config with custom RPS.
    #[must_use]
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            requests_per_second,
            ..Default::default()
        }
    }

    /// Disable rate limiting.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Set max concurrent requests.
    #[must_use]
    pub fn with_max_concurrent(mut self, max: u32) -> Self {
        self.max_concurrent = max;
        self
    }
}

/// Token bucket for rate limiting.
struct TokenBucket {
    /// Available tokens.
    tokens: f64,

    /// Maximum tokens (bucket size).
    max_tokens: f64,

    /// Refill rate (tokens per second).
    refill_rate: f64,

    /// Last refill timestamp.
    last_refill: Instant,
}

impl TokenBucket {
    fn new(tokens_per_second: u32) -> Self {
        Self {
            tokens: f64::from(tokens_per_second),
            max_tokens: f64::from(tokens_per_second),
            refill_rate: f64::from(tokens_per_second),
            last_refill: Instant::now(),
        }
    }

    /// Refill tokens based on elapsed time.
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);
        let new_tokens = elapsed.as_secs_f64() * self.refill_rate;
        self.tokens = (self.tokens + new_tokens).min(self.max_tokens);
        self.last_refill = now;
    }

    /// Try to acquire a token. Returns wait time if not available.
    fn try_acquire(&mut self) -> Result<(), Duration> {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let tokens_needed = 1.0 - self.tokens;
            let wait_secs = tokens_needed / self.refill_rate;
            Err(Duration::from_secs_f64(wait_secs))
        }
    }
}

/// Token-bucket rate limiter for one platform.
pub struct RateLimiter {
    config: RateLimitConfig,
    semaphore: Arc<Semaphore>,
    tokens: Arc<Mutex<TokenBucket>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1) as usize));
        let tokens = Arc::new(Mutex::new(TokenBucket::new(
            config.requests_per_second.max(1),
        )));
        Self {
            config,
            semaphore,
            tokens,
        }
    }

    /// Wait for a request slot.
    ///
    /// Suspends until both a concurrency permit and a rate-limit token are
    /// available. Safe for many concurrent callers. Returns a guard that
    /// releases the concurrency permit when dropped.
    pub async fn acquire(&self) -> RateLimitGuard {
        if !self.config.enabled {
            return RateLimitGuard::noop();
        }

        // Semaphore closure cannot happen while the limiter owns it; fall
        // back to an unthrottled guard rather than failing the caller.
        let permit = match self.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return RateLimitGuard::noop(),
        };

        loop {
            let wait = {
                let mut bucket = self.tokens.lock().await;
                bucket.try_acquire().err()
            };

            match wait {
                None => {
                    trace!("Rate limit token acquired");
                    return RateLimitGuard::with_permit(permit);
                }
                Some(wait) => {
                    debug!(wait_ms = wait.as_millis(), "Rate limited, waiting for token");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Number of free concurrency permits.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// Guard returned when a rate limit slot is acquired.
/// Releases the concurrency permit when dropped.
pub struct RateLimitGuard {
    _permit: Option<tokio::sync::OwnedSemaphorePermit>,
}

impl RateLimitGuard {
    fn noop() -> Self {
        Self { _permit: None }
    }

    fn with_permit(permit: tokio::sync::OwnedSemaphorePermit) -> Self {
        Self {
            _permit: Some(permit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert_eq!(config.requests_per_second, 10);
        assert_eq!(config.max_concurrent, 5);
    }

    #[test]
    fn test_config_disabled() {
        assert!(!RateLimitConfig::disabled().enabled);
    }

    #[test]
    fn test_token_bucket_depletes() {
        let mut bucket = TokenBucket::new(1);
        assert!(bucket.try_acquire().is_ok());
        let wait = bucket.try_acquire().unwrap_err();
        assert!(wait.as_millis() > 0);
    }

    #[test]
    fn test_token_bucket_new_full() {
        let bucket = TokenBucket::new(10);
        assert_eq!(bucket.tokens, 10.0);
        assert_eq!(bucket.max_tokens, 10.0);
    }

    #[tokio::test]
    async fn test_acquire_when_disabled_is_immediate() {
        let limiter = RateLimiter::new(RateLimitConfig::disabled());
        let _guard = limiter.acquire().await;
    }

    #[tokio::test]
    async fn test_acquire_releases_permit_on_drop() {
        let limiter = RateLimiter::new(RateLimitConfig::new(100).with_max_concurrent(2));

        let guard1 = limiter.acquire().await;
        let guard2 = limiter.acquire().await;
        assert_eq!(limiter.available_permits(), 0);

        drop(guard1);
        assert_eq!(limiter.available_permits(), 1);
        drop(guard2);
        assert_eq!(limiter.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_all_complete() {
        let limiter = Arc::new(RateLimiter::new(
            RateLimitConfig::new(1000).with_max_concurrent(3),
        ));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                let _guard = limiter.acquire().await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(limiter.available_permits(), 3);
    }

    #[tokio::test]
    async fn test_rate_limits_suspend_not_error() {
        // 2 rps bucket: third acquire must wait, but still succeeds.
        let limiter = RateLimiter::new(RateLimitConfig::new(2).with_max_concurrent(10));
        let start = Instant::now();
        let _a = limiter.acquire().await;
        let _b = limiter.acquire().await;
        let _c = limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(300));
    }
}
