//! Retry execution with exponential backoff.
//!
//! Wraps any external call, classifying errors by HTTP status: a status in
//! the retryable set is retried with exponentially increasing delay, anything
//! else propagates immediately. Cancellation (deadline elapsed) is
//! distinguished from retryable failures and stops the loop at once.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{WooError, WooResult};

/// Configuration for retry behavior with exponential backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (default: 3).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds (default: 100).
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds (default: 30000).
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Backoff multiplier (default: 2.0).
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Whether to add jitter to backoff (default: true).
    #[serde(default = "default_use_jitter")]
    pub use_jitter: bool,

    /// HTTP status codes that should trigger a retry.
    #[serde(default = "default_retryable_status_codes")]
    pub retryable_status_codes: Vec<u16>,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    30000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_use_jitter() -> bool {
    true
}

fn default_retryable_status_codes() -> Vec<u16> {
    vec![429, 500, 502, 503, 504]
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            use_jitter: default_use_jitter(),
            retryable_status_codes: default_retryable_status_codes(),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with custom max retries.
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Disable retries.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Set initial backoff.
    #[must_use]
    pub fn with_initial_backoff(mut self, ms: u64) -> Self {
        self.initial_backoff_ms = ms;
        self
    }

    /// Set max backoff.
    #[must_use]
    pub fn with_max_backoff(mut self, ms: u64) -> Self {
        self.max_backoff_ms = ms;
        self
    }

    /// Check if a status code should trigger a retry.
    #[must_use]
    pub fn should_retry(&self, status_code: u16) -> bool {
        self.retryable_status_codes.contains(&status_code)
    }

    /// Calculate backoff duration for a given attempt (1-indexed).
    #[must_use]
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::from_millis(0);
        }

        let base =
            self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(attempt as i32 - 1);
        let capped = base.min(self.max_backoff_ms as f64);

        let delay_ms = if self.use_jitter {
            // Add up to 25% jitter
            let jitter_range = capped * 0.25;
            let jitter = (rand_simple() * jitter_range * 2.0) - jitter_range;
            (capped + jitter).max(0.0)
        } else {
            capped
        };

        Duration::from_millis(delay_ms as u64)
    }
}

/// Simple pseudo-random number generator for jitter.
/// Not cryptographically secure, but sufficient for jitter.
fn rand_simple() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (f64::from(nanos) / f64::from(u32::MAX)).fract()
}

/// Retry executor with exponential backoff and status-code classification.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Create a new retry executor with the given policy.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The policy in effect.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute an operation with retries.
    ///
    /// `on_retry` is invoked with the error and the attempt number (1-based)
    /// before each retry, for observability. A `Retry-After` hint carried by
    /// a 429 error overrides the computed backoff for that attempt.
    pub async fn execute<F, Fut, T, R>(&self, mut operation: F, mut on_retry: R) -> WooResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = WooResult<T>>,
        R: FnMut(&WooError, u32),
    {
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if matches!(e, WooError::Cancelled { .. }) {
                        return Err(e);
                    }
                    if !e.is_retryable(&self.policy.retryable_status_codes)
                        || attempt > self.policy.max_retries
                    {
                        return Err(e);
                    }

                    let backoff = e
                        .retry_after_secs()
                        .map(Duration::from_secs)
                        .unwrap_or_else(|| self.policy.calculate_backoff(attempt));

                    debug!(
                        attempt = attempt,
                        max_retries = self.policy.max_retries,
                        backoff_ms = backoff.as_millis(),
                        error = %e,
                        "Retrying after retryable error"
                    );

                    on_retry(&e, attempt);
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    /// Execute with an overall deadline.
    ///
    /// When the deadline elapses mid-retry the loop stops and the caller gets
    /// a [`WooError::Cancelled`], distinct from any retryable-status error.
    pub async fn execute_with_deadline<F, Fut, T, R>(
        &self,
        endpoint: &str,
        deadline: Duration,
        operation: F,
        on_retry: R,
    ) -> WooResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = WooResult<T>>,
        R: FnMut(&WooError, u32),
    {
        match tokio::time::timeout(deadline, self.execute(operation, on_retry)).await {
            Ok(result) => result,
            Err(_) => Err(WooError::Cancelled {
                endpoint: endpoint.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            backoff_multiplier: 2.0,
            use_jitter: false,
            retryable_status_codes: default_retryable_status_codes(),
        }
    }

    #[test]
    fn test_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert!(policy.should_retry(429));
        assert!(policy.should_retry(500));
        assert!(policy.should_retry(502));
        assert!(policy.should_retry(503));
        assert!(policy.should_retry(504));
        assert!(!policy.should_retry(400));
        assert!(!policy.should_retry(404));
    }

    #[test]
    fn test_backoff_exponential_no_jitter() {
        let policy = RetryPolicy {
            use_jitter: false,
            ..Default::default()
        };
        assert_eq!(policy.calculate_backoff(1), Duration::from_millis(100));
        assert_eq!(policy.calculate_backoff(2), Duration::from_millis(200));
        assert_eq!(policy.calculate_backoff(3), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_capped() {
        let policy = RetryPolicy {
            use_jitter: false,
            initial_backoff_ms: 1000,
            backoff_multiplier: 10.0,
            max_backoff_ms: 5000,
            ..Default::default()
        };
        assert_eq!(policy.calculate_backoff(2), Duration::from_millis(5000));
    }

    #[test]
    fn test_backoff_with_jitter_within_bounds() {
        let policy = RetryPolicy::default();
        let backoff = policy.calculate_backoff(1);
        assert!(backoff.as_millis() >= 75 && backoff.as_millis() <= 125);
    }

    #[tokio::test]
    async fn test_succeeds_first_try() {
        let executor = RetryExecutor::new(fast_policy(3));
        let calls = AtomicUsize::new(0);

        let result = executor
            .execute(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<_, WooError>(42) }
                },
                |_, _| {},
            )
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_retryable_status_then_succeeds() {
        let executor = RetryExecutor::new(fast_policy(3));
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let result = executor
            .execute(
                move || {
                    let n = calls_clone.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n < 2 {
                            Err(WooError::api(503, "products", "maintenance"))
                        } else {
                            Ok(7)
                        }
                    }
                },
                |_, _| {},
            )
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_propagates_immediately() {
        let executor = RetryExecutor::new(fast_policy(3));
        let calls = AtomicUsize::new(0);

        let result: WooResult<()> = executor
            .execute(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(WooError::api(400, "orders", "bad request")) }
                },
                |_, _| {},
            )
            .await;

        assert!(matches!(result, Err(WooError::Api { status: 400, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_rethrows_last_error() {
        let executor = RetryExecutor::new(fast_policy(2));
        let calls = AtomicUsize::new(0);

        let result: WooResult<()> = executor
            .execute(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(WooError::api(503, "orders", "down")) }
                },
                |_, _| {},
            )
            .await;

        assert!(matches!(result, Err(WooError::Api { status: 503, .. })));
        // Initial attempt + 2 retries.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_on_retry_observer_sees_attempts() {
        let executor = RetryExecutor::new(fast_policy(2));
        let observed = Arc::new(std::sync::Mutex::new(Vec::new()));
        let observed_clone = observed.clone();

        let _: WooResult<()> = executor
            .execute(
                || async { Err(WooError::api(500, "coupons", "boom")) },
                move |err, attempt| {
                    observed_clone
                        .lock()
                        .unwrap()
                        .push((err.status().unwrap_or(0), attempt));
                },
            )
            .await;

        assert_eq!(&*observed.lock().unwrap(), &[(500, 1), (500, 2)]);
    }

    #[tokio::test]
    async fn test_deadline_maps_to_cancelled() {
        let executor = RetryExecutor::new(fast_policy(50));

        let result: WooResult<()> = executor
            .execute_with_deadline(
                "orders",
                Duration::from_millis(20),
                || async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Err(WooError::api(503, "orders", "slow"))
                },
                |_, _| {},
            )
            .await;

        assert!(matches!(result, Err(WooError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn test_cancelled_error_not_retried() {
        let executor = RetryExecutor::new(fast_policy(5));
        let calls = AtomicUsize::new(0);

        let result: WooResult<()> = executor
            .execute(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async {
                        Err(WooError::Cancelled {
                            endpoint: "orders".to_string(),
                        })
                    }
                },
                |_, _| {},
            )
            .await;

        assert!(matches!(result, Err(WooError::Cancelled { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
