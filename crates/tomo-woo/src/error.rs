//! WooCommerce client error types.
//!
//! A small closed set of variants so retry and orchestration logic can
//! dispatch on kind instead of probing loosely-typed fields.

use thiserror::Error;

/// Error that can occur while talking to a WooCommerce store.
#[derive(Debug, Error)]
pub enum WooError {
    /// The platform is not (fully) configured.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A required field was missing or malformed before any network call.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The store answered with a non-2xx status.
    ///
    /// `retry_after` carries the parsed `Retry-After` header in seconds when
    /// the store sent one with a 429.
    #[error("API error {status} on {endpoint}: {body}")]
    Api {
        status: u16,
        endpoint: String,
        body: String,
        retry_after: Option<u64>,
    },

    /// The request never produced a response (connect failure, timeout, DNS).
    #[error("network error on {endpoint}: {message}")]
    Network {
        endpoint: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The caller's deadline elapsed; never retried.
    #[error("operation cancelled on {endpoint}")]
    Cancelled { endpoint: String },

    /// A response body could not be decoded into the expected shape.
    #[error("serialization error: {message}")]
    Serialization { message: String },
}

impl WooError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        WooError::Configuration {
            message: message.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        WooError::Validation {
            message: message.into(),
        }
    }

    /// Create an API error from a response.
    pub fn api(status: u16, endpoint: impl Into<String>, body: impl Into<String>) -> Self {
        WooError::Api {
            status,
            endpoint: endpoint.into(),
            body: body.into(),
            retry_after: None,
        }
    }

    /// Create a network error with its source.
    pub fn network(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        WooError::Network {
            endpoint: endpoint.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        WooError::Serialization {
            message: message.into(),
        }
    }

    /// HTTP status of the failing response, if there was one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            WooError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this error is a 404 from the store.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Whether this error may be retried given the set of retryable statuses.
    ///
    /// Network errors without a response are always considered retryable;
    /// cancellation never is.
    #[must_use]
    pub fn is_retryable(&self, retryable_statuses: &[u16]) -> bool {
        match self {
            WooError::Api { status, .. } => retryable_statuses.contains(status),
            WooError::Network { .. } => true,
            _ => false,
        }
    }

    /// Retry-After hint in seconds, if the store sent one.
    #[must_use]
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            WooError::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Result type for WooCommerce client operations.
pub type WooResult<T> = Result<T, WooError>;

#[cfg(test)]
mod tests {
    use super::*;

    const RETRYABLE: [u16; 5] = [429, 500, 502, 503, 504];

    #[test]
    fn test_api_error_retryability() {
        for status in RETRYABLE {
            assert!(WooError::api(status, "products", "").is_retryable(&RETRYABLE));
        }
        assert!(!WooError::api(400, "products", "").is_retryable(&RETRYABLE));
        assert!(!WooError::api(404, "products", "").is_retryable(&RETRYABLE));
    }

    #[test]
    fn test_network_error_is_retryable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(WooError::network("orders", io).is_retryable(&RETRYABLE));
    }

    #[test]
    fn test_cancelled_never_retryable() {
        let err = WooError::Cancelled {
            endpoint: "orders".to_string(),
        };
        assert!(!err.is_retryable(&RETRYABLE));
    }

    #[test]
    fn test_not_found_detection() {
        assert!(WooError::api(404, "products/9", "gone").is_not_found());
        assert!(!WooError::api(400, "products/9", "bad").is_not_found());
        assert!(!WooError::validation("missing code").is_not_found());
    }

    #[test]
    fn test_error_display_carries_endpoint() {
        let err = WooError::api(503, "coupons", "maintenance");
        assert_eq!(err.to_string(), "API error 503 on coupons: maintenance");
    }
}
