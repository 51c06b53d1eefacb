//! Error types for the sync engine.

use thiserror::Error;
use tomo_woo::WooError;

/// Errors raised by orchestrators, mappers and the reconciliation job.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The engine is misconfigured (missing platform credentials etc).
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The entity cannot be synced as-is.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// A record the operation depends on does not exist.
    #[error("{entity} not found: {key}")]
    NotFound { entity: String, key: String },

    /// A store API call failed.
    #[error(transparent)]
    Api(#[from] WooError),

    /// The entity store failed.
    #[error("Store error: {message}")]
    Store { message: String },
}

impl SyncError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(entity: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            key: key.into(),
        }
    }

    /// Create a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Whether retrying the same call later could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Api(woo) => woo.is_retryable(&[429, 500, 502, 503, 504]),
            Self::Store { .. } => true,
            _ => false,
        }
    }
}

/// Result alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
