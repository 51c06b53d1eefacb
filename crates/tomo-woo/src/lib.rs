//! WooCommerce store access layer.
//!
//! This crate owns everything that touches the store HTTP APIs: per-platform
//! configuration, token-bucket rate limiting, retry with exponential backoff,
//! the typed REST client, payload types in the store's wire shape, a term
//! cache and the find-or-create routines for attributes, terms, categories
//! and tags.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod retry;
pub mod terms;
pub mod types;

pub use cache::{
    attribute_key, term_identity, term_key, CachedAttribute, CachedTerm, InMemoryTermCache,
    TermCache,
};
pub use client::{WooClient, WooClientSet, DEFAULT_PAGE_SIZE};
pub use config::{ConnectionSettings, PlatformConfigs, WooConfig};
pub use error::{WooError, WooResult};
pub use rate_limit::{RateLimitConfig, RateLimitGuard, RateLimiter};
pub use retry::{RetryExecutor, RetryPolicy};
pub use terms::{capped_slug, TERM_SLUG_MAX_LEN};
pub use types::{
    WooAddress, WooAttribute, WooAttributeTerm, WooCategory, WooCoupon, WooCustomer, WooImage,
    WooLineItem, WooMetaData, WooOrder, WooProduct, WooProductAttribute, WooTag, WooTermRef,
};
