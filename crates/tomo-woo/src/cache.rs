//! In-process memoization of external taxonomy lookups.
//!
//! Keys follow the scheme `{platform}:attribute:{slug}` for attribute
//! definitions and `{platform}:term:{attribute_id}:{identity}` for terms,
//! where the identity prefers the stable internal document id over the
//! lowercased name (names can collide or be renamed; the stable id cannot).
//!
//! The cache is best-effort: racing callers may populate it redundantly and
//! entries may go stale. Callers re-validate before trusting a cached id in
//! hot paths and fall back to find-or-create on a miss or 404.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use tomo_core::Platform;

/// A cached external attribute definition.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedAttribute {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// A cached external term (attribute term, category or tag).
#[derive(Debug, Clone, PartialEq)]
pub struct CachedTerm {
    pub id: i64,
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

/// Pluggable cache abstraction owned by the orchestration layer.
///
/// No expiry is required for correctness; an implementation may add TTL.
#[async_trait]
pub trait TermCache: Send + Sync {
    /// Look up an attribute definition.
    async fn get_attribute(&self, key: &str) -> Option<CachedAttribute>;

    /// Store an attribute definition.
    async fn set_attribute(&self, key: String, value: CachedAttribute);

    /// Look up a term.
    async fn get_term(&self, key: &str) -> Option<CachedTerm>;

    /// Store a term.
    async fn set_term(&self, key: String, value: CachedTerm);

    /// Evict an entry of either kind.
    async fn delete(&self, key: &str);
}

/// Cache key for an attribute definition.
#[must_use]
pub fn attribute_key(platform: Platform, slug: &str) -> String {
    format!("{}:attribute:{}", platform.as_key(), slug)
}

/// Cache key for a term under an attribute (or a native taxonomy, using a
/// pseudo attribute id such as `category`/`tag`).
#[must_use]
pub fn term_key(platform: Platform, attribute: &str, identity: &str) -> String {
    format!("{}:term:{}:{}", platform.as_key(), attribute, identity)
}

/// Identity component of a term cache key: the stable id when available,
/// else the trimmed lowercased name.
#[must_use]
pub fn term_identity(stable_id: Option<&str>, name: &str) -> String {
    match stable_id {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => name.trim().to_lowercase(),
    }
}

/// In-memory cache backed by a `RwLock<HashMap>`.
#[derive(Default)]
pub struct InMemoryTermCache {
    attributes: RwLock<HashMap<String, CachedAttribute>>,
    terms: RwLock<HashMap<String, CachedTerm>>,
}

impl InMemoryTermCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TermCache for InMemoryTermCache {
    async fn get_attribute(&self, key: &str) -> Option<CachedAttribute> {
        self.attributes.read().await.get(key).cloned()
    }

    async fn set_attribute(&self, key: String, value: CachedAttribute) {
        self.attributes.write().await.insert(key, value);
    }

    async fn get_term(&self, key: &str) -> Option<CachedTerm> {
        self.terms.read().await.get(key).cloned()
    }

    async fn set_term(&self, key: String, value: CachedTerm) {
        self.terms.write().await.insert(key, value);
    }

    async fn delete(&self, key: &str) {
        self.attributes.write().await.remove(key);
        self.terms.write().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_scheme() {
        assert_eq!(attribute_key(Platform::Es, "autor"), "es:attribute:autor");
        assert_eq!(
            term_key(Platform::Mx, "12", "abc123"),
            "mx:term:12:abc123"
        );
    }

    #[test]
    fn test_identity_prefers_stable_id() {
        assert_eq!(term_identity(Some("deadbeef"), "Borges"), "deadbeef");
        assert_eq!(term_identity(None, "  Borges "), "borges");
        assert_eq!(term_identity(Some(""), "Borges"), "borges");
    }

    #[tokio::test]
    async fn test_set_get_delete_roundtrip() {
        let cache = InMemoryTermCache::new();
        let key = term_key(Platform::Es, "3", "borges");
        let term = CachedTerm {
            id: 77,
            name: "Borges".to_string(),
            slug: Some("borges".to_string()),
            description: None,
        };

        assert!(cache.get_term(&key).await.is_none());
        cache.set_term(key.clone(), term.clone()).await;
        assert_eq!(cache.get_term(&key).await, Some(term));
        cache.delete(&key).await;
        assert!(cache.get_term(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_attribute_and_term_namespaces_are_separate() {
        let cache = InMemoryTermCache::new();
        cache
            .set_attribute(
                "es:attribute:autor".to_string(),
                CachedAttribute {
                    id: 1,
                    name: "Autor".to_string(),
                    slug: "autor".to_string(),
                },
            )
            .await;
        assert!(cache.get_term("es:attribute:autor").await.is_none());
        assert!(cache.get_attribute("es:attribute:autor").await.is_some());
    }
}
