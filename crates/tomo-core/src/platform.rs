//! Platform keys and per-platform external id mapping.
//!
//! Every syncable entity carries an [`ExternalIds`] map recording, per store
//! platform, the numeric id of the mirrored record on that platform. Absence
//! of an entry means "not yet synced to that platform". A legacy singular
//! `woo_id` field mirrors the primary platform and is kept consistent through
//! [`ExternalIds::set`] callers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// One of the independently operated WooCommerce store targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Spanish store (primary platform; mirrored in the legacy `woo_id`).
    Es,
    /// Mexican store.
    Mx,
    /// Argentinian store.
    Ar,
}

impl Platform {
    /// All known platforms, in declaration order.
    pub const ALL: [Platform; 3] = [Platform::Es, Platform::Mx, Platform::Ar];

    /// The primary platform whose external id is mirrored into the legacy
    /// singular `woo_id` field.
    #[must_use]
    pub fn primary() -> Self {
        Platform::Es
    }

    /// String key used in external-id maps and cache keys.
    #[must_use]
    pub fn as_key(&self) -> &'static str {
        match self {
            Platform::Es => "es",
            Platform::Mx => "mx",
            Platform::Ar => "ar",
        }
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_key())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "es" => Ok(Platform::Es),
            "mx" => Ok(Platform::Mx),
            "ar" => Ok(Platform::Ar),
            _ => Err(format!("Unknown platform key: {s}")),
        }
    }
}

/// Per-entity mapping from platform key to external record id.
///
/// Invariant: at most one external id per platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalIds(BTreeMap<Platform, i64>);

impl ExternalIds {
    /// Create an empty map (entity not synced anywhere).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// External id for the given platform, if the entity is synced there.
    #[must_use]
    pub fn get(&self, platform: Platform) -> Option<i64> {
        self.0.get(&platform).copied()
    }

    /// Record the external id for a platform, replacing any previous value.
    pub fn set(&mut self, platform: Platform, external_id: i64) {
        self.0.insert(platform, external_id);
    }

    /// Forget the external id for a platform (read-repair after a confirmed
    /// remote delete).
    pub fn clear(&mut self, platform: Platform) -> Option<i64> {
        self.0.remove(&platform)
    }

    /// Whether the entity has been synced to the given platform.
    #[must_use]
    pub fn is_synced(&self, platform: Platform) -> bool {
        self.0.contains_key(&platform)
    }

    /// Whether the entity is synced to no platform at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over (platform, external id) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Platform, i64)> + '_ {
        self.0.iter().map(|(p, id)| (*p, *id))
    }

    /// The id that the legacy singular `woo_id` field must mirror.
    #[must_use]
    pub fn legacy_primary(&self) -> Option<i64> {
        self.get(Platform::primary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_key_roundtrip() {
        for platform in Platform::ALL {
            let parsed: Platform = platform.as_key().parse().unwrap();
            assert_eq!(parsed, platform);
        }
    }

    #[test]
    fn test_platform_parse_case_insensitive() {
        assert_eq!("ES".parse::<Platform>().unwrap(), Platform::Es);
    }

    #[test]
    fn test_platform_parse_unknown() {
        assert!("us".parse::<Platform>().is_err());
    }

    #[test]
    fn test_external_ids_one_per_platform() {
        let mut ids = ExternalIds::new();
        ids.set(Platform::Es, 10);
        ids.set(Platform::Es, 20);
        assert_eq!(ids.get(Platform::Es), Some(20));
        assert_eq!(ids.iter().count(), 1);
    }

    #[test]
    fn test_external_ids_absence_means_unsynced() {
        let ids = ExternalIds::new();
        assert!(!ids.is_synced(Platform::Mx));
        assert_eq!(ids.get(Platform::Mx), None);
    }

    #[test]
    fn test_external_ids_clear() {
        let mut ids = ExternalIds::new();
        ids.set(Platform::Ar, 7);
        assert_eq!(ids.clear(Platform::Ar), Some(7));
        assert!(ids.is_empty());
    }

    #[test]
    fn test_legacy_primary_mirrors_es() {
        let mut ids = ExternalIds::new();
        ids.set(Platform::Mx, 5);
        assert_eq!(ids.legacy_primary(), None);
        ids.set(Platform::Es, 9);
        assert_eq!(ids.legacy_primary(), Some(9));
    }

    #[test]
    fn test_external_ids_serialization() {
        let mut ids = ExternalIds::new();
        ids.set(Platform::Es, 555);
        let json = serde_json::to_string(&ids).unwrap();
        assert_eq!(json, r#"{"es":555}"#);
        let back: ExternalIds = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ids);
    }
}
