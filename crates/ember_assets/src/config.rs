//! # Asset Cache Configuration
//!
//! Deserialized from the engine's TOML config; every field has a default
//! so a partial `[assets]` table, or none at all, still boots.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cache::AssetCache;
use crate::error::AssetResult;

/// Asset cache settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AssetCacheConfig {
    /// Address-space reservation in bytes. Must be a power of two.
    pub reserve_bytes: usize,
    /// Path to the baked asset manifest.
    pub manifest_path: PathBuf,
}

impl Default for AssetCacheConfig {
    fn default() -> Self {
        Self {
            reserve_bytes: 1 << 30,
            manifest_path: PathBuf::from("data/asset_manifest.bin"),
        }
    }
}

impl AssetCache {
    /// Builds a cache from a configuration.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`AssetCache::new`].
    pub fn with_config(config: &AssetCacheConfig) -> AssetResult<Self> {
        AssetCache::new(config.reserve_bytes, &config.manifest_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_reservation_is_pow2() {
        let config = AssetCacheConfig::default();
        assert!(config.reserve_bytes.is_power_of_two());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AssetCacheConfig =
            toml::from_str("manifest_path = \"baked/manifest.bin\"").unwrap();
        assert_eq!(config.manifest_path, PathBuf::from("baked/manifest.bin"));
        assert_eq!(config.reserve_bytes, AssetCacheConfig::default().reserve_bytes);
    }

    #[test]
    fn test_round_trip() {
        let config = AssetCacheConfig::default();
        let text = toml::to_string(&config).unwrap();
        assert_eq!(toml::from_str::<AssetCacheConfig>(&text).unwrap(), config);
    }
}
