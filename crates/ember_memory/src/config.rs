//! # Memory Configuration
//!
//! Startup knobs for the allocation core, loaded once from TOML alongside
//! the rest of the engine config.

use serde::{Deserialize, Serialize};

/// Startup configuration for the block allocator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Usable arena size in bytes (grown for the bitmap, then
    /// page-aligned).
    pub arena_bytes: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            // 64 MiB covers the render command buffers and object pools
            // of a typical scene.
            arena_bytes: 64 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_from_toml() {
        let config: MemoryConfig = toml::from_str("arena_bytes = 1048576").unwrap();
        assert_eq!(config.arena_bytes, 1024 * 1024);
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: MemoryConfig = toml::from_str("").unwrap();
        assert_eq!(config, MemoryConfig::default());
    }
}
