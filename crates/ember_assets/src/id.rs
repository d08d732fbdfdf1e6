//! # Asset Identifiers
//!
//! An [`AssetId`] is the FNV-1a 64-bit hash of an asset's logical name
//! (its baked path string). Hashing happens at bake time or in `const`
//! context; collisions between baked names are a bake-time error, never a
//! runtime concern.

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a 64-bit hash.
#[must_use]
pub const fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// Identity of a baked asset.
///
/// `0` is the reserved empty-slot sentinel and `u64::MAX` the reserved
/// tombstone sentinel; neither is a valid asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(u64);

impl AssetId {
    /// Hashes a logical asset name.
    ///
    /// Usable in `const` context, so asset ids can be compile-time
    /// constants next to the code that loads them.
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        Self(fnv1a64(name.as_bytes()))
    }

    /// Wraps a raw hash value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw hash value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns `false` for the reserved sentinels.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0 && self.0 != u64::MAX
    }
}
