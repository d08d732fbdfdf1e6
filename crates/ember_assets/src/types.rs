//! # Asset Type Tags
//!
//! Every baked asset file begins with a fixed 4-byte type tag; the cache
//! reads it to size the in-memory image and pick the post-load step.

/// Size of the leading type tag in every baked asset file.
pub const TAG_SIZE: usize = 4;

/// Kind of a baked asset.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetType {
    /// Unrecognized tag; loaded as an opaque byte image.
    Unknown = 0,
    /// Texture payload.
    Texture = 1,
    /// Mesh payload (header + vertex/index/texcoord buffers).
    Mesh = 2,
}

impl AssetType {
    /// Decodes a raw tag, mapping unrecognized values to
    /// [`AssetType::Unknown`].
    #[must_use]
    pub const fn from_tag(raw: u32) -> Self {
        match raw {
            1 => Self::Texture,
            2 => Self::Mesh,
            _ => Self::Unknown,
        }
    }

    /// The on-disk tag value.
    #[inline]
    #[must_use]
    pub const fn tag(self) -> u32 {
        self as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip() {
        for ty in [AssetType::Unknown, AssetType::Texture, AssetType::Mesh] {
            assert_eq!(AssetType::from_tag(ty.tag()), ty);
        }
        assert_eq!(AssetType::from_tag(999), AssetType::Unknown);
    }
}
