//! # Asset Manifest
//!
//! The baked lookup table from [`AssetId`] to file path, stored at the
//! front of the cache's reservation and read once at startup.
//!
//! ## Binary Layout
//!
//! ```text
//! ┌──────────────────┬─────────────────────────────────────────┐
//! │ count: u64 LE    │ number of baked assets                  │
//! │ mod:   u64 LE    │ perfect-hash mixer chosen offline       │
//! ├──────────────────┼─────────────────────────────────────────┤
//! │ count × i64 LE   │ path offsets, relative to this array    │
//! ├──────────────────┼─────────────────────────────────────────┤
//! │ packed strings   │ NUL-terminated paths, back to back      │
//! └──────────────────┴─────────────────────────────────────────┘
//! ```
//!
//! The bake tool picks `mod` so that `(fnv1a64(name) ^ mod) % count` is
//! collision-free over every baked name: resolution is one modulo and one
//! offset read, no probing.

use crate::error::{AssetError, AssetResult};
use crate::id::AssetId;

/// Byte size of the `{count, mod}` manifest header.
pub const HEADER_SIZE: usize = 16;

/// Parsed manifest header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestHeader {
    /// Number of baked assets.
    pub count: u64,
    /// Perfect-hash mixer.
    pub xor_mod: u64,
}

impl ManifestHeader {
    /// Parses and sanity-checks the header against the full manifest
    /// image.
    ///
    /// # Errors
    ///
    /// [`AssetError::ManifestCorrupt`] if the image is too short for the
    /// header, the offsets array, or holds no assets at all.
    pub fn parse(bytes: &[u8]) -> AssetResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(AssetError::ManifestCorrupt(format!(
                "{} bytes is too short for a header",
                bytes.len()
            )));
        }

        let count = read_u64(bytes, 0);
        let xor_mod = read_u64(bytes, 8);

        if count == 0 {
            return Err(AssetError::ManifestCorrupt("empty manifest".into()));
        }

        let offsets_end = HEADER_SIZE as u64 + count.saturating_mul(8);
        if offsets_end > bytes.len() as u64 {
            return Err(AssetError::ManifestCorrupt(format!(
                "offsets array for {count} assets exceeds {} bytes",
                bytes.len()
            )));
        }

        Ok(Self { count, xor_mod })
    }
}

/// Resolves an id to its baked path.
///
/// Computes `(id ^ mod) % count`, follows the offset, and reads the
/// NUL-terminated string. The manifest is a perfect hash over the baked
/// names, so there is no probe loop; an id that was never baked lands on
/// some other asset's path, which the caller detects by re-hashing.
///
/// # Errors
///
/// [`AssetError::ManifestCorrupt`] for offsets or strings that leave the
/// image.
pub fn resolve<'a>(
    bytes: &'a [u8],
    header: &ManifestHeader,
    id: AssetId,
) -> AssetResult<&'a str> {
    let index = (id.value() ^ header.xor_mod) % header.count;
    let offset_pos = HEADER_SIZE + (index as usize) * 8;

    let relative = read_i64(bytes, offset_pos);
    let target = (HEADER_SIZE as i64).checked_add(relative).ok_or_else(|| {
        AssetError::ManifestCorrupt(format!("offset overflow at index {index}"))
    })?;

    if target < 0 || target as usize >= bytes.len() {
        return Err(AssetError::ManifestCorrupt(format!(
            "offset {relative} at index {index} leaves the manifest"
        )));
    }

    let start = target as usize;
    let terminator = bytes[start..]
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| {
            AssetError::ManifestCorrupt(format!("unterminated path at index {index}"))
        })?;

    std::str::from_utf8(&bytes[start..start + terminator])
        .map_err(|_| AssetError::ManifestCorrupt(format!("non-UTF-8 path at index {index}")))
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(buf)
}

fn read_i64(bytes: &[u8], offset: usize) -> i64 {
    read_u64(bytes, offset) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a manifest image with the given mixer, in bake-tool layout.
    fn build(names: &[&str], xor_mod: u64) -> Vec<u8> {
        let count = names.len() as u64;
        let mut strings = Vec::new();
        let mut string_offsets = Vec::new();
        for name in names {
            string_offsets.push(strings.len());
            strings.extend_from_slice(name.as_bytes());
            strings.push(0);
        }

        let offsets_len = names.len() * 8;
        let mut out = Vec::new();
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&xor_mod.to_le_bytes());

        // Slot each name at its perfect-hash index.
        let mut slots = vec![0i64; names.len()];
        for (i, name) in names.iter().enumerate() {
            let index = (AssetId::from_name(name).value() ^ xor_mod) % count;
            slots[index as usize] = (offsets_len + string_offsets[i]) as i64;
        }
        for slot in slots {
            out.extend_from_slice(&slot.to_le_bytes());
        }
        out.extend_from_slice(&strings);
        out
    }

    /// Brute-forces a collision-free mixer for a small name set.
    fn find_mod(names: &[&str]) -> u64 {
        let count = names.len() as u64;
        'outer: for candidate in 0..100_000u64 {
            let mut seen = vec![false; names.len()];
            for name in names {
                let index = (AssetId::from_name(name).value() ^ candidate) % count;
                if seen[index as usize] {
                    continue 'outer;
                }
                seen[index as usize] = true;
            }
            return candidate;
        }
        panic!("no perfect mod found");
    }

    #[test]
    fn test_resolve_every_baked_name() {
        let names = ["meshes/cube.mesh", "meshes/ship.mesh", "textures/hull.tex"];
        let xor_mod = find_mod(&names);
        let bytes = build(&names, xor_mod);
        let header = ManifestHeader::parse(&bytes).unwrap();

        for name in names {
            let resolved = resolve(&bytes, &header, AssetId::from_name(name)).unwrap();
            assert_eq!(resolved, name);
        }
    }

    #[test]
    fn test_header_rejects_garbage() {
        assert!(ManifestHeader::parse(&[]).is_err());
        assert!(ManifestHeader::parse(&[0u8; HEADER_SIZE]).is_err());

        // Count claims more offsets than the image holds.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1000u64.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        assert!(ManifestHeader::parse(&bytes).is_err());
    }

    #[test]
    fn test_resolve_rejects_escaping_offset() {
        let names = ["a.mesh"];
        let mut bytes = build(&names, 0);
        // Corrupt the single offset to point past the image.
        let bad = 1_000_000i64.to_le_bytes();
        bytes[HEADER_SIZE..HEADER_SIZE + 8].copy_from_slice(&bad);

        let header = ManifestHeader::parse(&bytes).unwrap();
        assert!(resolve(&bytes, &header, AssetId::from_name("a.mesh")).is_err());
    }
}
