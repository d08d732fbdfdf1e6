//! # Asset Cache
//!
//! The reservation-backed asset store. One [`VirtualRegion`] holds, in
//! order: the baked manifest, the refcounted hash table, then asset
//! images committed page by page as loads stream in.
//!
//! ## Lifecycle
//!
//! ```text
//! load (miss)   resolve path -> read file -> commit pages -> insert, rc=1
//! load (hit)    rc += 1, return the cached image offset
//! unload        rc -= 1; at zero the slot becomes a tombstone and the
//!               image bytes are wiped (the pages stay committed)
//! ```
//!
//! Deleted slots are tombstones rather than holes so that probe chains
//! built before a deletion keep finding their assets; inserts reuse the
//! first tombstone they walk over.

use std::path::Path;

use ember_platform::{page_size, BinaryFile, PlatformError, VirtualRegion};

use crate::error::{AssetError, AssetResult};
use crate::id::{fnv1a64, AssetId};
use crate::manifest::{self, ManifestHeader};
use crate::mesh::{MeshAsset, MESH_PRELUDE};
use crate::render::{RenderBufferInfo, RenderBufferKind, RenderDevice};
use crate::types::{AssetType, TAG_SIZE};

/// Byte size of one hash-table slot: `{key: u64, refcount: u32,
/// image_len: u32, offset: u64}`.
pub const ENTRY_SIZE: usize = 24;

/// Key value of a never-used slot.
const KEY_EMPTY: u64 = 0;

/// Key value of a deleted slot. Probes walk over it, inserts reuse it.
const KEY_TOMBSTONE: u64 = u64::MAX;

/// Outcome of a probe: either the slot holding the key, or the slot a
/// subsequent insert should claim.
struct Probe {
    found: Option<usize>,
    insert_slot: Option<usize>,
}

/// The engine's asset cache.
///
/// Single-threaded, like the rest of the engine core. All returned
/// offsets index into the committed prefix of the backing region and
/// stay valid until the final unload of the owning asset.
#[derive(Debug)]
pub struct AssetCache {
    region: VirtualRegion,
    manifest_header: ManifestHeader,
    manifest_len: usize,
    table_offset: usize,
    table_entries: usize,
}

impl AssetCache {
    /// Builds a cache over a fresh reservation of `reserve_bytes`,
    /// reading the manifest from `manifest_path`.
    ///
    /// The reservation must be a power of two. The hash table gets one
    /// slot per reserved page left after the manifest, so the table can
    /// never fill before the page budget does.
    ///
    /// # Errors
    ///
    /// [`AssetError::InvalidCapacity`] for a non-power-of-two size,
    /// [`AssetError::CapacityTooSmall`] if the manifest and table do not
    /// fit, [`AssetError::ManifestUnavailable`] /
    /// [`AssetError::ManifestCorrupt`] for manifest failures.
    pub fn new(reserve_bytes: usize, manifest_path: impl AsRef<Path>) -> AssetResult<Self> {
        if !reserve_bytes.is_power_of_two() {
            return Err(AssetError::InvalidCapacity {
                bytes: reserve_bytes,
            });
        }

        let mut region = VirtualRegion::reserve(reserve_bytes).map_err(platform)?;

        let path = manifest_path.as_ref();
        let mut file = BinaryFile::open(path).map_err(|err| AssetError::ManifestUnavailable {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;

        let manifest_len = file.len();
        region.commit(manifest_len).map_err(|err| match err {
            PlatformError::RegionExhausted { .. } => AssetError::CapacityTooSmall {
                bytes: reserve_bytes,
            },
            other => platform(other),
        })?;
        file.read_into(&mut region.bytes_mut()[..manifest_len])
            .map_err(|err| AssetError::ManifestUnavailable {
                path: path.display().to_string(),
                reason: err.to_string(),
            })?;

        let manifest_header = ManifestHeader::parse(&region.bytes()[..manifest_len])?;

        // One table slot per page of remaining budget.
        let page = page_size();
        let total_pages = region.reserved() / page;
        let manifest_pages = region.committed() / page;
        let table_entries = total_pages - manifest_pages;
        if table_entries == 0 {
            return Err(AssetError::CapacityTooSmall {
                bytes: reserve_bytes,
            });
        }

        // Fresh pages are zeroed, so every slot starts KEY_EMPTY.
        let table_offset = region
            .commit(table_entries * ENTRY_SIZE)
            .map_err(|err| match err {
                PlatformError::RegionExhausted { .. } => AssetError::CapacityTooSmall {
                    bytes: reserve_bytes,
                },
                other => platform(other),
            })?;

        tracing::info!(
            reserved = region.reserved(),
            manifest_len,
            assets = manifest_header.count,
            table_entries,
            "asset cache online"
        );

        Ok(Self {
            region,
            manifest_header,
            manifest_len,
            table_offset,
            table_entries,
        })
    }

    /// Loads an asset, returning the byte offset of its image within the
    /// cache.
    ///
    /// A repeat load of a resident asset is an O(1) refcount bump that
    /// returns the same offset. A miss resolves the id through the
    /// manifest, reads the file into freshly committed pages, and claims
    /// a hash slot. Mesh assets get an 8-byte prelude in front of the
    /// file image; when `device` is given, their vertex and index
    /// payloads are uploaded and the minted buffer handles written into
    /// that prelude.
    ///
    /// # Errors
    ///
    /// [`AssetError::ReservedId`] for a sentinel id,
    /// [`AssetError::NotFound`] if the id resolves to no readable baked
    /// file, [`AssetError::OutOfPages`] when the page budget is spent,
    /// [`AssetError::TableFull`] when every slot is occupied.
    pub fn load_asset(
        &mut self,
        id: AssetId,
        device: Option<&mut dyn RenderDevice>,
    ) -> AssetResult<usize> {
        if !id.is_valid() {
            return Err(AssetError::ReservedId(id));
        }

        let probe = self.probe(id);
        if let Some(slot) = probe.found {
            let (_, refcount, _, offset) = self.read_slot(slot);
            self.write_slot_refcount(slot, refcount + 1);
            tracing::debug!(?id, offset, refcount = refcount + 1, "asset cache hit");
            return Ok(offset as usize);
        }

        let slot = probe.insert_slot.ok_or(AssetError::TableFull {
            entries: self.table_entries,
        })?;

        // Resolve through the perfect hash, then confirm the hit really
        // is this id: a never-baked id lands on some other asset's slot.
        let path = manifest::resolve(self.manifest_bytes(), &self.manifest_header, id)?.to_owned();
        if fnv1a64(path.as_bytes()) != id.value() {
            tracing::warn!(?id, "asset id not in manifest");
            return Err(AssetError::NotFound(id));
        }

        let mut file = match BinaryFile::open(&path) {
            Ok(file) => file,
            Err(err) => {
                tracing::warn!(?id, path = %path, %err, "baked asset file unreadable");
                return Err(AssetError::NotFound(id));
            }
        };

        if file.len() < TAG_SIZE {
            return Err(AssetError::AssetCorrupt {
                id,
                reason: format!("{} bytes is too short for a type tag", file.len()),
            });
        }

        let mut tag = [0u8; TAG_SIZE];
        file.read_into(&mut tag).map_err(platform)?;
        file.rewind().map_err(platform)?;
        let asset_type = AssetType::from_tag(u32::from_le_bytes(tag));

        let prelude = match asset_type {
            AssetType::Mesh => MESH_PRELUDE,
            _ => 0,
        };
        let image_len = prelude + file.len();

        let offset = self.commit_pages(image_len)?;
        file.read_into(&mut self.region.bytes_mut()[offset + prelude..offset + image_len])
            .map_err(platform)?;

        if asset_type == AssetType::Mesh {
            if let Some(device) = device {
                self.prepare_mesh(id, offset, image_len, device)?;
            }
        }

        self.write_slot(slot, id.value(), 1, image_len as u32, offset as u64);
        tracing::info!(?id, path = %path, offset, image_len, "asset loaded");
        Ok(offset)
    }

    /// Releases one reference to an asset.
    ///
    /// The final release tombstones the hash slot and wipes the image
    /// bytes; the pages stay committed and are not reused. Unloading an
    /// asset that is not resident is a logged no-op.
    pub fn unload_asset(&mut self, id: AssetId) {
        let Some(slot) = self.probe(id).found else {
            tracing::warn!(?id, "unload of non-resident asset");
            return;
        };

        let (_, refcount, image_len, offset) = self.read_slot(slot);
        if refcount > 1 {
            self.write_slot_refcount(slot, refcount - 1);
            tracing::debug!(?id, refcount = refcount - 1, "asset released");
            return;
        }

        let offset = offset as usize;
        let len = image_len as usize;
        self.region.bytes_mut()[offset..offset + len].fill(0);
        self.write_slot(slot, KEY_TOMBSTONE, 0, 0, 0);
        tracing::info!(?id, offset, "asset unloaded");
    }

    /// Commits enough fresh pages to hold `bytes`, returning their byte
    /// offset within the cache.
    ///
    /// # Errors
    ///
    /// [`AssetError::OutOfPages`] when the reservation is spent.
    pub fn commit_pages(&mut self, bytes: usize) -> AssetResult<usize> {
        self.region.commit(bytes).map_err(|err| match err {
            PlatformError::RegionExhausted { requested, .. } => {
                AssetError::OutOfPages { requested }
            }
            other => platform(other),
        })
    }

    /// A view of `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// [`AssetError::OutOfBounds`] past the committed prefix.
    pub fn bytes(&self, offset: usize, len: usize) -> AssetResult<&[u8]> {
        let committed = self.region.committed();
        let end = offset.checked_add(len).filter(|&end| end <= committed);
        match end {
            Some(end) => Ok(&self.region.bytes()[offset..end]),
            None => Err(AssetError::OutOfBounds {
                offset,
                len,
                committed,
            }),
        }
    }

    /// A mutable view of `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// [`AssetError::OutOfBounds`] past the committed prefix.
    pub fn bytes_mut(&mut self, offset: usize, len: usize) -> AssetResult<&mut [u8]> {
        let committed = self.region.committed();
        let end = offset.checked_add(len).filter(|&end| end <= committed);
        match end {
            Some(end) => Ok(&mut self.region.bytes_mut()[offset..end]),
            None => Err(AssetError::OutOfBounds {
                offset,
                len,
                committed,
            }),
        }
    }

    /// Current reference count of an asset, or `None` if not resident.
    #[must_use]
    pub fn refcount(&self, id: AssetId) -> Option<u32> {
        self.probe(id).found.map(|slot| self.read_slot(slot).1)
    }

    /// Returns `true` if the asset is resident.
    #[must_use]
    pub fn is_loaded(&self, id: AssetId) -> bool {
        self.probe(id).found.is_some()
    }

    /// Total hash-table slot count.
    #[inline]
    #[must_use]
    pub const fn table_entries(&self) -> usize {
        self.table_entries
    }

    /// Committed prefix length in bytes.
    #[inline]
    #[must_use]
    pub const fn committed(&self) -> usize {
        self.region.committed()
    }

    /// Total reserved size in bytes.
    #[inline]
    #[must_use]
    pub const fn reserved(&self) -> usize {
        self.region.reserved()
    }

    fn manifest_bytes(&self) -> &[u8] {
        &self.region.bytes()[..self.manifest_len]
    }

    /// Linear probe from the key's home slot. Tombstones are walked over
    /// but remembered as the insert candidate; the scan is bounded by the
    /// table size so a tombstone-saturated table still terminates.
    fn probe(&self, id: AssetId) -> Probe {
        let entries = self.table_entries;
        let home = (id.value() % entries as u64) as usize;
        let mut insert_slot = None;

        for step in 0..entries {
            let slot = (home + step) % entries;
            let key = self.read_slot(slot).0;

            if key == KEY_EMPTY {
                return Probe {
                    found: None,
                    insert_slot: insert_slot.or(Some(slot)),
                };
            }
            if key == KEY_TOMBSTONE {
                insert_slot = insert_slot.or(Some(slot));
                continue;
            }
            if key == id.value() {
                return Probe {
                    found: Some(slot),
                    insert_slot: None,
                };
            }
        }

        Probe {
            found: None,
            insert_slot,
        }
    }

    fn slot_base(&self, slot: usize) -> usize {
        self.table_offset + slot * ENTRY_SIZE
    }

    fn read_slot(&self, slot: usize) -> (u64, u32, u32, u64) {
        let base = self.slot_base(slot);
        let bytes = &self.region.bytes()[base..base + ENTRY_SIZE];
        (
            read_u64(bytes, 0),
            read_u32(bytes, 8),
            read_u32(bytes, 12),
            read_u64(bytes, 16),
        )
    }

    fn write_slot(&mut self, slot: usize, key: u64, refcount: u32, image_len: u32, offset: u64) {
        let base = self.slot_base(slot);
        let bytes = &mut self.region.bytes_mut()[base..base + ENTRY_SIZE];
        bytes[0..8].copy_from_slice(&key.to_le_bytes());
        bytes[8..12].copy_from_slice(&refcount.to_le_bytes());
        bytes[12..16].copy_from_slice(&image_len.to_le_bytes());
        bytes[16..24].copy_from_slice(&offset.to_le_bytes());
    }

    fn write_slot_refcount(&mut self, slot: usize, refcount: u32) {
        let base = self.slot_base(slot) + 8;
        self.region.bytes_mut()[base..base + 4].copy_from_slice(&refcount.to_le_bytes());
    }

    /// Uploads a freshly loaded mesh's buffers and records the minted
    /// handles in the image prelude.
    fn prepare_mesh(
        &mut self,
        id: AssetId,
        offset: usize,
        image_len: usize,
        device: &mut dyn RenderDevice,
    ) -> AssetResult<()> {
        let (vertex_id, index_id) = {
            let image = self.bytes(offset, image_len)?;
            let mesh = MeshAsset::parse(image).map_err(|err| AssetError::AssetCorrupt {
                id,
                reason: err.to_string(),
            })?;

            let vertex_id = device.create_buffer(RenderBufferInfo {
                data: mesh.vertex_bytes()?,
                stride: mesh.header.vertices.stride,
                kind: RenderBufferKind::Vertex,
            })?;
            let index_id = device.create_buffer(RenderBufferInfo {
                data: mesh.index_bytes()?,
                stride: 0,
                kind: RenderBufferKind::Index,
            })?;
            (vertex_id, index_id)
        };

        let prelude = self.bytes_mut(offset, MESH_PRELUDE)?;
        prelude[0..4].copy_from_slice(&vertex_id.raw().to_le_bytes());
        prelude[4..8].copy_from_slice(&index_id.raw().to_le_bytes());
        Ok(())
    }
}

fn platform(err: PlatformError) -> AssetError {
    AssetError::Platform(err.to_string())
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        let id = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("ember_cache_test_{id}_{name}"))
    }

    /// Bakes a one-entry manifest whose single path is `asset_path`.
    fn bake_manifest(asset_path: &str) -> PathBuf {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        bytes.extend_from_slice(&8i64.to_le_bytes());
        bytes.extend_from_slice(asset_path.as_bytes());
        bytes.push(0);

        let path = temp_path("manifest.bin");
        std::fs::File::create(&path).unwrap().write_all(&bytes).unwrap();
        path
    }

    #[test]
    fn test_rejects_non_pow2_reservation() {
        let err = AssetCache::new(3000, "unused").unwrap_err();
        assert!(matches!(err, AssetError::InvalidCapacity { bytes: 3000 }));
    }

    #[test]
    fn test_missing_manifest() {
        let err = AssetCache::new(1 << 20, "/nonexistent/manifest.bin").unwrap_err();
        assert!(matches!(err, AssetError::ManifestUnavailable { .. }));
    }

    #[test]
    fn test_table_sized_from_remaining_pages() {
        let manifest = bake_manifest("/nonexistent/asset.bin");
        let reserve = page_size() * 64;
        let cache = AssetCache::new(reserve, &manifest).unwrap();

        // One page of manifest leaves 63 pages of budget, one slot each.
        assert_eq!(cache.table_entries(), 63);

        std::fs::remove_file(&manifest).ok();
    }

    #[test]
    fn test_unresolvable_id_is_not_found() {
        let manifest = bake_manifest("/nonexistent/asset.bin");
        let mut cache = AssetCache::new(page_size() * 64, &manifest).unwrap();

        // Hashes to some slot of the one-entry manifest, but the stored
        // path hashes differently.
        let err = cache.load_asset(AssetId::from_name("never-baked"), None).unwrap_err();
        assert!(matches!(err, AssetError::NotFound(_)));

        std::fs::remove_file(&manifest).ok();
    }

    #[test]
    fn test_sentinel_ids_rejected() {
        let manifest = bake_manifest("/nonexistent/asset.bin");
        let mut cache = AssetCache::new(page_size() * 64, &manifest).unwrap();

        for raw in [0, u64::MAX] {
            let err = cache.load_asset(AssetId::from_raw(raw), None).unwrap_err();
            assert!(matches!(err, AssetError::ReservedId(_)));
        }

        std::fs::remove_file(&manifest).ok();
    }

    #[test]
    fn test_commit_pages_and_bounds() {
        let manifest = bake_manifest("/nonexistent/asset.bin");
        let mut cache = AssetCache::new(page_size() * 64, &manifest).unwrap();

        let offset = cache.commit_pages(100).unwrap();
        assert!(cache.bytes(offset, 100).is_ok());
        assert!(cache
            .bytes(cache.committed(), 1)
            .is_err_and(|err| matches!(err, AssetError::OutOfBounds { .. })));

        // Spending the whole budget is recoverable.
        let err = cache.commit_pages(cache.reserved()).unwrap_err();
        assert!(matches!(err, AssetError::OutOfPages { .. }));

        std::fs::remove_file(&manifest).ok();
    }
}
