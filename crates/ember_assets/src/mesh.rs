//! # Mesh Assets
//!
//! Baked mesh files and their in-cache images.
//!
//! ## File Layout
//!
//! ```text
//! ┌────────────────┬──────────────────────────────────────────┐
//! │ tag: u32 LE    │ AssetType::Mesh                          │
//! │ MeshHeader     │ 56 bytes, see below                      │
//! │ raw buffers    │ vertex / index / texcoord bytes          │
//! └────────────────┴──────────────────────────────────────────┘
//! ```
//!
//! `buffer_start` is the byte offset from the start of the file to the
//! raw buffer region; each sub-range's `start` is relative to that
//! region. The cache prepends an 8-byte prelude to the file image where
//! post-load preparation records the GPU buffer handles.

use crate::error::{AssetError, AssetResult};
use crate::render::RenderBufferId;
use crate::types::TAG_SIZE;

/// Bytes the cache prepends to a mesh file image: vertex and index
/// [`RenderBufferId`]s, each `u32` LE.
pub const MESH_PRELUDE: usize = 8;

/// Serialized size of [`MeshHeader`].
pub const MESH_HEADER_SIZE: usize = 56;

/// Vertex sub-range of a mesh's raw buffer region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VertexRange {
    /// Element count.
    pub count: u32,
    /// Byte offset relative to the raw buffer region.
    pub start: u32,
    /// Byte size.
    pub size: u32,
    /// Per-vertex stride in bytes.
    pub stride: u32,
}

/// Index or texcoord sub-range of a mesh's raw buffer region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshRange {
    /// Element count.
    pub count: u32,
    /// Byte offset relative to the raw buffer region.
    pub start: u32,
    /// Byte size.
    pub size: u32,
}

/// Fixed header describing a mesh file's raw buffer region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshHeader {
    /// Total size of the raw buffer region in bytes.
    pub buffer_size: u64,
    /// Offset from the start of the file to the raw buffer region.
    pub buffer_start: u64,
    /// Vertex data.
    pub vertices: VertexRange,
    /// Index data.
    pub indices: MeshRange,
    /// Texture coordinate data.
    pub texcoords: MeshRange,
}

impl MeshHeader {
    /// Parses a header from its 56-byte serialized form.
    ///
    /// # Errors
    ///
    /// [`AssetError::MeshCorrupt`] if `bytes` is too short.
    pub fn parse(bytes: &[u8]) -> AssetResult<Self> {
        if bytes.len() < MESH_HEADER_SIZE {
            return Err(AssetError::MeshCorrupt(format!(
                "{} bytes is too short for a mesh header",
                bytes.len()
            )));
        }

        Ok(Self {
            buffer_size: read_u64(bytes, 0),
            buffer_start: read_u64(bytes, 8),
            vertices: VertexRange {
                count: read_u32(bytes, 16),
                start: read_u32(bytes, 20),
                size: read_u32(bytes, 24),
                stride: read_u32(bytes, 28),
            },
            indices: MeshRange {
                count: read_u32(bytes, 32),
                start: read_u32(bytes, 36),
                size: read_u32(bytes, 40),
            },
            texcoords: MeshRange {
                count: read_u32(bytes, 44),
                start: read_u32(bytes, 48),
                size: read_u32(bytes, 52),
            },
        })
    }

    /// Serializes the header to its on-disk form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; MESH_HEADER_SIZE] {
        let mut out = [0u8; MESH_HEADER_SIZE];
        out[0..8].copy_from_slice(&self.buffer_size.to_le_bytes());
        out[8..16].copy_from_slice(&self.buffer_start.to_le_bytes());
        out[16..20].copy_from_slice(&self.vertices.count.to_le_bytes());
        out[20..24].copy_from_slice(&self.vertices.start.to_le_bytes());
        out[24..28].copy_from_slice(&self.vertices.size.to_le_bytes());
        out[28..32].copy_from_slice(&self.vertices.stride.to_le_bytes());
        out[32..36].copy_from_slice(&self.indices.count.to_le_bytes());
        out[36..40].copy_from_slice(&self.indices.start.to_le_bytes());
        out[40..44].copy_from_slice(&self.indices.size.to_le_bytes());
        out[44..48].copy_from_slice(&self.texcoords.count.to_le_bytes());
        out[48..52].copy_from_slice(&self.texcoords.start.to_le_bytes());
        out[52..56].copy_from_slice(&self.texcoords.size.to_le_bytes());
        out
    }
}

/// A parsed view over a mesh asset's in-cache image.
#[derive(Debug)]
pub struct MeshAsset<'a> {
    /// GPU vertex buffer minted during post-load preparation.
    pub vertex_buffer: RenderBufferId,
    /// GPU index buffer minted during post-load preparation.
    pub index_buffer: RenderBufferId,
    /// The file's mesh header.
    pub header: MeshHeader,
    /// The complete file image (tag included).
    file: &'a [u8],
}

impl<'a> MeshAsset<'a> {
    /// Parses an image the cache returned for a mesh asset.
    ///
    /// # Errors
    ///
    /// [`AssetError::MeshCorrupt`] if the image is too short or the
    /// header's ranges leave the file.
    pub fn parse(image: &'a [u8]) -> AssetResult<Self> {
        if image.len() < MESH_PRELUDE + TAG_SIZE + MESH_HEADER_SIZE {
            return Err(AssetError::MeshCorrupt(format!(
                "{} bytes is too short for a mesh image",
                image.len()
            )));
        }

        let vertex_buffer = RenderBufferId::new(read_u32(image, 0));
        let index_buffer = RenderBufferId::new(read_u32(image, 4));

        let file = &image[MESH_PRELUDE..];
        let header = MeshHeader::parse(&file[TAG_SIZE..])?;

        let region_end = header
            .buffer_start
            .checked_add(header.buffer_size)
            .ok_or_else(|| AssetError::MeshCorrupt("buffer region overflow".into()))?;
        if region_end > file.len() as u64 {
            return Err(AssetError::MeshCorrupt(format!(
                "buffer region ends at {region_end}, file is {} bytes",
                file.len()
            )));
        }

        Ok(Self {
            vertex_buffer,
            index_buffer,
            header,
            file,
        })
    }

    /// The raw vertex bytes.
    ///
    /// # Errors
    ///
    /// [`AssetError::MeshCorrupt`] if the range leaves the buffer region.
    pub fn vertex_bytes(&self) -> AssetResult<&'a [u8]> {
        self.range_bytes(self.header.vertices.start, self.header.vertices.size)
    }

    /// The raw index bytes.
    ///
    /// # Errors
    ///
    /// [`AssetError::MeshCorrupt`] if the range leaves the buffer region.
    pub fn index_bytes(&self) -> AssetResult<&'a [u8]> {
        self.range_bytes(self.header.indices.start, self.header.indices.size)
    }

    /// The raw texture coordinate bytes.
    ///
    /// # Errors
    ///
    /// [`AssetError::MeshCorrupt`] if the range leaves the buffer region.
    pub fn texcoord_bytes(&self) -> AssetResult<&'a [u8]> {
        self.range_bytes(self.header.texcoords.start, self.header.texcoords.size)
    }

    fn range_bytes(&self, start: u32, size: u32) -> AssetResult<&'a [u8]> {
        let from = self.header.buffer_start + u64::from(start);
        let to = from + u64::from(size);
        if to > self.header.buffer_start + self.header.buffer_size {
            return Err(AssetError::MeshCorrupt(format!(
                "sub-range [{from}, {to}) leaves the buffer region"
            )));
        }
        Ok(&self.file[from as usize..to as usize])
    }
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
    use crate::types::AssetType;

    fn sample_header() -> MeshHeader {
        MeshHeader {
            buffer_size: 30,
            buffer_start: (TAG_SIZE + MESH_HEADER_SIZE) as u64,
            vertices: VertexRange {
                count: 3,
                start: 0,
                size: 24,
                stride: 8,
            },
            indices: MeshRange {
                count: 3,
                start: 24,
                size: 6,
            },
            texcoords: MeshRange::default(),
        }
    }

    fn sample_image() -> Vec<u8> {
        let header = sample_header();
        let mut image = Vec::new();
        image.extend_from_slice(&7u32.to_le_bytes()); // vertex buffer id
        image.extend_from_slice(&8u32.to_le_bytes()); // index buffer id
        image.extend_from_slice(&AssetType::Mesh.tag().to_le_bytes());
        image.extend_from_slice(&header.to_bytes());
        image.extend_from_slice(&[0xAB; 24]); // vertices
        image.extend_from_slice(&[0xCD; 6]); // indices
        image
    }

    #[test]
    fn test_header_round_trip() {
        let header = sample_header();
        assert_eq!(MeshHeader::parse(&header.to_bytes()).unwrap(), header);
    }

    #[test]
    fn test_image_parse() {
        let image = sample_image();
        let mesh = MeshAsset::parse(&image).unwrap();

        assert_eq!(mesh.vertex_buffer.raw(), 7);
        assert_eq!(mesh.index_buffer.raw(), 8);
        assert_eq!(mesh.vertex_bytes().unwrap(), &[0xAB; 24]);
        assert_eq!(mesh.index_bytes().unwrap(), &[0xCD; 6]);
        assert!(mesh.texcoord_bytes().unwrap().is_empty());
    }

    #[test]
    fn test_truncated_image_rejected() {
        let image = sample_image();
        assert!(MeshAsset::parse(&image[..MESH_PRELUDE + 10]).is_err());

        // Header claims more raw bytes than the file carries.
        let mut short = image.clone();
        short.truncate(image.len() - 4);
        assert!(MeshAsset::parse(&short).is_err());
    }
}
