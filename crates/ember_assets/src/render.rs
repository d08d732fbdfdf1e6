//! # Render-Device Seam
//!
//! The one capability the asset cache needs from the graphics backend:
//! turning a span of baked bytes into a GPU buffer during mesh post-load
//! preparation. The backend implements [`RenderDevice`]; the cache never
//! sees anything else of it.

use crate::error::AssetResult;

/// Opaque GPU buffer handle minted by the render backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderBufferId(u32);

impl RenderBufferId {
    /// Wraps a backend-assigned handle value.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw handle value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// What a buffer upload is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderBufferKind {
    /// Vertex data; carries a stride.
    Vertex,
    /// Index data.
    Index,
}

/// One buffer upload request.
#[derive(Debug)]
pub struct RenderBufferInfo<'a> {
    /// The bytes to upload.
    pub data: &'a [u8],
    /// Element stride for vertex buffers; zero for index buffers.
    pub stride: u32,
    /// Buffer usage.
    pub kind: RenderBufferKind,
}

/// Buffer-creation capability of the render backend.
pub trait RenderDevice {
    /// Creates a GPU buffer from `info.data`.
    ///
    /// # Errors
    ///
    /// Backend-specific; surfaced as
    /// [`AssetError::DeviceFailed`](crate::AssetError::DeviceFailed).
    fn create_buffer(&mut self, info: RenderBufferInfo<'_>) -> AssetResult<RenderBufferId>;
}
