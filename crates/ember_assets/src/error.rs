//! # Asset Error Types
//!
//! All errors that can occur in the asset cache. Not-found and
//! out-of-pages are recoverable; corrupt data means a bad bake.

use thiserror::Error;

use crate::id::AssetId;

/// Errors that can occur while loading or unloading assets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// The id is one of the reserved sentinels.
    #[error("asset id {0:?} is reserved")]
    ReservedId(AssetId),

    /// The id resolves to no openable baked file.
    #[error("asset {0:?} not found")]
    NotFound(AssetId),

    /// The cache reservation must be a power of two.
    #[error("cache reservation of {bytes} bytes is not a power of two")]
    InvalidCapacity {
        /// The rejected reservation size.
        bytes: usize,
    },

    /// The reservation is too small to hold the manifest and hash table.
    #[error("cache reservation too small: {bytes} bytes")]
    CapacityTooSmall {
        /// The rejected reservation size.
        bytes: usize,
    },

    /// The manifest file could not be opened or read.
    #[error("manifest unavailable at {path}: {reason}")]
    ManifestUnavailable {
        /// Path the cache was configured with.
        path: String,
        /// Underlying failure.
        reason: String,
    },

    /// The manifest bytes do not describe a valid table.
    #[error("manifest corrupt: {0}")]
    ManifestCorrupt(String),

    /// An asset file is too short or internally inconsistent.
    #[error("asset {id:?} corrupt: {reason}")]
    AssetCorrupt {
        /// The offending asset.
        id: AssetId,
        /// What failed to parse.
        reason: String,
    },

    /// A mesh image failed to parse.
    #[error("mesh data corrupt: {0}")]
    MeshCorrupt(String),

    /// The page budget is exhausted; committed pages are never reclaimed,
    /// so this only clears when the process restarts with a bigger budget.
    #[error("out of asset pages: requested {requested} bytes")]
    OutOfPages {
        /// Bytes the failed commit needed.
        requested: usize,
    },

    /// Every hash slot is occupied.
    #[error("asset table full: {entries} entries")]
    TableFull {
        /// Total slot count.
        entries: usize,
    },

    /// An access fell outside the committed prefix.
    #[error("out of bounds: offset {offset} + len {len} exceeds committed {committed}")]
    OutOfBounds {
        /// Requested byte offset.
        offset: usize,
        /// Requested length.
        len: usize,
        /// Committed prefix length.
        committed: usize,
    },

    /// The render device rejected a buffer upload during post-load prep.
    #[error("render device failed: {0}")]
    DeviceFailed(String),

    /// The platform layer failed underneath the cache.
    #[error("platform failure: {0}")]
    Platform(String),
}

/// Result type for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;
