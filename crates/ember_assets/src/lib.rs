//! # EMBER Asset Cache
//!
//! Long-lived asset storage over one big reserved address range.
//!
//! ## Design Philosophy
//!
//! The cache reserves its whole budget up front (gigabytes of address
//! space, no physical backing) and commits pages only as assets stream
//! in, through a bump cursor that never moves backwards. Three regions
//! share the reservation:
//!
//! 1. **Manifest** - an offline-baked perfect-hash table mapping
//!    [`AssetId`]s to file paths, read once at startup.
//! 2. **Hash table** - open addressing with linear probing, one
//!    24-byte slot per page of asset budget, holding
//!    `{key, refcount, offset}`.
//! 3. **Asset pages** - the committed images of loaded files.
//!
//! First load reads the file into freshly committed pages and claims the
//! slot the miss probe already found; repeat loads are an O(1) hit that
//! bumps the refcount; the final unload tombstones the slot. Mesh assets
//! additionally push their vertex/index payloads to a [`RenderDevice`]
//! during load.
//!
//! ## Thread Safety
//!
//! None. The cache is a single-threaded singleton like the rest of the
//! engine core.

pub mod cache;
pub mod config;
pub mod error;
pub mod id;
pub mod manifest;
pub mod mesh;
pub mod render;
pub mod types;

pub use cache::AssetCache;
pub use config::AssetCacheConfig;
pub use error::{AssetError, AssetResult};
pub use id::AssetId;
pub use manifest::ManifestHeader;
pub use mesh::{MeshAsset, MeshHeader, MeshRange, VertexRange, MESH_PRELUDE};
pub use render::{RenderBufferId, RenderBufferInfo, RenderBufferKind, RenderDevice};
pub use types::AssetType;
