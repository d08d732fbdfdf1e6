//! # EMBER Memory Core
//!
//! Fragmentation-resistant memory management over one reserved arena.
//!
//! ## Design Philosophy
//!
//! The [`BlockAllocator`] claims a single committed arena at startup and
//! partitions it into fixed 256-byte blocks, tracking occupancy with a
//! bitmap stored at the head of the same arena. The three higher-level
//! disciplines each reserve one contiguous block range - a [`BlockHandle`] -
//! exactly once, and implement their own policy inside it:
//!
//! - [`StackAllocator`] - bump cursor with marker rollback (render command
//!   buffers)
//! - [`PoolAllocator`] - intrusive free list of fixed-size elements
//!   (device/pipeline object pools)
//! - [`ArenaAllocator`] - one flat buffer, caller owns the layout
//!   (staging scratch space)
//!
//! Handles are exclusive capabilities: they are not `Clone`, and releasing
//! one zeroes it in place. Memory is only reachable through bounds-checked
//! slice accessors on the block allocator, never through raw addresses.
//!
//! ## Thread Safety
//!
//! None. The whole crate assumes a single logical thread; wrap the
//! allocator in a lock if you need more.

pub mod arena;
pub mod block;
pub mod config;
pub mod error;
pub mod pool;
pub mod stack;

pub use arena::ArenaAllocator;
pub use block::{BlockAllocator, BlockHandle, BLOCK_SIZE};
pub use config::MemoryConfig;
pub use error::{MemoryError, MemoryResult};
pub use pool::PoolAllocator;
pub use stack::{StackAllocation, StackAllocator, StackMarker};
