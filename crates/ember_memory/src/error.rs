//! # Memory Error Types
//!
//! Ordinary exhaustion is always an `Err` the caller can recover from
//! (free something and retry, or treat as out-of-memory). Malformed
//! arguments to the bounds-checked accessors surface the same way.

use thiserror::Error;

/// Errors that can occur in the allocation core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// The bitmap scan found no run of free blocks large enough.
    #[error("out of blocks: no contiguous run for {requested_bytes} bytes")]
    OutOfBlocks {
        /// Size of the failed reservation.
        requested_bytes: usize,
    },

    /// A zero-sized arena, reservation, or allocation was requested.
    #[error("zero-sized request")]
    ZeroSized,

    /// A stack allocation exceeded the remaining capacity.
    #[error("stack exhausted: requested {requested} bytes, {remaining} remaining")]
    StackExhausted {
        /// Bytes the allocation needed.
        requested: u64,
        /// Bytes left before the end of the stack's range.
        remaining: u32,
    },

    /// The pool's free list is empty.
    #[error("pool exhausted: all {capacity} elements in use")]
    PoolExhausted {
        /// Total element count of the pool.
        capacity: u32,
    },

    /// Pool elements must be able to hold an in-place free-list link.
    #[error("pool element size {element_size} is smaller than a free-list link")]
    PoolElementTooSmall {
        /// The rejected element size.
        element_size: u32,
    },

    /// Pools need at least two elements to be worth threading a list through.
    #[error("pool count {count} is too small (minimum 2)")]
    PoolTooSmall {
        /// The rejected element count.
        count: u32,
    },

    /// An offset handed to the pool does not address one of its elements.
    #[error("offset {offset} does not address a pool element")]
    ForeignPoolOffset {
        /// The rejected byte offset.
        offset: u32,
    },

    /// A handle access fell outside the handle's block range.
    #[error("out of bounds: offset {offset} + len {len} exceeds capacity {capacity}")]
    OutOfBounds {
        /// Requested byte offset within the handle.
        offset: usize,
        /// Requested length.
        len: usize,
        /// The handle's byte capacity.
        capacity: usize,
    },

    /// The platform layer failed to back the arena.
    #[error("platform failure: {0}")]
    Platform(String),
}

impl From<ember_platform::PlatformError> for MemoryError {
    fn from(err: ember_platform::PlatformError) -> Self {
        Self::Platform(err.to_string())
    }
}

/// Result type for allocation operations.
pub type MemoryResult<T> = Result<T, MemoryError>;
