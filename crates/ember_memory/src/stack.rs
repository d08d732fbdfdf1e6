//! # Stack Allocator
//!
//! Marker-based LIFO discipline over one block range. The render command
//! buffers use this: allocate forward all frame, roll back to a marker (or
//! clear) when the frame is done.

use crate::block::{BlockAllocator, BlockHandle};
use crate::error::{MemoryError, MemoryResult};

/// A saved cursor position that later rolls back every allocation made
/// after it was captured.
pub type StackMarker = u32;

/// One successful stack allocation: where it landed and the marker that
/// undoes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackAllocation {
    /// Byte offset of the allocation within the stack's range.
    pub offset: u32,
    /// Cursor value captured immediately before this allocation.
    pub marker: StackMarker,
}

/// Bump allocator with marker rollback inside one reserved block range.
pub struct StackAllocator {
    handle: BlockHandle,
    capacity: u32,
    cursor: u32,
    aligned: bool,
}

impl StackAllocator {
    /// Reserves `bytes` worth of blocks with 4-byte-aligned allocations.
    ///
    /// # Errors
    ///
    /// Propagates the block reservation failure; on `Err` no blocks are
    /// held.
    pub fn new(blocks: &mut BlockAllocator, bytes: usize) -> MemoryResult<Self> {
        Self::with_alignment(blocks, bytes, true)
    }

    /// Reserves `bytes` worth of blocks with unaligned (packed) allocations.
    ///
    /// # Errors
    ///
    /// Propagates the block reservation failure.
    pub fn unaligned(blocks: &mut BlockAllocator, bytes: usize) -> MemoryResult<Self> {
        Self::with_alignment(blocks, bytes, false)
    }

    fn with_alignment(
        blocks: &mut BlockAllocator,
        bytes: usize,
        aligned: bool,
    ) -> MemoryResult<Self> {
        let handle = blocks.reserve_blocks(bytes)?;
        let capacity = handle.capacity() as u32;

        Ok(Self {
            handle,
            capacity,
            cursor: 0,
            aligned,
        })
    }

    /// Bumps the cursor by `element_size * element_count` bytes.
    ///
    /// When the allocator is aligned, the allocation start is rounded up
    /// to 4 bytes first. The returned [`StackAllocation`] carries the
    /// pre-allocation marker for later rollback.
    ///
    /// # Errors
    ///
    /// [`MemoryError::ZeroSized`] for an empty request, or
    /// [`MemoryError::StackExhausted`] when the remaining capacity is
    /// insufficient (the cursor is left untouched).
    pub fn alloc(&mut self, element_size: u32, element_count: u32) -> MemoryResult<StackAllocation> {
        if element_size == 0 || element_count == 0 {
            return Err(MemoryError::ZeroSized);
        }

        let marker = self.cursor;
        let offset = if self.aligned {
            (self.cursor + 3) & !3
        } else {
            self.cursor
        };

        let bytes = u64::from(element_size) * u64::from(element_count);
        let end = u64::from(offset) + bytes;
        if end > u64::from(self.capacity) {
            tracing::warn!(
                requested = bytes,
                remaining = self.capacity - self.cursor,
                "stack allocation failed"
            );
            return Err(MemoryError::StackExhausted {
                requested: bytes,
                remaining: self.capacity - self.cursor,
            });
        }

        self.cursor = end as u32;
        Ok(StackAllocation { offset, marker })
    }

    /// Captures the current cursor as a marker.
    #[inline]
    #[must_use]
    pub const fn marker(&self) -> StackMarker {
        self.cursor
    }

    /// Rolls the cursor back to `marker`.
    ///
    /// A marker of zero, or one beyond the current cursor, is treated as
    /// invalid and resets the whole stack instead - freeing to garbage
    /// must never leave the cursor past live data.
    pub fn free(&mut self, marker: StackMarker) {
        if marker > 0 && marker <= self.cursor {
            self.cursor = marker;
        } else {
            self.cursor = 0;
        }
    }

    /// Resets the cursor to zero without validating outstanding markers.
    #[inline]
    pub fn clear(&mut self) {
        self.cursor = 0;
    }

    /// Total byte capacity of the reserved range.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Bytes left between the cursor and the end of the range.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.capacity - self.cursor
    }

    /// Borrows an allocation's bytes.
    ///
    /// # Errors
    ///
    /// [`MemoryError::OutOfBounds`] if the range exceeds the stack's
    /// capacity.
    pub fn bytes<'a>(
        &self,
        blocks: &'a BlockAllocator,
        offset: u32,
        len: usize,
    ) -> MemoryResult<&'a [u8]> {
        blocks.slice(&self.handle, offset as usize, len)
    }

    /// Mutably borrows an allocation's bytes.
    ///
    /// # Errors
    ///
    /// [`MemoryError::OutOfBounds`] if the range exceeds the stack's
    /// capacity.
    pub fn bytes_mut<'a>(
        &self,
        blocks: &'a mut BlockAllocator,
        offset: u32,
        len: usize,
    ) -> MemoryResult<&'a mut [u8]> {
        blocks.slice_mut(&self.handle, offset as usize, len)
    }

    /// Releases the block range back to the block allocator.
    pub fn destroy(mut self, blocks: &mut BlockAllocator) {
        blocks.free_blocks(&mut self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BLOCK_SIZE;

    fn fixture() -> (BlockAllocator, StackAllocator) {
        let mut blocks = BlockAllocator::new(BLOCK_SIZE * 64).unwrap();
        let stack = StackAllocator::new(&mut blocks, 256).unwrap();
        (blocks, stack)
    }

    #[test]
    fn test_bump_and_marker() {
        let (_blocks, mut stack) = fixture();

        let a = stack.alloc(64, 1).unwrap();
        assert_eq!(a.offset, 0);
        assert_eq!(a.marker, 0);

        let b = stack.alloc(32, 1).unwrap();
        assert_eq!(b.offset, 64);
        assert_eq!(b.marker, 64);
        assert_eq!(stack.marker(), 96);
    }

    #[test]
    fn test_alignment_rounds_up() {
        let (_blocks, mut stack) = fixture();

        stack.alloc(3, 1).unwrap();
        let next = stack.alloc(4, 1).unwrap();
        assert_eq!(next.offset, 4);
    }

    #[test]
    fn test_unaligned_packs_tightly() {
        let mut blocks = BlockAllocator::new(BLOCK_SIZE * 8).unwrap();
        let mut stack = StackAllocator::unaligned(&mut blocks, 256).unwrap();

        stack.alloc(3, 1).unwrap();
        let next = stack.alloc(4, 1).unwrap();
        assert_eq!(next.offset, 3);
    }

    #[test]
    fn test_exhaustion_leaves_cursor() {
        let (_blocks, mut stack) = fixture();
        let capacity = stack.capacity();

        stack.alloc(capacity - 8, 1).unwrap();
        let before = stack.marker();

        assert!(matches!(
            stack.alloc(64, 1),
            Err(MemoryError::StackExhausted { .. })
        ));
        assert_eq!(stack.marker(), before);

        // The remaining tail is still usable.
        assert!(stack.alloc(8, 1).is_ok());
    }

    #[test]
    fn test_invalid_marker_resets() {
        let (_blocks, mut stack) = fixture();

        stack.alloc(64, 1).unwrap();
        stack.free(9999);
        assert_eq!(stack.marker(), 0);

        stack.alloc(64, 1).unwrap();
        stack.free(0);
        assert_eq!(stack.marker(), 0);
    }

    #[test]
    fn test_rollback_reuses_space() {
        let (_blocks, mut stack) = fixture();

        let first = stack.alloc(64, 1).unwrap();
        stack.alloc(32, 1).unwrap();

        stack.free(first.marker);
        let again = stack.alloc(64, 1).unwrap();
        assert_eq!(again.offset, first.offset);
    }

    #[test]
    fn test_destroy_releases_blocks() {
        let (mut blocks, stack) = fixture();
        assert!(blocks.blocks_in_use() > 0);

        stack.destroy(&mut blocks);
        assert_eq!(blocks.blocks_in_use(), 0);
    }
}
