//! # Arena Allocator
//!
//! The simplest discipline: one block reservation, no internal bookkeeping.
//! The whole range is the buffer and the caller owns its layout - staging
//! buffers for asset uploads are the typical tenant.

use crate::block::{BlockAllocator, BlockHandle};
use crate::error::MemoryResult;

/// One flat reserved buffer with caller-owned layout.
pub struct ArenaAllocator {
    handle: BlockHandle,
    len: usize,
}

impl ArenaAllocator {
    /// Reserves `bytes` worth of blocks in a single reservation.
    ///
    /// # Errors
    ///
    /// Propagates the block reservation failure.
    pub fn new(blocks: &mut BlockAllocator, bytes: usize) -> MemoryResult<Self> {
        let handle = blocks.reserve_blocks(bytes)?;
        let len = handle.capacity();
        Ok(Self { handle, len })
    }

    /// Buffer length in bytes (the full block range).
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the buffer is empty (never the case for a live
    /// arena).
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Borrows the whole buffer.
    ///
    /// # Errors
    ///
    /// Only fails if the handle was released out from under the arena.
    pub fn buffer<'a>(&self, blocks: &'a BlockAllocator) -> MemoryResult<&'a [u8]> {
        blocks.slice(&self.handle, 0, self.len)
    }

    /// Mutably borrows the whole buffer.
    ///
    /// # Errors
    ///
    /// Only fails if the handle was released out from under the arena.
    pub fn buffer_mut<'a>(&self, blocks: &'a mut BlockAllocator) -> MemoryResult<&'a mut [u8]> {
        blocks.slice_mut(&self.handle, 0, self.len)
    }

    /// Zero-fills the buffer.
    ///
    /// # Errors
    ///
    /// Only fails if the handle was released out from under the arena.
    pub fn clear(&mut self, blocks: &mut BlockAllocator) -> MemoryResult<()> {
        blocks.slice_mut(&self.handle, 0, self.len)?.fill(0);
        Ok(())
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

    #[test]
    fn test_whole_range_is_the_buffer() {
        let mut blocks = BlockAllocator::new(BLOCK_SIZE * 16).unwrap();
        let arena = ArenaAllocator::new(&mut blocks, 100).unwrap();

        // Rounded up to a whole block.
        assert_eq!(arena.len(), BLOCK_SIZE);
        assert_eq!(arena.buffer(&blocks).unwrap().len(), BLOCK_SIZE);
    }

    #[test]
    fn test_clear_zeroes() {
        let mut blocks = BlockAllocator::new(BLOCK_SIZE * 16).unwrap();
        let mut arena = ArenaAllocator::new(&mut blocks, BLOCK_SIZE).unwrap();

        arena.buffer_mut(&mut blocks).unwrap().fill(0xFF);
        arena.clear(&mut blocks).unwrap();
        assert!(arena.buffer(&blocks).unwrap().iter().all(|&x| x == 0));
    }

    #[test]
    fn test_destroy_releases_blocks() {
        let mut blocks = BlockAllocator::new(BLOCK_SIZE * 16).unwrap();
        let arena = ArenaAllocator::new(&mut blocks, BLOCK_SIZE * 2).unwrap();

        assert_eq!(blocks.blocks_in_use(), 2);
        arena.destroy(&mut blocks);
        assert_eq!(blocks.blocks_in_use(), 0);
    }
}
