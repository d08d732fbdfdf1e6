//! # Pool Allocator
//!
//! Fixed-size elements with O(1) alloc and free. The free list is
//! intrusive: a 4-byte link precedes every element inside the pool's own
//! block range, threaded through whichever elements are currently unused.
//! The render backend's device and pipeline object pools live on this.

use crate::block::{BlockAllocator, BlockHandle};
use crate::error::{MemoryError, MemoryResult};

/// Size of the in-place free-list link preceding each element.
const LINK_SIZE: u32 = 4;

/// Free-list terminator.
const LINK_NONE: u32 = u32::MAX;

/// Fixed-size element pool over one reserved block range.
pub struct PoolAllocator {
    handle: BlockHandle,
    element_size: u32,
    /// Total element count.
    capacity: u32,
    /// Index of the first free element, or [`LINK_NONE`].
    free_head: u32,
    in_use: u32,
}

impl PoolAllocator {
    /// Reserves room for `count` elements of `element_size` bytes each,
    /// plus their link headers, and threads the initial free list.
    ///
    /// # Errors
    ///
    /// [`MemoryError::PoolElementTooSmall`] if an element cannot hold a
    /// link, [`MemoryError::PoolTooSmall`] for fewer than two elements, or
    /// the propagated block reservation failure.
    pub fn new(
        blocks: &mut BlockAllocator,
        element_size: u32,
        count: u32,
    ) -> MemoryResult<Self> {
        if element_size < LINK_SIZE {
            return Err(MemoryError::PoolElementTooSmall { element_size });
        }
        if count < 2 {
            return Err(MemoryError::PoolTooSmall { count });
        }

        let stride = element_size + LINK_SIZE;
        let bytes = stride as usize * count as usize;
        let handle = blocks.reserve_blocks(bytes)?;

        let mut pool = Self {
            handle,
            element_size,
            capacity: count,
            free_head: LINK_NONE,
            in_use: 0,
        };
        pool.clear(blocks)?;

        Ok(pool)
    }

    /// Zero-fills the whole range and rebuilds the free list by striding
    /// through the elements, threading each link to its successor.
    ///
    /// # Errors
    ///
    /// Only fails if the underlying handle access fails, which indicates a
    /// corrupted pool.
    pub fn clear(&mut self, blocks: &mut BlockAllocator) -> MemoryResult<()> {
        let total = self.stride() as usize * self.capacity as usize;
        blocks.slice_mut(&self.handle, 0, total)?.fill(0);

        for index in 0..self.capacity {
            let next = if index + 1 < self.capacity {
                index + 1
            } else {
                LINK_NONE
            };
            self.write_link(blocks, index, next)?;
        }

        self.free_head = 0;
        self.in_use = 0;
        Ok(())
    }

    /// Pops the free-list head and returns the element's byte offset
    /// within the pool's range.
    ///
    /// # Errors
    ///
    /// [`MemoryError::PoolExhausted`] when no element is free.
    pub fn alloc(&mut self, blocks: &BlockAllocator) -> MemoryResult<u32> {
        if self.free_head == LINK_NONE {
            tracing::warn!(capacity = self.capacity, "pool exhausted");
            return Err(MemoryError::PoolExhausted {
                capacity: self.capacity,
            });
        }

        let index = self.free_head;
        self.free_head = self.read_link(blocks, index)?;
        self.in_use += 1;

        Ok(self.element_offset(index))
    }

    /// Pushes an element back onto the free list.
    ///
    /// `offset` must be a value a prior [`alloc`](PoolAllocator::alloc)
    /// returned; the link header immediately preceding it is recovered and
    /// rethreaded.
    ///
    /// # Errors
    ///
    /// [`MemoryError::ForeignPoolOffset`] if `offset` does not address one
    /// of this pool's elements.
    pub fn free(&mut self, blocks: &mut BlockAllocator, offset: u32) -> MemoryResult<()> {
        let index = self.index_of(offset)?;

        self.write_link(blocks, index, self.free_head)?;
        self.free_head = index;
        self.in_use = self.in_use.saturating_sub(1);
        Ok(())
    }

    /// Borrows an element's bytes.
    ///
    /// # Errors
    ///
    /// [`MemoryError::ForeignPoolOffset`] for an offset that is not one of
    /// this pool's elements.
    pub fn element<'a>(
        &self,
        blocks: &'a BlockAllocator,
        offset: u32,
    ) -> MemoryResult<&'a [u8]> {
        self.index_of(offset)?;
        blocks.slice(&self.handle, offset as usize, self.element_size as usize)
    }

    /// Mutably borrows an element's bytes.
    ///
    /// # Errors
    ///
    /// [`MemoryError::ForeignPoolOffset`] for an offset that is not one of
    /// this pool's elements.
    pub fn element_mut<'a>(
        &self,
        blocks: &'a mut BlockAllocator,
        offset: u32,
    ) -> MemoryResult<&'a mut [u8]> {
        self.index_of(offset)?;
        blocks.slice_mut(&self.handle, offset as usize, self.element_size as usize)
    }

    /// Total element count.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Elements currently allocated.
    #[inline]
    #[must_use]
    pub const fn in_use(&self) -> u32 {
        self.in_use
    }

    /// Element size in bytes (excluding the link header).
    #[inline]
    #[must_use]
    pub const fn element_size(&self) -> u32 {
        self.element_size
    }

    /// Releases the block range back to the block allocator.
    pub fn destroy(mut self, blocks: &mut BlockAllocator) {
        blocks.free_blocks(&mut self.handle);
    }

    #[inline]
    const fn stride(&self) -> u32 {
        self.element_size + LINK_SIZE
    }

    #[inline]
    const fn element_offset(&self, index: u32) -> u32 {
        index * self.stride() + LINK_SIZE
    }

    /// Maps an element offset back to its index, validating it addresses a
    /// real element.
    fn index_of(&self, offset: u32) -> MemoryResult<u32> {
        if offset < LINK_SIZE || (offset - LINK_SIZE) % self.stride() != 0 {
            return Err(MemoryError::ForeignPoolOffset { offset });
        }

        let index = (offset - LINK_SIZE) / self.stride();
        if index >= self.capacity {
            return Err(MemoryError::ForeignPoolOffset { offset });
        }

        Ok(index)
    }

    fn read_link(&self, blocks: &BlockAllocator, index: u32) -> MemoryResult<u32> {
        let at = (index * self.stride()) as usize;
        let bytes = blocks.slice(&self.handle, at, LINK_SIZE as usize)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn write_link(
        &self,
        blocks: &mut BlockAllocator,
        index: u32,
        next: u32,
    ) -> MemoryResult<()> {
        let at = (index * self.stride()) as usize;
        blocks
            .slice_mut(&self.handle, at, LINK_SIZE as usize)?
            .copy_from_slice(&next.to_le_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BLOCK_SIZE;

    fn fixture(element_size: u32, count: u32) -> (BlockAllocator, PoolAllocator) {
        let mut blocks = BlockAllocator::new(BLOCK_SIZE * 64).unwrap();
        let pool = PoolAllocator::new(&mut blocks, element_size, count).unwrap();
        (blocks, pool)
    }

    #[test]
    fn test_construction_contracts() {
        let mut blocks = BlockAllocator::new(BLOCK_SIZE * 16).unwrap();

        assert!(matches!(
            PoolAllocator::new(&mut blocks, 2, 8),
            Err(MemoryError::PoolElementTooSmall { .. })
        ));
        assert!(matches!(
            PoolAllocator::new(&mut blocks, 16, 1),
            Err(MemoryError::PoolTooSmall { .. })
        ));
    }

    #[test]
    fn test_alloc_pops_in_order() {
        let (blocks, mut pool) = fixture(16, 4);

        let first = pool.alloc(&blocks).unwrap();
        let second = pool.alloc(&blocks).unwrap();
        assert_eq!(first, 4);
        assert_eq!(second, 4 + 20);
        assert_eq!(pool.in_use(), 2);
    }

    #[test]
    fn test_exhaustion_and_reuse() {
        let (mut blocks, mut pool) = fixture(16, 3);

        let a = pool.alloc(&blocks).unwrap();
        let _b = pool.alloc(&blocks).unwrap();
        let _c = pool.alloc(&blocks).unwrap();
        assert!(matches!(
            pool.alloc(&blocks),
            Err(MemoryError::PoolExhausted { .. })
        ));

        pool.free(&mut blocks, a).unwrap();
        assert_eq!(pool.alloc(&blocks).unwrap(), a);
    }

    #[test]
    fn test_free_is_lifo() {
        let (mut blocks, mut pool) = fixture(8, 4);

        let a = pool.alloc(&blocks).unwrap();
        let b = pool.alloc(&blocks).unwrap();

        pool.free(&mut blocks, a).unwrap();
        pool.free(&mut blocks, b).unwrap();

        assert_eq!(pool.alloc(&blocks).unwrap(), b);
        assert_eq!(pool.alloc(&blocks).unwrap(), a);
    }

    #[test]
    fn test_foreign_offset_rejected() {
        let (mut blocks, mut pool) = fixture(16, 4);

        assert!(matches!(
            pool.free(&mut blocks, 0),
            Err(MemoryError::ForeignPoolOffset { .. })
        ));
        assert!(matches!(
            pool.free(&mut blocks, 5),
            Err(MemoryError::ForeignPoolOffset { .. })
        ));
        assert!(matches!(
            pool.free(&mut blocks, 4 + 20 * 10),
            Err(MemoryError::ForeignPoolOffset { .. })
        ));
    }

    #[test]
    fn test_element_data_survives_neighbor_churn() {
        let (mut blocks, mut pool) = fixture(8, 3);

        let keep = pool.alloc(&blocks).unwrap();
        let churn = pool.alloc(&blocks).unwrap();

        pool.element_mut(&mut blocks, keep).unwrap().fill(0x5A);
        pool.free(&mut blocks, churn).unwrap();
        let again = pool.alloc(&blocks).unwrap();
        pool.element_mut(&mut blocks, again).unwrap().fill(0xA5);

        assert!(pool
            .element(&blocks, keep)
            .unwrap()
            .iter()
            .all(|&x| x == 0x5A));
    }

    #[test]
    fn test_clear_rebuilds_list() {
        let (mut blocks, mut pool) = fixture(8, 3);

        let first = pool.alloc(&blocks).unwrap();
        let _ = pool.alloc(&blocks).unwrap();

        pool.clear(&mut blocks).unwrap();
        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.alloc(&blocks).unwrap(), first);
    }
}
