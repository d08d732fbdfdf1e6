//! # Block Allocator
//!
//! The leaf allocator everything else sits on. One arena is reserved and
//! committed at construction; it is carved into fixed [`BLOCK_SIZE`] blocks
//! whose occupancy lives in a bitmap stored in the leading bytes of the
//! same arena. Usable blocks start immediately after the bitmap.
//!
//! Reservation is first-fit from a persistent cursor: the scan resumes
//! where the last allocation ended and wraps around the arena, which keeps
//! the common alloc/free/alloc cycle amortized O(1) at the cost of some
//! fragmentation risk. There is no coalescing or defragmentation pass.
//!
//! ## Handles
//!
//! [`reserve_blocks`](BlockAllocator::reserve_blocks) returns a
//! [`BlockHandle`] - an exclusive capability over a contiguous block run.
//! Handles are deliberately not `Clone`: exactly one owner, released
//! exactly once through [`free_blocks`](BlockAllocator::free_blocks),
//! which zeroes the handle in place. Passing a foreign or already-freed
//! handle is a caller contract violation and is not runtime-checked,
//! matching the capability model.

use ember_platform::{page_size, VirtualRegion};

use crate::config::MemoryConfig;
use crate::error::{MemoryError, MemoryResult};

/// Fixed allocation granularity of the block allocator, in bytes.
pub const BLOCK_SIZE: usize = 256;

/// Exclusive capability over a contiguous run of blocks.
///
/// The default value is the null handle (zero blocks), which is what a
/// released handle becomes.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BlockHandle {
    block_start: u64,
    block_count: u32,
}

impl BlockHandle {
    /// Returns `true` for the null handle.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.block_count == 0
    }

    /// Index of the first block in the run.
    #[inline]
    #[must_use]
    pub const fn block_start(&self) -> u64 {
        self.block_start
    }

    /// Number of blocks in the run.
    #[inline]
    #[must_use]
    pub const fn block_count(&self) -> u32 {
        self.block_count
    }

    /// Byte capacity of the run.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.block_count as usize * BLOCK_SIZE
    }
}

/// Block-bitmap allocator over one committed arena.
pub struct BlockAllocator {
    region: VirtualRegion,
    /// Bitmap length in bytes; also the offset where block 0 starts.
    bitmap_len: usize,
    /// Total usable blocks behind the bitmap.
    block_count: u64,
    /// Next block id the first-fit scan starts from.
    cursor: u64,
    /// Live occupancy counter, for stats only.
    blocks_in_use: u64,
}

impl BlockAllocator {
    /// Creates an allocator whose arena holds at least `bytes` usable bytes.
    ///
    /// The arena is grown to accommodate the occupancy bitmap and then
    /// page-aligned, reserved, and committed in full. Construct this once
    /// at process start, before any derived allocator.
    ///
    /// # Errors
    ///
    /// [`MemoryError::ZeroSized`] for an empty request, or a platform error
    /// if the OS cannot back the arena.
    pub fn new(bytes: usize) -> MemoryResult<Self> {
        if bytes == 0 {
            return Err(MemoryError::ZeroSized);
        }

        // First pass sizes the bitmap for the requested bytes; after page
        // alignment the arena may have grown, so the final bitmap is sized
        // from the aligned total and always covers every usable block.
        let estimate = bytes + bytes / (BLOCK_SIZE * 8) + 1;
        let page = page_size();
        let total = estimate.div_ceil(page) * page;

        let bitmap_len = total / (BLOCK_SIZE * 8) + 1;
        let block_count = ((total - bitmap_len) / BLOCK_SIZE) as u64;

        let mut region = VirtualRegion::reserve(total)?;
        region.commit_all()?;

        tracing::info!(
            arena_bytes = total,
            block_count,
            bitmap_len,
            "block allocator initialized"
        );

        Ok(Self {
            region,
            bitmap_len,
            block_count,
            cursor: 0,
            blocks_in_use: 0,
        })
    }

    /// Creates an allocator from a startup config.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`BlockAllocator::new`].
    pub fn with_config(config: &MemoryConfig) -> MemoryResult<Self> {
        Self::new(config.arena_bytes)
    }

    /// Reserves enough contiguous blocks to hold `bytes`.
    ///
    /// Scans the bitmap first-fit from the persistent cursor, wrapping at
    /// the arena end (a run itself never wraps - blocks must stay
    /// contiguous in the address range). Gives up once the whole block
    /// population has been examined without finding a fit.
    ///
    /// # Errors
    ///
    /// [`MemoryError::ZeroSized`] for an empty request, or
    /// [`MemoryError::OutOfBlocks`] on exhaustion - logged, recoverable.
    pub fn reserve_blocks(&mut self, bytes: usize) -> MemoryResult<BlockHandle> {
        if bytes == 0 {
            return Err(MemoryError::ZeroSized);
        }

        let needed = bytes.div_ceil(BLOCK_SIZE) as u64;
        if needed <= self.block_count {
            let mut examined: u64 = 0;
            let mut pos = self.cursor % self.block_count;

            while examined < self.block_count {
                if pos + needed > self.block_count {
                    // Not enough room before the arena end; wrap the scan.
                    examined += self.block_count - pos;
                    pos = 0;
                    continue;
                }

                match self.first_used_in_run(pos, needed) {
                    None => {
                        self.mark_run(pos, needed);
                        self.cursor = (pos + needed) % self.block_count;
                        self.blocks_in_use += needed;

                        return Ok(BlockHandle {
                            block_start: pos,
                            block_count: needed as u32,
                        });
                    }
                    Some(used) => {
                        // Restart just past the occupied block.
                        examined += used - pos + 1;
                        pos = used + 1;
                        if pos >= self.block_count {
                            pos = 0;
                        }
                    }
                }
            }
        }

        tracing::warn!(
            requested_bytes = bytes,
            blocks_in_use = self.blocks_in_use,
            "block reservation failed"
        );

        Err(MemoryError::OutOfBlocks {
            requested_bytes: bytes,
        })
    }

    /// Releases a handle's blocks back to the bitmap and nulls the handle.
    ///
    /// Must be called with the exact handle a prior
    /// [`reserve_blocks`](BlockAllocator::reserve_blocks) returned. A
    /// double free is impossible through the API (the handle is nulled);
    /// a hand-forged handle is a contract violation and is not checked.
    pub fn free_blocks(&mut self, handle: &mut BlockHandle) {
        if handle.is_null() {
            return;
        }

        for block in handle.block_start..handle.block_start + u64::from(handle.block_count) {
            self.clear_bit(block);
        }

        self.blocks_in_use -= u64::from(handle.block_count);
        *handle = BlockHandle::default();
    }

    /// Borrows `len` bytes of a handle's range starting at `offset`.
    ///
    /// # Errors
    ///
    /// [`MemoryError::OutOfBounds`] if the range exceeds the handle's
    /// capacity.
    pub fn slice(&self, handle: &BlockHandle, offset: usize, len: usize) -> MemoryResult<&[u8]> {
        let base = self.checked_base(handle, offset, len)?;
        Ok(&self.region.bytes()[base..base + len])
    }

    /// Mutably borrows `len` bytes of a handle's range starting at `offset`.
    ///
    /// # Errors
    ///
    /// [`MemoryError::OutOfBounds`] if the range exceeds the handle's
    /// capacity.
    pub fn slice_mut(
        &mut self,
        handle: &BlockHandle,
        offset: usize,
        len: usize,
    ) -> MemoryResult<&mut [u8]> {
        let base = self.checked_base(handle, offset, len)?;
        Ok(&mut self.region.bytes_mut()[base..base + len])
    }

    /// Total usable blocks in the arena.
    #[inline]
    #[must_use]
    pub const fn block_count(&self) -> u64 {
        self.block_count
    }

    /// Blocks currently owned by live handles.
    #[inline]
    #[must_use]
    pub const fn blocks_in_use(&self) -> u64 {
        self.blocks_in_use
    }

    /// Bytes currently owned by live handles.
    #[inline]
    #[must_use]
    pub const fn bytes_in_use(&self) -> u64 {
        self.blocks_in_use * BLOCK_SIZE as u64
    }

    /// Returns whether `block` is marked used in the bitmap.
    #[must_use]
    pub fn is_block_used(&self, block: u64) -> bool {
        debug_assert!(block < self.block_count);
        let byte = self.region.bytes()[(block / 8) as usize];
        byte & (1 << (block % 8)) != 0
    }

    fn checked_base(
        &self,
        handle: &BlockHandle,
        offset: usize,
        len: usize,
    ) -> MemoryResult<usize> {
        let capacity = handle.capacity();
        let end = offset.checked_add(len).unwrap_or(usize::MAX);
        if end > capacity {
            return Err(MemoryError::OutOfBounds {
                offset,
                len,
                capacity,
            });
        }

        Ok(self.bitmap_len + handle.block_start as usize * BLOCK_SIZE + offset)
    }

    /// Returns the first used block in `[start, start + len)`, if any.
    fn first_used_in_run(&self, start: u64, len: u64) -> Option<u64> {
        (start..start + len).find(|&block| self.is_block_used(block))
    }

    fn mark_run(&mut self, start: u64, len: u64) {
        for block in start..start + len {
            self.set_bit(block);
        }
    }

    fn set_bit(&mut self, block: u64) {
        self.region.bytes_mut()[(block / 8) as usize] |= 1 << (block % 8);
    }

    fn clear_bit(&mut self, block: u64) {
        self.region.bytes_mut()[(block / 8) as usize] &= !(1 << (block % 8));
    }

    #[cfg(test)]
    fn bitmap_snapshot(&self) -> Vec<u8> {
        self.region.bytes()[..self.bitmap_len].to_vec()
    }
}
