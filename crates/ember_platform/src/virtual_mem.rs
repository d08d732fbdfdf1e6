//! # Virtual Memory Regions
//!
//! Reserve/commit split over the platform's paging primitives.
//!
//! A [`VirtualRegion`] claims a contiguous address range once, backed by
//! nothing. Pages become usable only when committed, and commits always
//! grow a single contiguous prefix - there is no decommit and no hole
//! punching. That matches how the engine consumes memory: the block
//! allocator commits its whole arena at startup, the asset cache bumps the
//! committed prefix forward as assets stream in and never gives pages back.
//!
//! ## Thread Safety
//!
//! A region is single-owner, single-thread. It is deliberately `!Send`.

use crate::error::{PlatformError, PlatformResult};

/// Rounds `value` up to the next multiple of `align` (a power of two).
#[inline]
const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

/// Returns the system page size in bytes.
///
/// Queried once from the OS and cached for the lifetime of the process.
#[must_use]
pub fn page_size() -> usize {
    use std::sync::OnceLock;
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
    *PAGE_SIZE.get_or_init(query_page_size)
}

#[cfg(unix)]
fn query_page_size() -> usize {
    // SAFETY: sysconf has no memory-safety preconditions.
    #[allow(unsafe_code)]
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    usize::try_from(size).unwrap_or(4096)
}

#[cfg(not(unix))]
fn query_page_size() -> usize {
    4096
}

/// A reserved address range with a lazily committed prefix.
///
/// The committed prefix is exposed as a byte slice; all higher layers work
/// with offsets into it. Dropping the region unmaps the whole reservation.
#[derive(Debug)]
pub struct VirtualRegion {
    inner: RegionImpl,
    /// Total reserved bytes (page-aligned).
    reserved: usize,
    /// Committed prefix length (page-aligned). Doubles as the commit cursor.
    committed: usize,
}

impl VirtualRegion {
    /// Reserves `bytes` of address space without backing it.
    ///
    /// The reservation is rounded up to the page size. No memory in the
    /// region may be touched until it has been committed.
    ///
    /// # Errors
    ///
    /// [`PlatformError::EmptyReservation`] for a zero-byte request, or
    /// [`PlatformError::ReserveFailed`] if the OS rejects the mapping.
    pub fn reserve(bytes: usize) -> PlatformResult<Self> {
        if bytes == 0 {
            return Err(PlatformError::EmptyReservation);
        }

        let reserved = align_up(bytes, page_size());
        let inner = RegionImpl::reserve(reserved)?;

        tracing::debug!(reserved, "reserved virtual region");

        Ok(Self {
            inner,
            reserved,
            committed: 0,
        })
    }

    /// Commits enough pages at the cursor to hold `bytes` more bytes.
    ///
    /// Returns the byte offset of the newly committed run within the
    /// region. A zero-byte commit is a no-op that returns the current
    /// cursor. This is the sole growth mechanism; committed pages are never
    /// reclaimed.
    ///
    /// # Errors
    ///
    /// [`PlatformError::RegionExhausted`] if the commit would run past the
    /// reservation, or [`PlatformError::CommitFailed`] if the OS rejects
    /// the protection change.
    pub fn commit(&mut self, bytes: usize) -> PlatformResult<usize> {
        let offset = self.committed;
        if bytes == 0 {
            return Ok(offset);
        }

        let len = align_up(bytes, page_size());
        let remaining = self.reserved - self.committed;
        if len > remaining {
            return Err(PlatformError::RegionExhausted {
                requested: len,
                remaining,
            });
        }

        self.inner.commit(offset, len)?;
        self.committed += len;
        Ok(offset)
    }

    /// Commits the entire remaining reservation in one call.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`VirtualRegion::commit`].
    pub fn commit_all(&mut self) -> PlatformResult<()> {
        let remaining = self.reserved - self.committed;
        self.commit(remaining).map(|_| ())
    }

    /// Returns the total reserved size in bytes.
    #[inline]
    #[must_use]
    pub const fn reserved(&self) -> usize {
        self.reserved
    }

    /// Returns the committed prefix length in bytes.
    #[inline]
    #[must_use]
    pub const fn committed(&self) -> usize {
        self.committed
    }

    /// Returns the committed prefix as a byte slice.
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.inner.bytes(self.committed)
    }

    /// Returns the committed prefix as a mutable byte slice.
    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.inner.bytes_mut(self.committed)
    }
}

// ---------------------------------------------------------------------------
// Unix backend: anonymous PROT_NONE mapping, mprotect to commit.
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[derive(Debug)]
struct RegionImpl {
    base: std::ptr::NonNull<u8>,
    reserved: usize,
}

#[cfg(unix)]
#[allow(unsafe_code)]
impl RegionImpl {
    fn reserve(reserved: usize) -> PlatformResult<Self> {
        // SAFETY: a fresh anonymous private mapping aliases nothing.
        let raw = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                reserved,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };

        if raw == libc::MAP_FAILED {
            return Err(PlatformError::ReserveFailed {
                bytes: reserved,
                source: std::io::Error::last_os_error(),
            });
        }

        let base = std::ptr::NonNull::new(raw.cast::<u8>()).ok_or_else(|| {
            PlatformError::ReserveFailed {
                bytes: reserved,
                source: std::io::Error::last_os_error(),
            }
        })?;

        Ok(Self { base, reserved })
    }

    fn commit(&mut self, offset: usize, len: usize) -> PlatformResult<()> {
        // Caller has already bounds-checked offset + len against the
        // reservation; offset and len are page-aligned.
        debug_assert!(offset + len <= self.reserved);

        // SAFETY: the range lies inside our own mapping.
        let rc = unsafe {
            libc::mprotect(
                self.base.as_ptr().add(offset).cast::<libc::c_void>(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
            )
        };

        if rc != 0 {
            return Err(PlatformError::CommitFailed {
                bytes: len,
                offset,
                source: std::io::Error::last_os_error(),
            });
        }

        Ok(())
    }

    fn bytes(&self, committed: usize) -> &[u8] {
        // SAFETY: the committed prefix is mapped read/write and exclusively
        // owned by this region.
        unsafe { std::slice::from_raw_parts(self.base.as_ptr(), committed) }
    }

    fn bytes_mut(&mut self, committed: usize) -> &mut [u8] {
        // SAFETY: as above, plus &mut self guarantees unique access.
        unsafe { std::slice::from_raw_parts_mut(self.base.as_ptr(), committed) }
    }
}

#[cfg(unix)]
#[allow(unsafe_code)]
impl Drop for RegionImpl {
    fn drop(&mut self) {
        // SAFETY: base/reserved describe exactly the mapping we created.
        unsafe {
            libc::munmap(self.base.as_ptr().cast::<libc::c_void>(), self.reserved);
        }
    }
}

// ---------------------------------------------------------------------------
// Portable backend: a Vec that never outgrows its initial capacity, so the
// reserve/commit split keeps the same observable semantics.
// ---------------------------------------------------------------------------

#[cfg(not(unix))]
#[derive(Debug)]
struct RegionImpl {
    buf: Vec<u8>,
}

#[cfg(not(unix))]
impl RegionImpl {
    fn reserve(reserved: usize) -> PlatformResult<Self> {
        Ok(Self {
            buf: Vec::with_capacity(reserved),
        })
    }

    fn commit(&mut self, offset: usize, len: usize) -> PlatformResult<()> {
        debug_assert_eq!(offset, self.buf.len());
        self.buf.resize(offset + len, 0);
        Ok(())
    }

    fn bytes(&self, committed: usize) -> &[u8] {
        &self.buf[..committed]
    }

    fn bytes_mut(&mut self, committed: usize) -> &mut [u8] {
        &mut self.buf[..committed]
    }
}
