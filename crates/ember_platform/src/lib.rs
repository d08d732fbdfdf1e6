//! # EMBER Platform Layer
//!
//! The thin seam between the engine core and the operating system. It
//! supplies exactly three things:
//!
//! 1. **Virtual memory** - [`VirtualRegion`] exposes the reserve/commit
//!    split: claim a large address range up front without backing it, then
//!    commit pages lazily as subsystems grow into it.
//! 2. **Page size** - [`page_size`] for rounding reservations and commits.
//! 3. **File I/O** - [`BinaryFile`], the blocking open/len/read/rewind
//!    surface the asset cache consumes.
//!
//! ## Safety Boundary
//!
//! All `unsafe` in the workspace lives here. The public API hands out plain
//! byte slices over the committed prefix of a region; callers never see an
//! address, only offsets into those slices.

mod error;
mod file;
mod virtual_mem;

pub use error::{PlatformError, PlatformResult};
pub use file::BinaryFile;
pub use virtual_mem::{page_size, VirtualRegion};
