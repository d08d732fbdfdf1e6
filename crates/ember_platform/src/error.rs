//! # Platform Error Types
//!
//! All errors that can surface from the OS seam.

use thiserror::Error;

/// Errors produced by the platform layer.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The OS refused to reserve address space.
    #[error("failed to reserve {bytes} bytes of address space")]
    ReserveFailed {
        /// Size of the attempted reservation, page-aligned.
        bytes: usize,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The OS refused to commit pages inside an existing reservation.
    #[error("failed to commit {bytes} bytes at offset {offset}")]
    CommitFailed {
        /// Size of the attempted commit, page-aligned.
        bytes: usize,
        /// Byte offset of the commit cursor within the region.
        offset: usize,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A commit would run past the end of the reservation.
    #[error("region exhausted: requested {requested} bytes, {remaining} remaining")]
    RegionExhausted {
        /// Page-aligned size of the failed commit.
        requested: usize,
        /// Uncommitted bytes left in the reservation.
        remaining: usize,
    },

    /// A zero-byte reservation was requested.
    #[error("cannot reserve an empty region")]
    EmptyReservation,

    /// File I/O failure while reading asset data.
    #[error("file I/O failed")]
    Io(#[from] std::io::Error),
}

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;
