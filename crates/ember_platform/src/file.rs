//! # Binary File Access
//!
//! Blocking reads for baked asset data. This is the whole file surface the
//! engine core uses: open, size, read into a caller-provided buffer, rewind.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::PlatformResult;

/// An open, read-only binary file with a known size.
pub struct BinaryFile {
    file: File,
    len: usize,
}

impl BinaryFile {
    /// Opens `path` for reading and captures its size.
    ///
    /// # Errors
    ///
    /// Propagates the OS error if the file cannot be opened or stat'd.
    pub fn open(path: impl AsRef<Path>) -> PlatformResult<Self> {
        let file = File::open(path)?;
        let len = usize::try_from(file.metadata()?.len()).unwrap_or(usize::MAX);
        Ok(Self { file, len })
    }

    /// Returns the file size in bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the file is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads exactly `buf.len()` bytes from the current position.
    ///
    /// # Errors
    ///
    /// Fails with an I/O error if the file ends early or the read fails.
    pub fn read_into(&mut self, buf: &mut [u8]) -> PlatformResult<()> {
        self.file.read_exact(buf)?;
        Ok(())
    }

    /// Seeks back to the start of the file.
    ///
    /// # Errors
    ///
    /// Propagates the OS error if the seek fails.
    pub fn rewind(&mut self) -> PlatformResult<()> {
        self.file.seek(SeekFrom::Start(0))?;
        Ok(())
    }
}
