//! Byte-exact content comparison.
//!
//! # Overview
//!
//! [`Comparator`] reads two files in lock-step, one fixed-size chunk from
//! each at a time, and stops at the first chunk whose length or bytes
//! differ. Equal sizes are expected from callers but not assumed: a file
//! that is a strict prefix of the other ends with a short chunk and the
//! comparison fails.
//!
//! Buffers are allocated once per comparator and reused across calls.
//!
//! # Example
//!
//! ```no_run
//! use linkdupe::dedup::Comparator;
//! use std::path::Path;
//!
//! let mut comparator = Comparator::new();
//! let same = comparator
//!     .identical(Path::new("a.bin"), Path::new("b.bin"))
//!     .unwrap_or(false);
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Default chunk size (16 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// Largest accepted chunk size (64 MiB). Each comparator holds two buffers.
pub const MAX_BUFFER_SIZE: usize = 64 * 1024 * 1024;

/// Errors from opening or reading a file under comparison.
#[derive(thiserror::Error, Debug)]
pub enum CompareError {
    /// The file could not be opened.
    #[error("cannot open {path} for comparison: {source}")]
    Open {
        /// Path that failed to open
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Reading failed partway.
    #[error("read error while comparing {left} and {right}: {source}")]
    Read {
        /// First file
        left: PathBuf,
        /// Second file
        right: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Streaming file comparator with reusable buffers.
#[derive(Debug)]
pub struct Comparator {
    left: Vec<u8>,
    right: Vec<u8>,
    comparisons: usize,
}

impl Default for Comparator {
    fn default() -> Self {
        Self::new()
    }
}

impl Comparator {
    /// Comparator with [`DEFAULT_BUFFER_SIZE`] chunks.
    #[must_use]
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Comparator with `size`-byte chunks, clamped to
    /// `1..=`[`MAX_BUFFER_SIZE`].
    #[must_use]
    pub fn with_buffer_size(size: usize) -> Self {
        let size = size.clamp(1, MAX_BUFFER_SIZE);
        Self {
            left: vec![0; size],
            right: vec![0; size],
            comparisons: 0,
        }
    }

    /// Chunk size in bytes.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.left.len()
    }

    /// Number of file pairs compared so far.
    #[must_use]
    pub fn comparisons(&self) -> usize {
        self.comparisons
    }

    /// Whether the files at `a` and `b` have byte-identical content.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError`] if either file cannot be opened or read.
    pub fn identical(&mut self, a: &Path, b: &Path) -> Result<bool, CompareError> {
        let left = File::open(a).map_err(|source| CompareError::Open {
            path: a.to_path_buf(),
            source,
        })?;
        let right = File::open(b).map_err(|source| CompareError::Open {
            path: b.to_path_buf(),
            source,
        })?;

        self.comparisons += 1;
        self.identical_readers(left, right)
            .map_err(|source| CompareError::Read {
                left: a.to_path_buf(),
                right: b.to_path_buf(),
                source,
            })
    }

    /// Compare two readers to the end.
    ///
    /// # Errors
    ///
    /// Propagates the first read error from either side.
    pub fn identical_readers<L: Read, R: Read>(
        &mut self,
        mut left: L,
        mut right: R,
    ) -> io::Result<bool> {
        loop {
            let n_left = fill(&mut left, &mut self.left)?;
            let n_right = fill(&mut right, &mut self.right)?;

            if n_left != n_right {
                return Ok(false);
            }
            if self.left[..n_left] != self.right[..n_right] {
                return Ok(false);
            }
            if n_left < self.left.len() {
                // Both sides hit EOF in the same chunk.
                return Ok(true);
            }
        }
    }
}

/// Read until `buf` is full or the reader is exhausted.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
