//! Size buckets of kept inodes.
//!
//! Most files have no same-size kept peer, so bucketing by size turns the
//! common case into a single hash lookup before any content is read.

use std::collections::HashMap;

/// Multi-valued map from file size to kept inode numbers.
///
/// Buckets keep insertion order, so candidates are tried oldest first.
/// Append-only for the duration of a run; an empty bucket is never stored.
#[derive(Debug, Default)]
pub struct SizeIndex {
    buckets: HashMap<u64, Vec<u64>>,
}

impl SizeIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `ino` to the bucket for `size`.
    pub fn insert(&mut self, size: u64, ino: u64) {
        self.buckets.entry(size).or_default().push(ino);
    }

    /// Kept inodes of exactly `size` bytes, in insertion order.
    #[must_use]
    pub fn candidates(&self, size: u64) -> &[u64] {
        self.buckets.get(&size).map_or(&[], Vec::as_slice)
    }

    /// Number of distinct sizes seen.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Total inodes indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Whether nothing has been indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
