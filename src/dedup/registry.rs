//! Inode bookkeeping for a deduplication run.
//!
//! # Overview
//!
//! Two maps keyed by inode number (the run is confined to one device, so the
//! inode alone is unique):
//!
//! - **kept**: the representative file of every equivalence class seen so
//!   far. Entries are never removed; merging only adds names to kept inodes.
//! - **merged**: inodes already found to duplicate a kept inode that still
//!   have names we have not visited (`nlink > 1` when matched). Later names
//!   are linked straight to the recorded target without another comparison.
//!
//! # Example
//!
//! ```
//! use linkdupe::dedup::{FileRecord, InodeRegistry};
//! use std::path::PathBuf;
//!
//! let mut registry = InodeRegistry::new();
//! let rec = FileRecord {
//!     path: PathBuf::from("/a/f1"),
//!     dev: 1, ino: 10, size: 5, mode: 0o100644,
//!     uid: 1000, gid: 1000, mtime: 0, nlink: 1,
//! };
//! registry.keep(rec);
//! assert!(registry.is_kept(10));
//!
//! registry.record_merge(20, 10);
//! assert_eq!(registry.merge_target(20), Some(10));
//! ```

use std::collections::HashMap;

use super::FileRecord;

/// Kept-inode set plus the map of partially merged inodes.
#[derive(Debug, Default)]
pub struct InodeRegistry {
    /// Representative record per kept inode
    kept: HashMap<u64, FileRecord>,
    /// Already-matched inode -> kept inode it merges into
    merged: HashMap<u64, u64>,
}

impl InodeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `ino` is the representative of a kept class.
    #[must_use]
    pub fn is_kept(&self, ino: u64) -> bool {
        self.kept.contains_key(&ino)
    }

    /// Record of the kept inode `ino`, if any.
    #[must_use]
    pub fn kept(&self, ino: u64) -> Option<&FileRecord> {
        self.kept.get(&ino)
    }

    /// Make `record` the representative of a new class.
    ///
    /// A record whose inode is already kept leaves the existing entry alone.
    pub fn keep(&mut self, record: FileRecord) {
        self.kept.entry(record.ino).or_insert(record);
    }

    /// Kept inode that `ino` was previously matched against.
    #[must_use]
    pub fn merge_target(&self, ino: u64) -> Option<u64> {
        self.merged.get(&ino).copied()
    }

    /// Remember that remaining names of `ino` belong to `target`.
    pub fn record_merge(&mut self, ino: u64, target: u64) {
        self.merged.insert(ino, target);
    }

    /// Drop the merge entry for `ino`; its last unseen name has been handled.
    pub fn forget_merge(&mut self, ino: u64) -> Option<u64> {
        self.merged.remove(&ino)
    }

    /// Number of kept classes.
    #[must_use]
    pub fn kept_count(&self) -> usize {
        self.kept.len()
    }

    /// Number of inodes still awaiting more names.
    #[must_use]
    pub fn pending_merges(&self) -> usize {
        self.merged.len()
    }
}
