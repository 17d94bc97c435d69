//! Classification of discovered files.
//!
//! # Overview
//!
//! [`Matcher::classify`] decides what to do with one directory entry:
//!
//! 1. **Kept inode**: a further name of a representative. Nothing to do.
//! 2. **Merged inode**: a further name of an inode already matched against a
//!    kept one. Link it to the same target without comparing again.
//! 3. **Same-size candidates**: cheap metadata rejection (mode, uid, gid,
//!    mtime), then a full content comparison. First match wins.
//! 4. **No match**: the file becomes a new representative.
//!
//! Only the content comparison decides equality; the size and metadata
//! filters exist to skip comparisons that could never succeed or whose
//! merge would silently change a file's visible permissions or owner.

use super::compare::Comparator;
use super::registry::InodeRegistry;
use super::size_index::SizeIndex;
use super::FileRecord;

/// What to do with a classified file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// The entry names an inode we already keep.
    AlreadyKept,
    /// Replace the entry with a hardlink to this kept file.
    MergeWith(FileRecord),
    /// The entry is the first of a new equivalence class.
    BecomeNewKept,
}

/// Kept-set, merge map and size index, plus the comparator that rules on them.
#[derive(Debug, Default)]
pub struct Matcher {
    registry: InodeRegistry,
    sizes: SizeIndex,
    comparator: Comparator,
}

impl Matcher {
    /// Matcher with the default comparator chunk size.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Matcher whose comparator reads `buffer_size`-byte chunks.
    #[must_use]
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            comparator: Comparator::with_buffer_size(buffer_size),
            ..Self::default()
        }
    }

    /// Inode bookkeeping.
    #[must_use]
    pub fn registry(&self) -> &InodeRegistry {
        &self.registry
    }

    /// Size buckets of kept inodes.
    #[must_use]
    pub fn sizes(&self) -> &SizeIndex {
        &self.sizes
    }

    /// Number of full content comparisons run so far.
    #[must_use]
    pub fn comparisons(&self) -> usize {
        self.comparator.comparisons()
    }

    /// Classify `record` and update the run state accordingly.
    ///
    /// A `BecomeNewKept` answer has already inserted the record into the
    /// kept set and size index when this returns.
    pub fn classify(&mut self, record: &FileRecord) -> Action {
        if self.registry.is_kept(record.ino) {
            log::debug!("another link to inode {} that we keep", record.ino);
            return Action::AlreadyKept;
        }

        if let Some(action) = self.follow_previous_merge(record) {
            return action;
        }

        log::debug!("{} is new to us", record);
        if let Some(target) = self.find_match(record) {
            if record.nlink > 1 {
                self.registry.record_merge(record.ino, target.ino);
            }
            return Action::MergeWith(target);
        }

        log::debug!("we keep {}", record);
        self.sizes.insert(record.size, record.ino);
        self.registry.keep(record.clone());
        Action::BecomeNewKept
    }

    fn follow_previous_merge(&mut self, record: &FileRecord) -> Option<Action> {
        let target_ino = self.registry.merge_target(record.ino)?;
        let Some(target) = self.registry.kept(target_ino).cloned() else {
            // Kept entries are never removed, so this only happens if the map
            // was fed an inode that was never kept. Fall back to matching.
            log::warn!(
                "merge target inode {} for inode {} is not kept, re-matching",
                target_ino,
                record.ino
            );
            self.registry.forget_merge(record.ino);
            return None;
        };

        log::debug!(
            "another link to inode {} that we merge with {}",
            record.ino,
            target
        );
        if record.nlink == 1 {
            self.registry.forget_merge(record.ino);
        }
        Some(Action::MergeWith(target))
    }

    fn find_match(&mut self, record: &FileRecord) -> Option<FileRecord> {
        for &ino in self.sizes.candidates(record.size) {
            let Some(candidate) = self.registry.kept(ino) else {
                continue;
            };
            log::debug!("looking if it matches {}", candidate);

            if !candidate.metadata_matches(record) {
                log::trace!("metadata differs from {}", candidate);
                continue;
            }

            match self.comparator.identical(&candidate.path, &record.path) {
                Ok(true) => return Some(candidate.clone()),
                Ok(false) => log::trace!("content differs from {}", candidate),
                Err(e) => log::warn!("skipping candidate {}: {}", candidate, e),
            }
        }
        None
    }
}
