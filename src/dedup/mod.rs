//! Hardlink deduplication engine.
//!
//! This module provides functionality for:
//! - Single-device directory traversal ([`walker`])
//! - Inode bookkeeping for kept and already-merged files ([`registry`])
//! - Size bucketing of kept files ([`size_index`])
//! - Chunked byte-for-byte content comparison ([`compare`])
//! - Classification of each discovered file ([`matcher`])
//! - Race-aware hardlink installation ([`linker`])
//!
//! # Architecture
//!
//! The [`Walker`] owns all run state. Every regular file it discovers is
//! snapshotted into a [`FileRecord`] and handed to the [`Matcher`], which
//! answers with an [`Action`]. A `MergeWith` answer is carried out by the
//! [`Linker`]; a `BecomeNewKept` answer makes the file the representative of
//! a new equivalence class.
//!
//! # Example
//!
//! ```no_run
//! use linkdupe::dedup::{DedupConfig, Walker};
//!
//! let mut walker = Walker::new(DedupConfig::default().with_dry_run(true));
//! walker.walk(&["/srv/builds"]).expect("fatal linking error");
//! println!("{} merges planned", walker.summary().merges.len());
//! ```

pub mod compare;
pub mod linker;
pub mod matcher;
pub mod registry;
pub mod size_index;
pub mod walker;

use std::fmt;
use std::fs::Metadata;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

pub use compare::{Comparator, CompareError, DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE};
pub use linker::{LinkError, LinkFs, LinkOutcome, LinkStage, Linker, SystemFs};
pub use matcher::{Action, Matcher};
pub use registry::InodeRegistry;
pub use size_index::SizeIndex;
pub use walker::Walker;

/// Snapshot of one directory entry's inode, taken when the entry is visited.
///
/// Records are never updated. A second name for the same inode gets its own
/// record from a fresh `lstat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path of the directory entry this snapshot was taken through
    pub path: PathBuf,
    /// Device id of the containing filesystem
    pub dev: u64,
    /// Inode number
    pub ino: u64,
    /// Size in bytes
    pub size: u64,
    /// File type and permission bits (`st_mode`)
    pub mode: u32,
    /// Owner user id
    pub uid: u32,
    /// Owner group id
    pub gid: u32,
    /// Modification time, whole seconds since the epoch
    pub mtime: i64,
    /// Number of hardlinks at snapshot time
    pub nlink: u64,
}

impl FileRecord {
    /// Build a record from metadata obtained for `path`.
    #[must_use]
    pub fn from_metadata(path: PathBuf, metadata: &Metadata) -> Self {
        Self {
            path,
            dev: metadata.dev(),
            ino: metadata.ino(),
            size: metadata.size(),
            mode: metadata.mode(),
            uid: metadata.uid(),
            gid: metadata.gid(),
            mtime: metadata.mtime(),
            nlink: metadata.nlink(),
        }
    }

    /// `lstat` the path and snapshot the result. Symlinks are not followed.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the entry cannot be stat'ed.
    pub fn lstat(path: &Path) -> io::Result<Self> {
        let metadata = std::fs::symlink_metadata(path)?;
        Ok(Self::from_metadata(path.to_path_buf(), &metadata))
    }

    /// Whether hardlinking `self` and `other` together would preserve the
    /// permissions, ownership and modification time visible through both.
    #[must_use]
    pub fn metadata_matches(&self, other: &FileRecord) -> bool {
        self.mode == other.mode
            && self.uid == other.uid
            && self.gid == other.gid
            && self.mtime == other.mtime
    }
}

impl fmt::Display for FileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "inode {}, represented by {}",
            self.ino,
            self.path.display()
        )
    }
}

/// Options for one deduplication run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupConfig {
    /// Classify and log, but never call `link`/`unlink`.
    pub dry_run: bool,
    /// Chunk size used by the content comparator.
    pub buffer_size: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl DedupConfig {
    /// Enable or disable dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the comparator chunk size, clamped to `1..=`[`MAX_BUFFER_SIZE`].
    #[must_use]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.clamp(1, MAX_BUFFER_SIZE);
        self
    }
}

/// A recoverable problem met during traversal.
///
/// Each one narrows what the run covers but never stops it.
#[derive(thiserror::Error, Debug)]
pub enum WalkIssue {
    /// A root given on the command line could not be stat'ed or listed.
    #[error("cannot read root {path}: {source}")]
    RootUnreadable {
        /// The root as given
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// An entry lives on a different filesystem than the run's device.
    #[error("{0} resides on another file system, ignoring")]
    CrossDevice(PathBuf),

    /// A directory below a root could not be listed.
    #[error("cannot list directory {path}: {source}")]
    DirectoryUnreadable {
        /// Directory path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A single entry could not be stat'ed.
    #[error("cannot stat {path}: {source}")]
    StatFailure {
        /// Entry path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl WalkIssue {
    /// Path the issue is about.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::RootUnreadable { path, .. }
            | Self::DirectoryUnreadable { path, .. }
            | Self::StatFailure { path, .. }
            | Self::CrossDevice(path) => path,
        }
    }
}

/// Error that aborts a run.
#[derive(thiserror::Error, Debug)]
pub enum DedupError {
    /// Installing a hardlink failed partway; on-disk state needs attention.
    #[error(transparent)]
    Link(#[from] LinkError),
}

/// One merge performed (or planned, in dry-run mode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRecord {
    /// Representative path of the kept inode
    pub kept: PathBuf,
    /// Kept inode number
    pub kept_ino: u64,
    /// Path that now names the kept inode
    pub linked: PathBuf,
    /// Inode the linked path referred to before the merge
    pub replaced_ino: u64,
    /// File size in bytes
    pub size: u64,
}

/// Counters and merge log of a run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Whether the run was a dry run
    pub dry_run: bool,
    /// Roots that were traversed (or handled as a single file)
    pub roots_processed: usize,
    /// Roots that could not be stat'ed or listed
    pub roots_unreadable: usize,
    /// Roots skipped because they live on another device
    pub roots_cross_device: usize,
    /// Entries below a root skipped because they live on another device
    pub entries_cross_device: usize,
    /// Directories below a root that could not be listed
    pub directories_unreadable: usize,
    /// Entries that could not be stat'ed
    pub stat_failures: usize,
    /// Regular-file directory entries examined
    pub files_examined: usize,
    /// Entries that named an inode already kept
    pub already_kept: usize,
    /// Distinct equivalence classes kept
    pub kept_files: usize,
    /// Bytes freed by merges that dropped an inode's last name
    pub bytes_reclaimed: u64,
    /// Merges in the order they happened
    pub merges: Vec<MergeRecord>,
    /// Every recoverable issue, in the order met
    pub issues: Vec<WalkIssue>,
}

impl RunSummary {
    /// Record a recoverable issue and bump the matching counter.
    pub fn record_issue(&mut self, issue: WalkIssue, at_root: bool) {
        match &issue {
            WalkIssue::RootUnreadable { .. } => self.roots_unreadable += 1,
            WalkIssue::CrossDevice(_) if at_root => self.roots_cross_device += 1,
            WalkIssue::CrossDevice(_) => self.entries_cross_device += 1,
            WalkIssue::DirectoryUnreadable { .. } => self.directories_unreadable += 1,
            WalkIssue::StatFailure { .. } => self.stat_failures += 1,
        }
        self.issues.push(issue);
    }

    /// Whether any root could not be read at all.
    #[must_use]
    pub fn has_unreadable_roots(&self) -> bool {
        self.roots_unreadable > 0
    }
}
