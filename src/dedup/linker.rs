//! Hardlink installation with a bounded retry.
//!
//! # Protocol
//!
//! To make `dest` a name of the kept inode:
//!
//! 1. `link(kept, dest)`. This is expected to fail with `EEXIST`, because
//!    `dest` still names the duplicate we just compared.
//! 2. If the link *succeeds*, `dest` vanished between comparison and now.
//!    Something else is mutating the tree; abort.
//! 3. On `EEXIST`, `unlink(dest)` and link again, exactly once.
//! 4. Any other failure, at any step, aborts the run.
//!
//! The destination is never left worse than "missing", and nothing is
//! unlinked unless the first link attempt proved the name is occupied.
//!
//! Filesystem calls go through [`LinkFs`] so the protocol can be exercised
//! against scripted failures.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::FileRecord;

/// The two filesystem calls the linker needs.
pub trait LinkFs {
    /// Create `link` as a new name of `original`.
    fn hard_link(&self, original: &Path, link: &Path) -> io::Result<()>;

    /// Remove the directory entry `path`.
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// [`LinkFs`] backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemFs;

impl LinkFs for SystemFs {
    fn hard_link(&self, original: &Path, link: &Path) -> io::Result<()> {
        fs::hard_link(original, link)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// Which step of the protocol failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStage {
    /// First link attempt failed with something other than `EEXIST`.
    Link,
    /// Removing the old destination entry failed.
    Unlink,
    /// The retried link failed after the destination was removed.
    Relink,
}

impl LinkStage {
    fn aftermath(self) -> &'static str {
        match self {
            Self::Link => "nothing was changed",
            Self::Unlink => "destination is untouched",
            Self::Relink => "destination was already unlinked",
        }
    }
}

impl fmt::Display for LinkStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link => write!(f, "linking"),
            Self::Unlink => write!(f, "unlinking destination before linking"),
            Self::Relink => write!(f, "re-linking"),
        }
    }
}

/// Fatal hardlink installation errors.
#[derive(thiserror::Error, Debug)]
pub enum LinkError {
    /// The first link attempt succeeded, so the destination did not exist.
    #[error(
        "linking inode {kept_ino}, represented by {}, to {} succeeded before unlinking (race condition)",
        .kept_path.display(),
        .dest.display()
    )]
    RaceViolation {
        /// Kept inode number
        kept_ino: u64,
        /// Representative path of the kept inode
        kept_path: PathBuf,
        /// Destination path
        dest: PathBuf,
    },

    /// A link or unlink call failed.
    #[error(
        "{stage} inode {kept_ino}, represented by {}, to {}: {source}; {}",
        .kept_path.display(),
        .dest.display(),
        .stage.aftermath()
    )]
    InstallFailure {
        /// Protocol step that failed
        stage: LinkStage,
        /// Kept inode number
        kept_ino: u64,
        /// Representative path of the kept inode
        kept_path: PathBuf,
        /// Destination path
        dest: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl LinkError {
    /// Destination path involved.
    #[must_use]
    pub fn dest(&self) -> &Path {
        match self {
            Self::RaceViolation { dest, .. } | Self::InstallFailure { dest, .. } => dest,
        }
    }

    fn install(stage: LinkStage, kept: &FileRecord, dest: &Path, source: io::Error) -> Self {
        Self::InstallFailure {
            stage,
            kept_ino: kept.ino,
            kept_path: kept.path.clone(),
            dest: dest.to_path_buf(),
            source,
        }
    }
}

/// Result of a successful [`Linker::install`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The destination now names the kept inode.
    Linked,
    /// Dry run: nothing was touched.
    Planned,
}

/// Installs hardlinks following the protocol in the module docs.
#[derive(Debug, Clone, Default)]
pub struct Linker<F: LinkFs = SystemFs> {
    fs: F,
    dry_run: bool,
}

impl Linker<SystemFs> {
    /// Linker on the real filesystem.
    #[must_use]
    pub fn new(dry_run: bool) -> Self {
        Self::with_fs(SystemFs, dry_run)
    }
}

impl<F: LinkFs> Linker<F> {
    /// Linker using a custom filesystem backend.
    #[must_use]
    pub fn with_fs(fs: F, dry_run: bool) -> Self {
        Self { fs, dry_run }
    }

    /// Whether link/unlink calls are suppressed.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Filesystem backend.
    #[must_use]
    pub fn fs(&self) -> &F {
        &self.fs
    }

    /// Make `dest` a hardlink to `kept`'s inode.
    ///
    /// # Errors
    ///
    /// - [`LinkError::RaceViolation`] if `dest` did not exist
    /// - [`LinkError::InstallFailure`] if any link or unlink call failed
    pub fn install(&self, kept: &FileRecord, dest: &Path) -> Result<LinkOutcome, LinkError> {
        if self.dry_run {
            log::debug!("dry run: not linking {} to {}", kept, dest.display());
            return Ok(LinkOutcome::Planned);
        }

        match self.fs.hard_link(&kept.path, dest) {
            Ok(()) => {
                return Err(LinkError::RaceViolation {
                    kept_ino: kept.ino,
                    kept_path: kept.path.clone(),
                    dest: dest.to_path_buf(),
                });
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(LinkError::install(LinkStage::Link, kept, dest, e)),
        }

        self.fs
            .remove_file(dest)
            .map_err(|e| LinkError::install(LinkStage::Unlink, kept, dest, e))?;

        self.fs
            .hard_link(&kept.path, dest)
            .map_err(|e| LinkError::install(LinkStage::Relink, kept, dest, e))?;

        Ok(LinkOutcome::Linked)
    }
}
