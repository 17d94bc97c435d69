//! Single-device directory traversal that drives deduplication.
//!
//! # Overview
//!
//! [`Walker::walk`] visits each root in order. The first root that can be
//! stat'ed fixes the device for the whole run; any root or nested entry on
//! another device is reported and left alone, since hardlinks cannot cross
//! filesystems.
//!
//! Traversal is driven by [`walkdir`]. Every directory listing is read in
//! full and its handle closed before anything below it is opened, so at most
//! one directory descriptor is open at a time regardless of depth or width.
//! Within a listing, regular files are classified before any subdirectory
//! is entered.
//!
//! Symlinks, device nodes, sockets and FIFOs are ignored.
//!
//! # Errors
//!
//! Unreadable roots, unlistable directories, failed stats and cross-device
//! entries are recorded in the [`RunSummary`] and traversal goes on. A
//! linking failure stops the walk and is returned as [`DedupError`].

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use walkdir::WalkDir;

use super::linker::{LinkFs, LinkOutcome, Linker, SystemFs};
use super::matcher::{Action, Matcher};
use super::{DedupConfig, DedupError, FileRecord, MergeRecord, RunSummary, WalkIssue};

/// Owns the whole state of one deduplication run.
#[derive(Debug)]
pub struct Walker<F: LinkFs = SystemFs> {
    matcher: Matcher,
    linker: Linker<F>,
    /// Device every visited entry must live on, fixed by the first root
    device: Option<u64>,
    summary: RunSummary,
}

impl Walker<SystemFs> {
    /// Walker that links on the real filesystem.
    #[must_use]
    pub fn new(config: DedupConfig) -> Self {
        let linker = Linker::new(config.dry_run);
        Self::with_linker(&config, linker)
    }
}

impl<F: LinkFs> Walker<F> {
    /// Walker using a custom linker backend.
    #[must_use]
    pub fn with_linker(config: &DedupConfig, linker: Linker<F>) -> Self {
        Self {
            matcher: Matcher::with_buffer_size(config.buffer_size),
            linker,
            device: None,
            summary: RunSummary {
                dry_run: config.dry_run,
                ..RunSummary::default()
            },
        }
    }

    /// Device id the run is confined to, once a root has been stat'ed.
    #[must_use]
    pub fn device(&self) -> Option<u64> {
        self.device
    }

    /// Matching state (kept set, merge map, size index).
    #[must_use]
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Counters and merges so far.
    #[must_use]
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Consume the walker, keeping only the summary.
    #[must_use]
    pub fn into_summary(self) -> RunSummary {
        self.summary
    }

    /// Deduplicate every root, in order.
    ///
    /// # Errors
    ///
    /// Returns [`DedupError`] as soon as a hardlink cannot be installed.
    /// Entries visited before that point keep whatever merges already
    /// happened.
    pub fn walk<P: AsRef<Path>>(&mut self, roots: &[P]) -> Result<(), DedupError> {
        for root in roots {
            self.walk_root(root.as_ref())?;
        }
        log::debug!(
            "walk finished: {} files examined, {} kept, {} merges",
            self.summary.files_examined,
            self.summary.kept_files,
            self.summary.merges.len()
        );
        Ok(())
    }

    fn walk_root(&mut self, root: &Path) -> Result<(), DedupError> {
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());

        let metadata = match fs::symlink_metadata(&root) {
            Ok(m) => m,
            Err(source) => {
                self.report(WalkIssue::RootUnreadable { path: root, source }, true);
                return Ok(());
            }
        };
        let record = FileRecord::from_metadata(root.clone(), &metadata);

        let device = *self.device.get_or_insert(record.dev);
        if record.dev != device {
            self.report(WalkIssue::CrossDevice(root), true);
            return Ok(());
        }

        let file_type = metadata.file_type();
        if file_type.is_dir() {
            if self.traverse(&root, device)? {
                self.summary.roots_processed += 1;
            }
        } else if file_type.is_file() {
            self.summary.roots_processed += 1;
            self.handle_file(record)?;
        } else {
            log::debug!("ignoring root {}: not a file or directory", root.display());
        }
        Ok(())
    }

    /// Walk everything below the directory `root`.
    ///
    /// Returns `false` if the root itself could not be listed; that is
    /// reported here as [`WalkIssue::RootUnreadable`].
    fn traverse(&mut self, root: &Path, device: u64) -> Result<bool, DedupError> {
        let mut entries = WalkDir::new(root)
            .follow_links(false)
            .max_open(1)
            // Sorting reads each listing to the end and closes it before
            // yielding; files sort ahead of subdirectories.
            .sort_by(|a, b| a.file_type().is_dir().cmp(&b.file_type().is_dir()))
            .into_iter();
        let mut root_listed = true;

        while let Some(next) = entries.next() {
            let entry = match next {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => {
                    root_listed = false;
                    self.report(
                        WalkIssue::RootUnreadable {
                            path: root.to_path_buf(),
                            source: err.into(),
                        },
                        true,
                    );
                    continue;
                }
                Err(err) => {
                    let path = err.path().unwrap_or(root).to_path_buf();
                    self.report(
                        WalkIssue::DirectoryUnreadable {
                            path,
                            source: err.into(),
                        },
                        false,
                    );
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(err) => {
                    self.report(
                        WalkIssue::StatFailure {
                            path: entry.into_path(),
                            source: err.into(),
                        },
                        false,
                    );
                    continue;
                }
            };

            if metadata.dev() != device {
                if metadata.is_dir() {
                    entries.skip_current_dir();
                }
                self.report(WalkIssue::CrossDevice(entry.into_path()), false);
                continue;
            }

            let file_type = metadata.file_type();
            if file_type.is_file() {
                self.handle_file(FileRecord::from_metadata(entry.into_path(), &metadata))?;
            } else if !file_type.is_dir() {
                log::trace!("ignoring {}", entry.path().display());
            }
        }
        Ok(root_listed)
    }

    fn handle_file(&mut self, record: FileRecord) -> Result<(), DedupError> {
        log::debug!("examining {}", record.path.display());
        self.summary.files_examined += 1;

        match self.matcher.classify(&record) {
            Action::AlreadyKept => self.summary.already_kept += 1,
            Action::BecomeNewKept => self.summary.kept_files += 1,
            Action::MergeWith(kept) => {
                log::info!("linking {} to {}", kept, record.path.display());
                let outcome = self.linker.install(&kept, &record.path)?;
                if outcome == LinkOutcome::Linked && record.nlink == 1 {
                    self.summary.bytes_reclaimed += record.size;
                }
                self.summary.merges.push(MergeRecord {
                    kept: kept.path,
                    kept_ino: kept.ino,
                    linked: record.path,
                    replaced_ino: record.ino,
                    size: record.size,
                });
            }
        }
        Ok(())
    }

    fn report(&mut self, issue: WalkIssue, at_root: bool) {
        match &issue {
            WalkIssue::RootUnreadable { .. } | WalkIssue::CrossDevice(_) if at_root => {
                log::error!("{}", issue);
            }
            _ => log::warn!("{}", issue),
        }
        self.summary.record_issue(issue, at_root);
    }
}
