//! JSON run report.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "merges": [
//!     {
//!       "kept": "/srv/a/lib.so",
//!       "kept_inode": 1234,
//!       "linked": "/srv/b/lib.so",
//!       "replaced_inode": 5678,
//!       "size": 1048576
//!     }
//!   ],
//!   "issues": [
//!     { "kind": "cross_device", "path": "/srv/a/mnt", "message": "..." }
//!   ],
//!   "summary": {
//!     "dry_run": false,
//!     "roots_processed": 2,
//!     "files_examined": 100,
//!     "kept_files": 60,
//!     "merges": 40,
//!     "bytes_reclaimed": 41943040,
//!     "exit_code": 0,
//!     "exit_code_name": "LD000"
//!   }
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use super::ReportError;
use crate::dedup::{MergeRecord, RunSummary, WalkIssue};
use crate::error::ExitCode;

/// One merge in JSON form.
#[derive(Debug, Clone, Serialize)]
pub struct JsonMerge {
    /// Representative path of the kept inode
    pub kept: String,
    /// Kept inode number
    pub kept_inode: u64,
    /// Path that was relinked
    pub linked: String,
    /// Inode the relinked path named before
    pub replaced_inode: u64,
    /// File size in bytes
    pub size: u64,
}

impl From<&MergeRecord> for JsonMerge {
    fn from(merge: &MergeRecord) -> Self {
        Self {
            kept: merge.kept.to_string_lossy().into_owned(),
            kept_inode: merge.kept_ino,
            linked: merge.linked.to_string_lossy().into_owned(),
            replaced_inode: merge.replaced_ino,
            size: merge.size,
        }
    }
}

/// One recoverable issue in JSON form.
#[derive(Debug, Clone, Serialize)]
pub struct JsonIssue {
    /// Issue kind (`root_unreadable`, `cross_device`, ...)
    pub kind: &'static str,
    /// Path the issue is about
    pub path: String,
    /// Full message
    pub message: String,
}

impl From<&WalkIssue> for JsonIssue {
    fn from(issue: &WalkIssue) -> Self {
        let kind = match issue {
            WalkIssue::RootUnreadable { .. } => "root_unreadable",
            WalkIssue::CrossDevice(_) => "cross_device",
            WalkIssue::DirectoryUnreadable { .. } => "directory_unreadable",
            WalkIssue::StatFailure { .. } => "stat_failure",
        };
        Self {
            kind,
            path: issue.path().to_string_lossy().into_owned(),
            message: issue.to_string(),
        }
    }
}

/// Counters in JSON form.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Whether nothing was actually linked
    pub dry_run: bool,
    /// Roots traversed
    pub roots_processed: usize,
    /// Roots that could not be read
    pub roots_unreadable: usize,
    /// Roots on another device
    pub roots_cross_device: usize,
    /// Entries below a root on another device
    pub entries_cross_device: usize,
    /// Directories that could not be listed
    pub directories_unreadable: usize,
    /// Entries that could not be stat'ed
    pub stat_failures: usize,
    /// Regular-file entries examined
    pub files_examined: usize,
    /// Distinct classes kept
    pub kept_files: usize,
    /// Merges performed or planned
    pub merges: usize,
    /// Bytes freed
    pub bytes_reclaimed: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "LD000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Build from a run summary.
    #[must_use]
    pub fn from_run_summary(summary: &RunSummary, exit_code: ExitCode) -> Self {
        Self {
            dry_run: summary.dry_run,
            roots_processed: summary.roots_processed,
            roots_unreadable: summary.roots_unreadable,
            roots_cross_device: summary.roots_cross_device,
            entries_cross_device: summary.entries_cross_device,
            directories_unreadable: summary.directories_unreadable,
            stat_failures: summary.stat_failures,
            files_examined: summary.files_examined,
            kept_files: summary.kept_files,
            merges: summary.merges.len(),
            bytes_reclaimed: summary.bytes_reclaimed,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    /// Merges in the order they happened
    pub merges: Vec<JsonMerge>,
    /// Recoverable issues in the order met
    pub issues: Vec<JsonIssue>,
    /// Counters
    pub summary: JsonSummary,
}

impl JsonReport {
    /// Build a report from a finished run.
    #[must_use]
    pub fn new(summary: &RunSummary, exit_code: ExitCode) -> Self {
        Self {
            merges: summary.merges.iter().map(JsonMerge::from).collect(),
            issues: summary.issues.iter().map(JsonIssue::from).collect(),
            summary: JsonSummary::from_run_summary(summary, exit_code),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), ReportError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}
