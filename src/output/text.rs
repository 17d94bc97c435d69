//! Human-readable run report.

use std::io::Write;

use bytesize::ByteSize;

use super::ReportError;
use crate::dedup::RunSummary;

/// Plain-text summary: one line per merge, then the totals.
#[derive(Debug)]
pub struct TextReport<'a> {
    summary: &'a RunSummary,
}

impl<'a> TextReport<'a> {
    /// Wrap a finished run's summary.
    #[must_use]
    pub fn new(summary: &'a RunSummary) -> Self {
        Self { summary }
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), ReportError> {
        let s = self.summary;
        let verb = if s.dry_run { "would link" } else { "linked" };

        for merge in &s.merges {
            writeln!(
                writer,
                "{verb} {} -> {} ({})",
                merge.linked.display(),
                merge.kept.display(),
                ByteSize::b(merge.size)
            )?;
        }

        writeln!(
            writer,
            "{} files examined, {} kept, {} merged{}",
            s.files_examined,
            s.kept_files,
            s.merges.len(),
            if s.dry_run { " (dry run)" } else { "" }
        )?;
        writeln!(writer, "reclaimed {}", ByteSize::b(s.bytes_reclaimed))?;

        let skipped = s.roots_unreadable
            + s.roots_cross_device
            + s.entries_cross_device
            + s.directories_unreadable
            + s.stat_failures;
        if skipped > 0 {
            writeln!(
                writer,
                "skipped: {} unreadable roots, {} cross-device roots, {} cross-device entries, \
                 {} unreadable directories, {} failed stats",
                s.roots_unreadable,
                s.roots_cross_device,
                s.entries_cross_device,
                s.directories_unreadable,
                s.stat_failures
            )?;
        }
        Ok(())
    }
}
