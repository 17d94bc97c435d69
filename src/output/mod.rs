//! End-of-run summary formatters.
//!
//! - [`json`]: machine-readable document for scripting
//! - [`text`]: human-readable lines
//!
//! Both go to stdout; diagnostics stay on stderr.

pub mod json;
pub mod text;

use std::io::Write;

pub use json::JsonReport;
pub use text::TextReport;

use crate::cli::ReportFormat;
use crate::dedup::RunSummary;
use crate::error::ExitCode;

/// Write `summary` in `format` to `writer`. `ReportFormat::None` writes nothing.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_report<W: Write>(
    writer: &mut W,
    format: ReportFormat,
    summary: &RunSummary,
    exit_code: ExitCode,
) -> Result<(), ReportError> {
    match format {
        ReportFormat::None => Ok(()),
        ReportFormat::Text => TextReport::new(summary).write_to(writer),
        ReportFormat::Json => JsonReport::new(summary, exit_code).write_to(writer, true),
    }
}

/// Errors that can occur while writing a report.
#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error while writing report: {0}")]
    Io(#[from] std::io::Error),
}
