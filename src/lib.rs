//! linkdupe - Hardlink Deduplicator
//!
//! Walks one or more directory trees on a single filesystem and replaces
//! every duplicate regular file with a hardlink to one kept copy. Each name
//! goes through a link, unlink, relink sequence that is not atomic: a
//! failure between unlink and relink leaves that one name missing, never
//! pointing at the wrong content.

#[cfg(not(unix))]
compile_error!("linkdupe relies on Unix inode semantics and only builds on Unix targets");

pub mod cli;
pub mod config;
pub mod dedup;
pub mod error;
pub mod logging;
pub mod output;

use anyhow::{Context, Result};

use crate::cli::Cli;
use crate::config::Config;
use crate::dedup::Walker;
use crate::error::ExitCode;

/// Run one deduplication pass as described by `cli`.
///
/// Recoverable problems (unreadable or cross-device roots, unlistable
/// directories) are logged and reflected in the returned exit code. A
/// failure to install a hardlink aborts the run and is returned as an
/// error wrapping [`dedup::DedupError`].
///
/// # Errors
///
/// Returns an error for invalid configuration, a linking failure, or a
/// failure to write the report.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref())?.with_cli(&cli);
    config.validate()?;
    log::debug!("effective configuration: {config:?}");

    let mut walker = Walker::new(config.dedup_config());
    walker.walk(cli.roots.as_slice())?;
    let summary = walker.into_summary();

    log::debug!(
        "{} files examined, {} kept, {} merged, {} bytes reclaimed",
        summary.files_examined,
        summary.kept_files,
        summary.merges.len(),
        summary.bytes_reclaimed
    );

    let exit_code = if summary.has_unreadable_roots() {
        ExitCode::NoInput
    } else {
        ExitCode::Success
    };

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    output::write_report(&mut handle, config.report, &summary, exit_code)
        .context("failed to write report")?;

    Ok(exit_code)
}
