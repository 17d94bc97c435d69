//! Diagnostic output on stderr via `log` + `env_logger`.
//!
//! Severity use across the crate:
//!
//! - `error`: skipped roots and fatal conditions
//! - `warn`: recoverable skips below a root (unlistable directory, failed stat)
//! - `info`: every merge, naming both files
//! - `debug`: per-file examination trace
//! - `trace`: why each candidate was rejected
//!
//! The level comes from `RUST_LOG` if set, otherwise from the flags:
//! `--quiet` shows errors only, the default is info, `-v` is debug and
//! `-vv` is trace.

use env_logger::Builder;
use log::LevelFilter;
use std::env;
use std::io::Write;

/// Install the global logger.
///
/// Later calls are ignored, so tests and embedders may call it freely.
pub fn init_logging(verbose: u8, quiet: bool) {
    let mut builder = Builder::new();
    let from_env = env::var_os("RUST_LOG").is_some();
    if from_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(verbose, quiet));
    }
    configure_format(&mut builder, verbose);

    if builder.try_init().is_ok() {
        log::debug!(
            "logging initialized at {} ({})",
            current_level_name(),
            if from_env { "RUST_LOG" } else { "flags" }
        );
    }
}

/// Level selected by the command-line flags.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    }
}

fn configure_format(builder: &mut Builder, verbose: u8) {
    // Debug builds (and -v in any build) get timestamps and module paths.
    let detailed = cfg!(debug_assertions) || verbose > 0;
    builder.format(move |buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        if detailed {
            writeln!(
                buf,
                "{} {style}{:<5}{style:#} [{}] {}",
                buf.timestamp_millis(),
                level,
                record.module_path().unwrap_or("linkdupe"),
                record.args()
            )
        } else {
            writeln!(buf, "{style}{:<5}{style:#} {}", level, record.args())
        }
    });
}

/// Name of the active maximum level.
pub fn current_level_name() -> &'static str {
    match log::max_level() {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}
