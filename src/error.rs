//! Structured error handling and exit codes.

use serde::Serialize;

use crate::dedup::DedupError;

/// Exit codes for linkdupe.
///
/// Values follow `sysexits.h` where one applies:
/// - 0: Success (every root traversed; cross-device skips are not failures)
/// - 1: General error (configuration, report output)
/// - 66: No input (`EX_NOINPUT`, a root could not be read at all)
/// - 69: Unavailable (`EX_UNAVAILABLE`, a hardlink could not be installed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: all roots traversed.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// No input: at least one root could not be stat'ed or listed.
    NoInput = 66,
    /// Unavailable: linking failed and the run was aborted.
    Unavailable = 69,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "LD000",
            Self::GeneralError => "LD001",
            Self::NoInput => "LD066",
            Self::Unavailable => "LD069",
        }
    }

    /// Exit code for an error that escaped [`crate::run_app`].
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        if err.downcast_ref::<DedupError>().is_some() {
            Self::Unavailable
        } else {
            Self::GeneralError
        }
    }
}

/// Structured error information for `--json-errors`.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "LD069")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Destination path of a failed link, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        let path = err.downcast_ref::<DedupError>().map(|e| match e {
            DedupError::Link(link) => link.dest().display().to_string(),
        });
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: err.to_string(),
            path,
        }
    }
}
