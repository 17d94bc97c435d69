//! Layered configuration.
//!
//! Settings are merged in this order, later sources winning:
//!
//! 1. Built-in defaults
//! 2. `config.toml` in the platform config directory (or `--config <PATH>`)
//! 3. `LINKDUPE_*` environment variables (e.g. `LINKDUPE_DRY_RUN=true`)
//! 4. Command-line flags

use anyhow::{Context, Result};
use bytesize::ByteSize;
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::{Cli, ReportFormat};
use crate::dedup::{DedupConfig, DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "LINKDUPE_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Plan merges without touching the filesystem.
    pub dry_run: bool,
    /// Comparator chunk size in bytes.
    pub buffer_size: u64,
    /// Summary printed at the end of a run.
    pub report: ReportFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dry_run: false,
            buffer_size: DEFAULT_BUFFER_SIZE as u64,
            report: ReportFormat::None,
        }
    }
}

impl Config {
    /// Load defaults, file and environment.
    ///
    /// A missing default file is not an error. A missing explicit file, or
    /// an unreadable or malformed one, is.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or holds invalid values.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.is_file() {
                anyhow::bail!("configuration file {} does not exist", path.display());
            }
        }
        let config: Self = Self::figment(explicit)
            .extract()
            .context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// The figment behind [`Config::load`], exposed for inspection.
    #[must_use]
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        match explicit.map(Path::to_path_buf).or_else(Self::config_path) {
            Some(path) => {
                log::debug!("reading configuration from {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => log::debug!("no configuration directory available"),
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Apply command-line overrides.
    #[must_use]
    pub fn with_cli(mut self, cli: &Cli) -> Self {
        if cli.dry_run {
            self.dry_run = true;
        }
        if let Some(size) = cli.buffer_size {
            self.buffer_size = size;
        }
        if let Some(report) = cli.report {
            self.report = report;
        }
        self
    }

    /// Check values that parse but make no sense.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero or oversized buffer size.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            anyhow::bail!("buffer_size must be at least 1 byte");
        }
        if self.buffer_size > MAX_BUFFER_SIZE as u64 {
            anyhow::bail!(
                "buffer_size {} exceeds the maximum of {}",
                ByteSize::b(self.buffer_size),
                ByteSize::b(MAX_BUFFER_SIZE as u64)
            );
        }
        Ok(())
    }

    /// Engine options derived from this configuration.
    #[must_use]
    pub fn dedup_config(&self) -> DedupConfig {
        DedupConfig::default()
            .with_dry_run(self.dry_run)
            .with_buffer_size(usize::try_from(self.buffer_size).unwrap_or(MAX_BUFFER_SIZE))
    }

    /// Default platform-specific configuration path.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "linkdupe", "linkdupe")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
