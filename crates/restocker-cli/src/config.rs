//! CLI configuration

use crate::error::{CliError, CliResult};
use restocker::RestockConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "restocker.yaml";

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - errors only
    Quiet,
    /// Normal - step progress
    #[default]
    Normal,
    /// Verbose - resolver misses and timings
    Verbose,
    /// Debug - everything, including browser traffic
    Debug,
}

impl Verbosity {
    /// Map `-q` and the `-v` count to a level; quiet wins
    #[must_use]
    pub const fn from_flags(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Default `EnvFilter` directive for this level
    #[must_use]
    pub const fn filter_directive(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "info,chromiumoxide=warn,hyper=warn,reqwest=warn",
            Self::Verbose => "debug,chromiumoxide=warn,hyper=info,reqwest=info",
            Self::Debug => "trace",
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// CLI configuration
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Log line format
    pub log_format: LogFormat,
}

impl CliConfig {
    /// Create a new CLI config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity level
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set log format
    #[must_use]
    pub const fn with_log_format(mut self, log_format: LogFormat) -> Self {
        self.log_format = log_format;
        self
    }
}

/// Load the run configuration
///
/// An explicit path must exist. Without one, `restocker.yaml` in the working
/// directory is used when present, otherwise the built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> CliResult<RestockConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(CliError::config(format!("config file not found: {}", path.display())));
        }
        return Ok(RestockConfig::from_yaml_file(path)?);
    }
    let fallback = Path::new(DEFAULT_CONFIG_FILE);
    if fallback.is_file() {
        tracing::debug!(path = DEFAULT_CONFIG_FILE, "using config from working directory");
        return Ok(RestockConfig::from_yaml_file(fallback)?);
    }
    Ok(RestockConfig::default())
}
