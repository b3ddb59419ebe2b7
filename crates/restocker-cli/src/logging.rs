//! Log subscriber setup.
//!
//! Logs go to stderr so `restocker config` output on stdout stays clean.
//! `RUST_LOG` replaces the verbosity-derived filter entirely.

use crate::config::{CliConfig, LogFormat};
use crate::error::{CliError, CliResult};
use std::io::IsTerminal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Build the filter: `RUST_LOG` when set and valid, else the verbosity default
#[must_use]
pub fn env_filter(config: &CliConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.filter_directive()))
}

/// Install the global subscriber
pub fn init_logging(config: &CliConfig) -> CliResult<()> {
    let filter = env_filter(config);
    let registry = tracing_subscriber::registry();

    let installed = match config.log_format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(true)
                .with_filter(filter);
            registry.with(layer).try_init()
        }
        LogFormat::Text => {
            let layer = fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(config.verbosity.is_verbose())
                .with_ansi(std::io::stderr().is_terminal())
                .with_filter(filter);
            registry.with(layer).try_init()
        }
    };
    installed.map_err(|e| CliError::logging(e.to_string()))
}
