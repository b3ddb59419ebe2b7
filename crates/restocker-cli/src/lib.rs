//! Restocker CLI Library
//!
//! Command-line front end for the restocking report automation: argument
//! parsing, configuration loading, log setup and the HTTP mail relay.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;
pub mod mail;

pub use commands::{
    resolve_credentials, resolve_run_mode, Cli, Commands, ConfigArgs, DeliveryArgs, RunArgs,
    TransformArgs,
};
pub use config::{load_config, CliConfig, LogFormat, Verbosity, DEFAULT_CONFIG_FILE};
pub use error::{CliError, CliResult};
pub use handlers::TransformOutcome;
pub use mail::HttpMailTransport;
