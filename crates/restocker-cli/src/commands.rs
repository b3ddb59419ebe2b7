//! CLI command definitions using clap

use crate::config::LogFormat;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use restocker::{RunMode, StaticCredentials};
use std::path::PathBuf;

/// Restocker: pull the daily sales export and build the restocking report
#[derive(Parser, Debug)]
#[command(name = "restocker")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log line format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Configuration file (YAML)
    #[arg(short, long, env = "RESTOCKER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in, export yesterday's sales, build the report and notify
    Run(RunArgs),

    /// Build the report from an already downloaded export
    Transform(TransformArgs),

    /// Show the effective configuration
    Config(ConfigArgs),
}

/// Output and notification options shared by `run` and `transform`
#[derive(Args, Debug, Clone, Default)]
pub struct DeliveryArgs {
    /// Output directory (overrides output.dir)
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Decide and log the notification but send nothing (env accepts 1/0, yes/no, true/false)
    #[arg(long, env = "DRY_RUN_EMAIL", value_parser = clap::builder::BoolishValueParser::new())]
    pub dry_run: bool,

    /// Bearer token for the mail relay
    #[arg(long, env = "RESTOCKER_MAIL_TOKEN", hide_env_values = true)]
    pub mail_token: Option<String>,

    /// Execution date (YYYY-MM-DD); the report covers the day before
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,
}

impl DeliveryArgs {
    /// Dry run when asked for, or when running under CI
    #[must_use]
    pub fn run_mode(&self) -> RunMode {
        resolve_run_mode(self.dry_run, std::env::var("CI").ok().as_deref())
    }
}

/// Arguments for the run command
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Output and notification options
    #[command(flatten)]
    pub delivery: DeliveryArgs,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Portal user name
    #[arg(long, env = "BARNET_USER")]
    pub username: Option<String>,

    /// Portal password
    #[arg(long, env = "BARNET_PASS", hide_env_values = true)]
    pub password: Option<String>,
}

impl RunArgs {
    /// Credentials from flags or the primary env names, then the alternates
    #[must_use]
    pub fn credentials(&self) -> StaticCredentials {
        resolve_credentials(
            self.username.clone(),
            self.password.clone(),
            std::env::var("BARNET_USERNAME").ok(),
            std::env::var("BARNET_PASSWORD").ok(),
        )
    }
}

/// Arguments for the transform command
#[derive(Args, Debug, Clone)]
pub struct TransformArgs {
    /// Raw "Sales By Product" export (.xlsx)
    pub file: PathBuf,

    /// Also send (or draft) the notification
    #[arg(long)]
    pub notify: bool,

    /// Output and notification options
    #[command(flatten)]
    pub delivery: DeliveryArgs,
}

/// Arguments for the config command
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Also require mail recipients to be set
    #[arg(long)]
    pub check_mail: bool,

    /// Print as JSON instead of YAML
    #[arg(long)]
    pub json: bool,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

/// `CI=true` (any case) forces a dry run
#[must_use]
pub fn resolve_run_mode(dry_run: bool, ci: Option<&str>) -> RunMode {
    let under_ci = ci.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
    if dry_run || under_ci {
        RunMode::DryRun
    } else {
        RunMode::Live
    }
}

/// Prefer the primary value of each part, falling back to the alternate
#[must_use]
pub fn resolve_credentials(
    username: Option<String>,
    password: Option<String>,
    alt_username: Option<String>,
    alt_password: Option<String>,
) -> StaticCredentials {
    let pick = |primary: Option<String>, alternate: Option<String>| {
        primary
            .filter(|v| !v.trim().is_empty())
            .or_else(|| alternate.filter(|v| !v.trim().is_empty()))
    };
    StaticCredentials::new(pick(username, alt_username), pick(password, alt_password))
}
