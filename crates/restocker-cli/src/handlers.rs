//! Command handlers.
//!
//! Each handler takes the loaded configuration plus its parsed arguments and
//! returns what happened; printing is left to `main`.

use crate::commands::{ConfigArgs, DeliveryArgs, RunArgs, TransformArgs};
use crate::error::{CliError, CliResult};
use crate::mail::HttpMailTransport;
use chrono::Local;
use restocker::{
    decide, process_export, DraftStore, Notification, Notifier, Outcome, ReportSummary,
    RestockConfig, RunDates, RunMode,
};
use std::path::PathBuf;
use tracing::info;

/// Result of `restocker transform`
#[derive(Debug, Clone)]
pub struct TransformOutcome {
    /// Generated report
    pub report: PathBuf,
    /// Row counts
    pub summary: ReportSummary,
    /// Chosen notification path
    pub outcome: Outcome,
    /// Delivery, when `--notify` was given
    pub notification: Option<Notification>,
}

/// Apply command-line overrides that every command shares
pub fn apply_delivery_overrides(config: &mut RestockConfig, delivery: &DeliveryArgs) {
    if let Some(dir) = &delivery.out_dir {
        config.output.dir.clone_from(dir);
    }
}

/// Run dates for this invocation, honoring `--date`
#[must_use]
pub fn run_dates(delivery: &DeliveryArgs) -> RunDates {
    delivery.date.map_or_else(RunDates::now, |date| {
        RunDates::at(date.and_time(Local::now().time()))
    })
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::config(format!("failed to start async runtime: {e}")))
}

fn notifier<'a>(
    config: &'a RestockConfig,
    delivery: &DeliveryArgs,
) -> CliResult<Notifier<'a, HttpMailTransport>> {
    let mode = delivery.run_mode();
    if mode == RunMode::Live {
        config.mail.validate()?;
    }
    let transport = HttpMailTransport::new(&config.mail, delivery.mail_token.clone())?;
    Ok(Notifier::new(
        transport,
        &config.mail,
        DraftStore::new(config.output.drafts_dir()),
        mode,
    ))
}

/// Transform an existing export, optionally notifying
pub fn execute_transform(mut config: RestockConfig, args: &TransformArgs) -> CliResult<TransformOutcome> {
    if !args.file.is_file() {
        return Err(CliError::invalid_argument(format!(
            "export not found: {}",
            args.file.display()
        )));
    }
    apply_delivery_overrides(&mut config, &args.delivery);
    let dates = run_dates(&args.delivery);

    let (report, summary) = process_export(&config, &args.file, &dates)?;
    let outcome = decide(&summary);
    info!(
        rows = summary.rows_total,
        rows_with_qty = summary.rows_with_qty_gt0,
        outcome = ?outcome,
        "transform finished"
    );

    let notification = if args.notify {
        let notifier = notifier(&config, &args.delivery)?;
        let rt = runtime()?;
        Some(rt.block_on(notifier.notify(&summary, &dates, &report)))
    } else {
        None
    };

    Ok(TransformOutcome {
        report,
        summary,
        outcome,
        notification,
    })
}

/// Drive the portal end to end
#[cfg(feature = "browser")]
pub fn execute_run(mut config: RestockConfig, args: &RunArgs) -> CliResult<restocker::RunReport> {
    use restocker::ChromiumDriver;

    apply_delivery_overrides(&mut config, &args.delivery);
    if args.headed {
        config.browser.headless = false;
    }
    let dates = run_dates(&args.delivery);
    let credentials = args.credentials();
    let notifier = notifier(&config, &args.delivery)?;

    let rt = runtime()?;
    let report = rt.block_on(async {
        let driver = ChromiumDriver::launch(&config.browser, config.timing.clone()).await?;
        restocker::pipeline::run(&config, driver, &credentials, &notifier, &dates).await
    })?;
    Ok(report)
}

/// Drive the portal end to end
#[cfg(not(feature = "browser"))]
pub fn execute_run(_config: RestockConfig, _args: &RunArgs) -> CliResult<restocker::RunReport> {
    Err(CliError::unsupported(
        "restocker was built without the `browser` feature",
    ))
}

/// Render the effective configuration
pub fn execute_config(config: &RestockConfig, args: &ConfigArgs) -> CliResult<String> {
    if args.check_mail {
        config.mail.validate()?;
    }
    if args.json {
        serde_json::to_string_pretty(config).map_err(|e| CliError::config(e.to_string()))
    } else {
        Ok(config.to_yaml()?)
    }
}
