//! Restocker CLI binary

use clap::Parser;
use restocker::{Delivery, Notification, Outcome, RunReport};
use restocker_cli::{
    handlers, load_config, logging, Cli, CliConfig, CliResult, Commands, TransformOutcome,
    Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = build_config(&cli);
    if let Err(e) = logging::init_logging(&config) {
        eprintln!("Warning: {e}");
    }

    match run(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.verbose, cli.quiet))
        .with_log_format(cli.log_format)
}

fn run(cli: Cli, config: CliConfig) -> CliResult<()> {
    let restock_config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run(args) => {
            let report = handlers::execute_run(restock_config, &args)?;
            if !config.verbosity.is_quiet() {
                print_run(&report);
            }
        }
        Commands::Transform(args) => {
            let result = handlers::execute_transform(restock_config, &args)?;
            if !config.verbosity.is_quiet() {
                print_transform(&result);
            }
        }
        Commands::Config(args) => {
            let rendered = handlers::execute_config(&restock_config, &args)?;
            print!("{rendered}");
            if !rendered.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}

fn outcome_label(outcome: Outcome) -> String {
    match outcome {
        Outcome::Normal => "normal".to_string(),
        Outcome::Alert(reason) => format!("alert ({reason})"),
    }
}

fn delivery_label(delivery: &Delivery) -> String {
    match delivery {
        Delivery::Sent(sent) => sent
            .id
            .as_ref()
            .map_or_else(|| "sent".to_string(), |id| format!("sent ({id})")),
        Delivery::Suppressed => "dry run, not sent".to_string(),
        Delivery::Drafted(path) => format!("saved as draft {}", path.display()),
        Delivery::Lost => "not sent and draft failed".to_string(),
    }
}

fn print_notification(notification: &Notification) {
    println!("Subject:  {}", notification.message.subject);
    println!("Delivery: {}", delivery_label(&notification.delivery));
}

fn print_run(report: &RunReport) {
    println!("Export:   {}", report.raw_export.display());
    println!("Report:   {}", report.report.display());
    println!(
        "Rows:     {} ({} with quantity)",
        report.summary.rows_total, report.summary.rows_with_qty_gt0
    );
    println!("Outcome:  {}", outcome_label(report.notification.outcome));
    print_notification(&report.notification);
}

fn print_transform(result: &TransformOutcome) {
    println!("Report:   {}", result.report.display());
    println!(
        "Rows:     {} ({} with quantity)",
        result.summary.rows_total, result.summary.rows_with_qty_gt0
    );
    println!("Outcome:  {}", outcome_label(result.outcome));
    if let Some(notification) = &result.notification {
        print_notification(notification);
    }
}
