//! End-to-end run: portal export, transformation, notification.
//!
//! Strictly sequential. A fatal navigation error leaves a screenshot under
//! the errors directory and aborts before anything is sent.

use crate::clock::RunDates;
use crate::config::RestockConfig;
use crate::credentials::CredentialSource;
use crate::driver::PortalDriver;
use crate::notify::{MailTransport, Notification, Notifier};
use crate::portal::PortalSession;
use crate::report::{self, ReportContext, ReportSummary};
use crate::result::RestockResult;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    /// File downloaded from the portal
    pub raw_export: PathBuf,
    /// Generated restocking report
    pub report: PathBuf,
    /// Row counts of the report
    pub summary: ReportSummary,
    /// Notification outcome and delivery
    pub notification: Notification,
}

/// Transform a downloaded export into the dated report under the output dir
pub fn process_export(
    config: &RestockConfig,
    raw_export: &Path,
    dates: &RunDates,
) -> RestockResult<(PathBuf, ReportSummary)> {
    let ctx = ReportContext {
        store_name: config.portal.store_name.clone(),
        dates: *dates,
    };
    report::transform(raw_export, &config.output.report_path(dates), &ctx)
}

/// Drive the portal with `driver`, then build and announce the report
pub async fn run<D, T>(
    config: &RestockConfig,
    driver: D,
    credentials: &dyn CredentialSource,
    notifier: &Notifier<'_, T>,
    dates: &RunDates,
) -> RestockResult<RunReport>
where
    D: PortalDriver,
    T: MailTransport,
{
    info!(
        reporting_date = %dates.reporting_date(),
        executed_at = %dates.executed_at(),
        "starting restocking run"
    );

    let mut session = PortalSession::new(driver, config);
    let fetched = session
        .fetch_report(credentials.credentials().as_ref(), dates)
        .await;
    if let Err(ref e) = fetched {
        error!(error = %e, state = ?session.state(), "portal navigation failed");
        let _ = session.snapshot(&config.output.errors_dir()).await;
    }

    let mut driver = session.into_driver();
    if let Err(e) = driver.close().await {
        warn!(error = %e, "browser did not close cleanly");
    }
    let raw_export = fetched?;

    let (report, summary) = process_export(config, &raw_export, dates)?;
    let notification = notifier.notify(&summary, dates, &report).await;

    info!(
        reporting_date = %dates.reporting_date(),
        rows = summary.rows_total,
        rows_with_qty = summary.rows_with_qty_gt0,
        "finished run"
    );

    Ok(RunReport {
        raw_export,
        report,
        summary,
        notification,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::{MailConfig, OutputConfig, TimingConfig};
    use crate::credentials::StaticCredentials;
    use crate::driver::{Download, MockDriver, MockElement};
    use crate::locator::{AriaRole, Selector};
    use crate::notify::{
        AlertReason, Delivery, DraftStore, OutgoingMessage, Outcome, RunMode, Sent, TransportError,
    };
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rust_xlsxwriter::Workbook;

    #[derive(Debug)]
    struct NullTransport;

    #[async_trait]
    impl MailTransport for NullTransport {
        async fn send(&self, _message: &OutgoingMessage) -> Result<Sent, TransportError> {
            Ok(Sent::default())
        }
    }

    fn dates() -> RunDates {
        RunDates::at(
            NaiveDate::from_ymd_opt(2024, 6, 3)
                .unwrap()
                .and_hms_opt(7, 0, 0)
                .unwrap(),
        )
    }

    fn config(out: &Path) -> RestockConfig {
        RestockConfig {
            timing: TimingConfig::instant(),
            output: OutputConfig {
                dir: out.to_path_buf(),
            },
            mail: MailConfig {
                team_to: vec!["team@store.test".into()],
                alert_to: vec!["me@store.test".into()],
                ..MailConfig::default()
            },
            ..RestockConfig::default()
        }
    }

    fn staged_export(dir: &Path, qty: f64) -> PathBuf {
        let path = dir.join("staged.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, label) in ["SKU", "Description", "Category", "Group", "UOM", "Sold QTY"]
            .iter()
            .enumerate()
        {
            sheet.write_string(0, col as u16, *label).unwrap();
        }
        sheet.write_string(1, 0, "1001").unwrap();
        sheet.write_string(1, 1, "Merlot").unwrap();
        sheet.write_string(1, 2, "Wine").unwrap();
        sheet.write_string(1, 4, "EA").unwrap();
        sheet.write_number(1, 5, qty).unwrap();
        workbook.save(&path).unwrap();
        path
    }

    fn exporting_driver(staged: PathBuf) -> MockDriver {
        MockDriver::new()
            .with_element(&Selector::role(AriaRole::Button, "Export to Excel"), MockElement::visible())
            .with_download(Download {
                suggested_filename: String::new(),
                path: staged,
            })
    }

    #[tokio::test]
    async fn test_full_run_normal_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let staged = staged_export(dir.path(), 4.0);
        let notifier = Notifier::new(NullTransport, &config.mail, DraftStore::new(dir.path()), RunMode::DryRun);

        let report = run(
            &config,
            exporting_driver(staged),
            &StaticCredentials::none(),
            &notifier,
            &dates(),
        )
        .await
        .unwrap();

        assert_eq!(report.raw_export, dir.path().join("SalesByProduct_2024-06-02.xlsx"));
        assert_eq!(report.report, dir.path().join("Restocking_2024-06-03.xlsx"));
        assert!(report.report.exists());
        assert_eq!(report.summary, ReportSummary::new(1, 1));
        assert_eq!(report.notification.outcome, Outcome::Normal);
        assert_eq!(report.notification.delivery, Delivery::Suppressed);
    }

    #[tokio::test]
    async fn test_zero_quantity_run_alerts() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let staged = staged_export(dir.path(), 0.0);
        let notifier = Notifier::new(NullTransport, &config.mail, DraftStore::new(dir.path()), RunMode::Live);

        let report = run(
            &config,
            exporting_driver(staged),
            &StaticCredentials::none(),
            &notifier,
            &dates(),
        )
        .await
        .unwrap();
        assert_eq!(
            report.notification.outcome,
            Outcome::Alert(AlertReason::AllZeroQuantity)
        );
        assert_eq!(report.notification.delivery, Delivery::Sent(Sent::default()));
    }

    #[tokio::test]
    async fn test_download_timeout_aborts_with_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let driver = MockDriver::new()
            .with_element(&Selector::role(AriaRole::Button, "Export to Excel"), MockElement::visible())
            .with_screenshot(vec![1, 2, 3]);
        let notifier = Notifier::new(NullTransport, &config.mail, DraftStore::new(dir.path()), RunMode::DryRun);

        let err = run(&config, driver, &StaticCredentials::none(), &notifier, &dates())
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        let shots = std::fs::read_dir(config.output.errors_dir()).unwrap().count();
        assert_eq!(shots, 1);
        assert!(!config.output.report_path(&dates()).exists());
    }
}
