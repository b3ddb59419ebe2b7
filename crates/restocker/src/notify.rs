//! Validation and notification decision.
//!
//! [`decide`] classifies a [`ReportSummary`]; [`Notifier`] turns the outcome
//! into an [`OutgoingMessage`] and hands it to a [`MailTransport`]. A failed
//! send is downgraded to a JSON draft on disk so the mail can go out by hand.

use crate::clock::RunDates;
use crate::config::MailConfig;
use crate::report::ReportSummary;
use crate::result::RestockResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

const DRAFT_PREFIX: &str = "[DRAFT] ";

/// Why a report is considered empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlertReason {
    /// Nothing survived cleaning
    NoProductRows,
    /// Rows exist but none sold anything
    AllZeroQuantity,
}

impl AlertReason {
    /// Reason line used in logs and the alert body
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoProductRows => "no product rows found after cleaning",
            Self::AllZeroQuantity => "all products have zero sold quantity",
        }
    }
}

impl fmt::Display for AlertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which notification path a run takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    /// Send the report to the team
    Normal,
    /// Alert the operator instead
    Alert(AlertReason),
}

/// Classify a transformation result
#[must_use]
pub const fn decide(summary: &ReportSummary) -> Outcome {
    if summary.rows_total == 0 {
        Outcome::Alert(AlertReason::NoProductRows)
    } else if summary.rows_with_qty_gt0 == 0 {
        Outcome::Alert(AlertReason::AllZeroQuantity)
    } else {
        Outcome::Normal
    }
}

/// A mail ready for the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Recipients
    pub to: Vec<String>,
    /// Carbon copy
    pub cc: Vec<String>,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub body: String,
    /// Report file, when it exists
    pub attachment: Option<PathBuf>,
}

impl OutgoingMessage {
    /// Message for an outcome
    #[must_use]
    pub fn compose(outcome: Outcome, mail: &MailConfig, dates: &RunDates, report: &Path) -> Self {
        let attachment = report.exists().then(|| report.to_path_buf());
        match outcome {
            Outcome::Normal => Self {
                to: mail.team_to.clone(),
                cc: mail.team_cc.clone(),
                subject: format!("{} Restocking List", dates.execution_date_us()),
                body: format!(
                    "Hi Team,\n\nPlease find attached restocking list for {}, let me know if you have any questions.\n\nThanks,\n{}\n",
                    dates.execution_date_us(),
                    mail.signature
                ),
                attachment,
            },
            Outcome::Alert(reason) => Self {
                to: mail.alert_to.clone(),
                cc: Vec::new(),
                subject: format!("ALERT: Empty Restocking Report for {}", dates.reporting_date_us()),
                body: format!(
                    "Hi,\n\nThe restocking report for {} appears to be EMPTY.\nReason: {reason}\n\nThe cleaned file is attached for reference.\n\n- restocker\n",
                    dates.reporting_date_us()
                ),
                attachment,
            },
        }
    }

    /// Copy marked as an unsent draft
    #[must_use]
    pub fn as_draft(&self) -> Self {
        Self {
            subject: format!("{DRAFT_PREFIX}{}", self.subject),
            body: format!("{}\n\n(Saved as draft due to send error.)", self.body.trim_end()),
            ..self.clone()
        }
    }
}

/// Receipt from a transport
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sent {
    /// Transport message id, when the transport reports one
    pub id: Option<String>,
}

/// Mail transport failures
#[derive(Debug, Error)]
pub enum TransportError {
    /// No endpoint or account configured
    #[error("Mail transport not configured: {message}")]
    NotConfigured {
        /// Error message
        message: String,
    },

    /// Attachment could not be read
    #[error("Cannot attach {path}: {message}")]
    Attachment {
        /// Attachment path
        path: String,
        /// Error message
        message: String,
    },

    /// The relay refused the message
    #[error("Mail relay rejected message ({status}): {message}")]
    Rejected {
        /// HTTP status
        status: u16,
        /// Response body
        message: String,
    },

    /// Network failure
    #[error("Mail relay unreachable: {message}")]
    Network {
        /// Error message
        message: String,
    },
}

/// Something that can deliver an [`OutgoingMessage`]
///
/// The sending account is chosen by the implementation.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver the message
    async fn send(&self, message: &OutgoingMessage) -> Result<Sent, TransportError>;
}

/// Saves unsent messages as JSON files
#[derive(Debug, Clone)]
pub struct DraftStore {
    dir: PathBuf,
}

impl DraftStore {
    /// Store rooted at `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write a draft and return its path
    pub fn save(&self, message: &OutgoingMessage) -> RestockResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S%3f");
        let path = self.dir.join(format!("{stamp}.json"));
        std::fs::write(&path, serde_json::to_vec_pretty(message)?)?;
        Ok(path)
    }
}

/// Whether messages are actually dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Send through the transport
    Live,
    /// Compute and log the outcome, send nothing
    DryRun,
}

/// What happened to the message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Transport accepted it
    Sent(Sent),
    /// Dry run, not sent
    Suppressed,
    /// Send failed, saved as a draft
    Drafted(PathBuf),
    /// Send and draft both failed
    Lost,
}

/// Result of one notification
#[derive(Debug, Clone)]
pub struct Notification {
    /// Chosen path
    pub outcome: Outcome,
    /// Message that was (or would have been) sent
    pub message: OutgoingMessage,
    /// Delivery result
    pub delivery: Delivery,
}

/// Decides and dispatches the run's notification
#[derive(Debug)]
pub struct Notifier<'a, T: MailTransport> {
    transport: T,
    mail: &'a MailConfig,
    drafts: DraftStore,
    mode: RunMode,
}

impl<'a, T: MailTransport> Notifier<'a, T> {
    /// Notifier over a transport
    pub fn new(transport: T, mail: &'a MailConfig, drafts: DraftStore, mode: RunMode) -> Self {
        Self {
            transport,
            mail,
            drafts,
            mode,
        }
    }

    /// Transport in use
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Classify the summary and deliver the matching message
    pub async fn notify(&self, summary: &ReportSummary, dates: &RunDates, report: &Path) -> Notification {
        let outcome = decide(summary);
        let message = OutgoingMessage::compose(outcome, self.mail, dates, report);
        match outcome {
            Outcome::Normal => info!(
                rows = summary.rows_total,
                rows_with_qty = summary.rows_with_qty_gt0,
                "report has data, notifying team"
            ),
            Outcome::Alert(reason) => warn!(%reason, "empty report, sending alert"),
        }

        let delivery = if self.mode == RunMode::DryRun {
            info!(subject = %message.subject, to = ?message.to, "dry run, not sending");
            Delivery::Suppressed
        } else {
            self.dispatch(&message).await
        };

        Notification {
            outcome,
            message,
            delivery,
        }
    }

    async fn dispatch(&self, message: &OutgoingMessage) -> Delivery {
        match self.transport.send(message).await {
            Ok(sent) => {
                info!(subject = %message.subject, "email sent");
                Delivery::Sent(sent)
            }
            Err(e) => {
                warn!(error = %e, "send failed, saving draft");
                match self.drafts.save(&message.as_draft()) {
                    Ok(path) => {
                        info!(path = %path.display(), "saved draft");
                        Delivery::Drafted(path)
                    }
                    Err(e) => {
                        error!(error = %e, "could not save draft");
                        Delivery::Lost
                    }
                }
            }
        }
    }
}
