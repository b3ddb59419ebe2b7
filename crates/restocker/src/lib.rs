//! Restocker: daily restocking report automation
//!
//! Pulls yesterday's "Sales By Product" export from the store portal, turns
//! it into a grouped and styled restocking workbook, and decides whether the
//! team gets the report or the operator gets an alert.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    RESTOCKER Architecture                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Portal     │    │ Report     │    │ Notify     │            │
//! │   │ Session    │───►│ Transform  │───►│ Decision   │            │
//! │   │ (resolver) │    │ (xlsx)     │    │ (mail)     │            │
//! │   └─────┬──────┘    └────────────┘    └────────────┘            │
//! │         │                                                        │
//! │   ┌─────▼──────────────────────────┐                             │
//! │   │ PortalDriver                   │                             │
//! │   │ ChromiumDriver │ MockDriver    │                             │
//! │   └────────────────────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

#[cfg(feature = "browser")]
mod browser;
mod clock;
mod config;
mod credentials;
mod driver;
mod locator;
mod portal;
mod resolver;
mod result;

/// Report Transformation Engine
pub mod report;

/// Notification decision and the mail seam
pub mod notify;

/// End-to-end run orchestration
pub mod pipeline;

/// Network-idle heuristics and settle delays
pub mod wait;

#[cfg(feature = "browser")]
pub use browser::ChromiumDriver;
pub use clock::RunDates;
pub use config::{
    BrowserConfig, FilterConfig, MailConfig, OutputConfig, PortalConfig, RestockConfig, TimingConfig,
};
pub use credentials::{CredentialSource, Credentials, StaticCredentials};
pub use driver::{Download, DownloadWatch, MockDriver, MockElement, PortalDriver};
pub use locator::{AriaRole, ElementRef, Selector, TextPattern};
pub use notify::{
    decide, AlertReason, Delivery, DraftStore, MailTransport, Notification, Notifier, Outcome,
    OutgoingMessage, RunMode, Sent, TransportError,
};
pub use pipeline::{process_export, RunReport};
pub use portal::{LoginOutcome, PortalSession, PortalState};
pub use report::{ReportContext, ReportSummary};
pub use resolver::{ElementResolver, LocatorStrategy, Role, StrategyTable};
pub use result::{RestockError, RestockResult};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        decide, ElementResolver, MailTransport, Notifier, PortalDriver, PortalSession, RestockConfig,
        RestockError, RestockResult, ReportSummary, Role, RunDates, RunMode, Selector,
    };
}
