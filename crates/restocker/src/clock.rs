//! Run dates.
//!
//! Every run has two dates: the execution timestamp (used for the output
//! file name, the "Created" line and the team mail) and the reporting date,
//! which is always the day before execution (used for the portal filters and
//! the report's date line).

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};

/// Dates fixed once at the start of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunDates {
    executed_at: NaiveDateTime,
}

impl RunDates {
    /// Dates for a run starting now (local time)
    #[must_use]
    pub fn now() -> Self {
        Self::at(Local::now().naive_local())
    }

    /// Dates for a run at a fixed instant
    #[must_use]
    pub const fn at(executed_at: NaiveDateTime) -> Self {
        Self { executed_at }
    }

    /// Execution timestamp
    #[must_use]
    pub const fn executed_at(&self) -> NaiveDateTime {
        self.executed_at
    }

    /// Execution date
    #[must_use]
    pub fn execution_date(&self) -> NaiveDate {
        self.executed_at.date()
    }

    /// The day the sales data belongs to
    #[must_use]
    pub fn reporting_date(&self) -> NaiveDate {
        self.execution_date() - Duration::days(1)
    }

    /// `MM/DD/YYYY` of the execution date
    #[must_use]
    pub fn execution_date_us(&self) -> String {
        self.execution_date().format("%m/%d/%Y").to_string()
    }

    /// `MM/DD/YYYY` of the reporting date, as typed into the portal filters
    #[must_use]
    pub fn reporting_date_us(&self) -> String {
        self.reporting_date().format("%m/%d/%Y").to_string()
    }
}
