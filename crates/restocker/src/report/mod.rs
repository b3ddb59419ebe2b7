//! Report Transformation Engine.
//!
//! Turns the portal's loosely structured export into the grouped restocking
//! report:
//!
//! 1. find the header row ([`columns::detect_header_row`])
//! 2. normalize column labels ([`columns::ColumnMap`])
//! 3. drop non-product lines and coerce types ([`rows::RowFilter`])
//! 4. group by category ([`group::group_by_category`])
//! 5. render and write ([`render::OutputDocument`])
//!
//! A header without the required columns is a data condition, not an error:
//! the output is a header-only document and the summary is zero.

pub mod columns;
pub mod group;
pub mod render;
pub mod rows;
pub mod table;

pub use columns::{ColumnMap, MissingColumns, ProductColumns};
pub use group::{group_by_category, CategoryGroup, ReportSummary};
pub use render::{Line, LineKind, OutputDocument, Value};
pub use rows::{ProductRow, RowFilter};
pub use table::{Cell, RawTable};

use crate::clock::RunDates;
use crate::result::RestockResult;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What the title block needs to know about the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportContext {
    /// Store display name
    pub store_name: String,
    /// Run dates
    pub dates: RunDates,
}

/// Build the output document and summary from a loaded table
pub fn build_report(table: &RawTable, ctx: &ReportContext) -> RestockResult<(OutputDocument, ReportSummary)> {
    let header_row = columns::detect_header_row(table).unwrap_or_else(|| {
        warn!("header row not found in the first {} rows, using row 0", columns::HEADER_SCAN_ROWS);
        0
    });

    let product_columns = match ColumnMap::from_header(table.row(header_row)).resolve() {
        Ok(product_columns) => product_columns,
        Err(missing) => {
            warn!(missing = ?missing.missing, found = ?missing.found, "missing expected columns");
            return Ok((OutputDocument::header_only(), ReportSummary::default()));
        }
    };

    let rows = RowFilter::new()?.extract(table, header_row, &product_columns);
    let summary = ReportSummary::of(&rows);
    let groups = group_by_category(rows);
    info!(
        header_row,
        rows = summary.rows_total,
        rows_with_qty = summary.rows_with_qty_gt0,
        categories = groups.len(),
        "report rows cleaned"
    );
    Ok((OutputDocument::grouped(&groups, ctx), summary))
}

/// Read the raw export, write the grouped report to `out_path`
pub fn transform(raw_path: &Path, out_path: &Path, ctx: &ReportContext) -> RestockResult<(PathBuf, ReportSummary)> {
    info!(input = %raw_path.display(), "cleaning and rebuilding grouped report");
    let table = RawTable::load(raw_path)?;
    let (document, summary) = build_report(&table, ctx)?;
    drop(table);

    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    document.save(out_path)?;
    info!(output = %out_path.display(), "saved formatted grouped report");
    Ok((out_path.to_path_buf(), summary))
}
