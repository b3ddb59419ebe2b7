//! Raw tabular content of an exported workbook.

use crate::result::{RestockError, RestockResult};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

/// One cell of the export, as read
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// No value
    Empty,
    /// Text
    Text(String),
    /// Integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Boolean
    Bool(bool),
}

impl Cell {
    /// Text cell
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Trimmed display text; whole floats print without a fraction
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.trim().to_string(),
            Self::Int(n) => n.to_string(),
            Self::Float(f) => format_float(*f),
            Self::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        }
    }

    /// Whether the cell carries nothing but whitespace
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

pub(crate) fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{f}")
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Self::Empty,
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Self::Text(s.clone()),
            Data::Float(f) => Self::Float(*f),
            Data::Int(n) => Self::Int(*n),
            Data::Bool(b) => Self::Bool(*b),
            Data::DateTime(dt) => Self::Float(dt.as_f64()),
        }
    }
}

/// Ordered rows of ordered cells, at their absolute sheet positions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    /// Table from rows (row 0 is the first sheet row)
    #[must_use]
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Read the first worksheet of an xlsx/xls/xlsb/ods file
    pub fn load(path: &Path) -> RestockResult<Self> {
        let read_err = |message: String| RestockError::WorkbookRead {
            path: path.display().to_string(),
            message,
        };

        let mut workbook = open_workbook_auto(path).map_err(|e| read_err(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| read_err("workbook has no worksheets".to_string()))?
            .map_err(|e| read_err(e.to_string()))?;

        // Ranges start at the first used cell; pad back to A1 so row numbers
        // match the sheet.
        let (top, left) = range.start().unwrap_or((0, 0));
        let mut rows: Vec<Vec<Cell>> = (0..top).map(|_| Vec::new()).collect();
        for row in range.rows() {
            let mut cells = vec![Cell::Empty; left as usize];
            cells.extend(row.iter().map(Cell::from));
            rows.push(cells);
        }
        Ok(Self { rows })
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row by index (empty slice past the end)
    #[must_use]
    pub fn row(&self, index: usize) -> &[Cell] {
        self.rows.get(index).map_or(&[], Vec::as_slice)
    }

    /// Rows starting at `index`
    pub fn rows_from(&self, index: usize) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().skip(index).map(Vec::as_slice)
    }
}
