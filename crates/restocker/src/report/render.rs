//! Output document model and xlsx writer.
//!
//! The document is built as a list of styled lines first so its layout can be
//! checked without touching a file, then written in one pass with
//! rust_xlsxwriter.

use super::columns::OUTPUT_COLUMNS;
use super::group::CategoryGroup;
use super::ReportContext;
use crate::result::{RestockError, RestockResult};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use std::path::Path;

/// Worksheet name of the output document
pub const SHEET_NAME: &str = "Sales By Product";

/// Base width per output column before content sizing
const BASE_WIDTHS: [usize; 5] = [8, 28, 12, 8, 10];
const MAX_WIDTH: usize = 48;
const SKU_COLUMN_WIDTH: f64 = 13.57;

/// Line styles of the output document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Bold size-12 title lines
    Title,
    /// Size-10 date lines
    Subtitle,
    /// Empty line
    Blank,
    /// Bold category heading
    Category,
    /// Column header row
    ColumnHeader,
    /// Product row
    Data,
    /// Group total row
    Total,
}

/// One cell of the output document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Text
    Text(String),
    /// Integer
    Number(i64),
}

impl Value {
    fn width(&self) -> usize {
        match self {
            Self::Text(s) => s.chars().count(),
            Self::Number(n) => n.to_string().len(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// A styled row of the output document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Style
    pub kind: LineKind,
    /// Cells from column A
    pub values: Vec<Value>,
}

impl Line {
    fn new(kind: LineKind, values: Vec<Value>) -> Self {
        Self { kind, values }
    }

    /// Text of the first cell
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        match self.values.first() {
            Some(Value::Text(s)) => Some(s),
            _ => None,
        }
    }
}

/// The restocking report, ready to write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDocument {
    lines: Vec<Line>,
}

impl OutputDocument {
    /// Title block followed by one section per category group
    #[must_use]
    pub fn grouped(groups: &[CategoryGroup], ctx: &ReportContext) -> Self {
        let mut lines = vec![
            Line::new(LineKind::Title, vec!["Sales By Product".into()]),
            Line::new(LineKind::Title, vec![ctx.store_name.clone().into()]),
            Line::new(
                LineKind::Subtitle,
                vec![ctx.dates.reporting_date().format("%m/%d/%y").to_string().into()],
            ),
            Line::new(
                LineKind::Subtitle,
                vec![format!("Created: {}", ctx.dates.executed_at().format("%m/%d/%Y %I:%M %p")).into()],
            ),
            Line::new(LineKind::Blank, Vec::new()),
        ];

        for group in groups {
            lines.push(Line::new(LineKind::Category, vec![group.category.clone().into()]));
            lines.push(column_header());
            for row in &group.rows {
                lines.push(Line::new(
                    LineKind::Data,
                    vec![
                        row.sku.clone().into(),
                        row.description.clone().into(),
                        row.category.clone().into(),
                        row.uom.clone().into(),
                        Value::Number(row.sold_qty),
                    ],
                ));
            }
            lines.push(Line::new(
                LineKind::Total,
                vec![
                    format!("Total {}", group.category).into(),
                    "".into(),
                    "".into(),
                    "".into(),
                    Value::Number(group.total()),
                ],
            ));
            lines.push(Line::new(LineKind::Blank, Vec::new()));
        }

        Self { lines }
    }

    /// Document holding only the column header row
    #[must_use]
    pub fn header_only() -> Self {
        Self {
            lines: vec![column_header()],
        }
    }

    /// Lines in order
    #[must_use]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Column widths: content-sized within bounds, column A fixed
    #[must_use]
    pub fn column_widths(&self) -> [f64; 5] {
        let mut widths = [0.0; 5];
        for (col, width) in widths.iter_mut().enumerate() {
            let longest = self
                .lines
                .iter()
                .filter_map(|line| line.values.get(col))
                .map(Value::width)
                .max()
                .unwrap_or(0);
            *width = (BASE_WIDTHS[col].max(longest) + 2).min(MAX_WIDTH) as f64;
        }
        widths[0] = SKU_COLUMN_WIDTH;
        widths
    }

    /// Write the document as an xlsx workbook
    pub fn save(&self, path: &Path) -> RestockResult<()> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME).map_err(render_err)?;

        let formats = Formats::new();
        for (row, line) in self.lines.iter().enumerate() {
            write_line(sheet, row as u32, line, &formats).map_err(render_err)?;
        }
        for (col, width) in self.column_widths().into_iter().enumerate() {
            sheet.set_column_width(col as u16, width).map_err(render_err)?;
        }

        workbook.save(path).map_err(render_err)
    }
}

fn column_header() -> Line {
    Line::new(
        LineKind::ColumnHeader,
        OUTPUT_COLUMNS.iter().map(|label| Value::from(*label)).collect(),
    )
}

fn render_err(e: XlsxError) -> RestockError {
    RestockError::Render { message: e.to_string() }
}

struct Formats {
    title: Format,
    subtitle: Format,
    category: Format,
    header: Format,
    cell: Format,
    cell_right: Format,
    total_label: Format,
    total_value: Format,
}

impl Formats {
    fn new() -> Self {
        let bordered = Format::new()
            .set_border(FormatBorder::Thin)
            .set_border_color(0xDDDDDD);

        Self {
            title: Format::new().set_bold().set_font_size(12),
            subtitle: Format::new().set_font_size(10),
            category: Format::new().set_bold(),
            header: bordered
                .clone()
                .set_bold()
                .set_align(FormatAlign::Center)
                .set_background_color(0xF2F2F2),
            cell_right: bordered.clone().set_align(FormatAlign::Right),
            total_label: bordered.clone().set_bold(),
            total_value: bordered.clone().set_bold().set_align(FormatAlign::Right),
            cell: bordered,
        }
    }

    /// Format of column `col` on a line of `kind`
    fn for_cell(&self, kind: LineKind, col: usize) -> Option<&Format> {
        match (kind, col) {
            (LineKind::Title, _) => Some(&self.title),
            (LineKind::Subtitle, _) => Some(&self.subtitle),
            (LineKind::Category, _) => Some(&self.category),
            (LineKind::ColumnHeader, _) => Some(&self.header),
            (LineKind::Data, 0 | 4) => Some(&self.cell_right),
            (LineKind::Data, _) => Some(&self.cell),
            (LineKind::Total, 0) => Some(&self.total_label),
            (LineKind::Total, 4) => Some(&self.total_value),
            (LineKind::Total, _) => Some(&self.cell),
            (LineKind::Blank, _) => None,
        }
    }
}

fn write_line(sheet: &mut Worksheet, row: u32, line: &Line, formats: &Formats) -> Result<(), XlsxError> {
    for (col, value) in line.values.iter().enumerate() {
        let format = formats.for_cell(line.kind, col);
        let col = col as u16;
        match (value, format) {
            (Value::Number(n), Some(format)) => {
                sheet.write_number_with_format(row, col, *n as f64, format)?;
            }
            (Value::Number(n), None) => {
                sheet.write_number(row, col, *n as f64)?;
            }
            (Value::Text(s), Some(format)) if s.is_empty() => {
                sheet.write_blank(row, col, format)?;
            }
            (Value::Text(s), Some(format)) => {
                sheet.write_string_with_format(row, col, s, format)?;
            }
            (Value::Text(s), None) => {
                sheet.write_string(row, col, s)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::clock::RunDates;
    use crate::report::rows::ProductRow;
    use chrono::NaiveDate;

    fn ctx() -> ReportContext {
        ReportContext {
            store_name: "Astoria Liquor".to_string(),
            dates: RunDates::at(
                NaiveDate::from_ymd_opt(2024, 6, 3)
                    .unwrap()
                    .and_hms_opt(6, 5, 0)
                    .unwrap(),
            ),
        }
    }

    fn group(category: &str, rows: &[(&str, &str, i64)]) -> CategoryGroup {
        CategoryGroup {
            category: category.to_string(),
            rows: rows
                .iter()
                .map(|(sku, description, qty)| ProductRow {
                    sku: (*sku).to_string(),
                    description: (*description).to_string(),
                    category: category.to_string(),
                    uom: "EA".to_string(),
                    sold_qty: *qty,
                })
                .collect(),
        }
    }

    #[test]
    fn test_title_block() {
        let doc = OutputDocument::grouped(&[], &ctx());
        let texts: Vec<Option<&str>> = doc.lines().iter().map(Line::first_text).collect();
        assert_eq!(
            texts,
            vec![
                Some("Sales By Product"),
                Some("Astoria Liquor"),
                Some("06/02/24"),
                Some("Created: 06/03/2024 06:05 AM"),
                None,
            ]
        );
        assert_eq!(doc.lines()[2].kind, LineKind::Subtitle);
    }

    #[test]
    fn test_group_section_layout() {
        let doc = OutputDocument::grouped(&[group("Wine", &[("1", "Merlot", 3), ("2", "Rose", 4)])], &ctx());
        let kinds: Vec<LineKind> = doc.lines()[5..].iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![
                LineKind::Category,
                LineKind::ColumnHeader,
                LineKind::Data,
                LineKind::Data,
                LineKind::Total,
                LineKind::Blank,
            ]
        );
        let total = &doc.lines()[9];
        assert_eq!(total.first_text(), Some("Total Wine"));
        assert_eq!(total.values[4], Value::Number(7));
        assert_eq!(total.values[1], Value::Text(String::new()));
    }

    #[test]
    fn test_column_widths() {
        let long = "x".repeat(60);
        let doc = OutputDocument::grouped(&[group("Beer", &[("1", &long, 12)])], &ctx());
        let widths = doc.column_widths();
        assert!((widths[0] - 13.57).abs() < f64::EPSILON);
        assert!((widths[1] - 48.0).abs() < f64::EPSILON);
        assert!((widths[2] - 14.0).abs() < f64::EPSILON);
        assert!((widths[3] - 10.0).abs() < f64::EPSILON);
        assert!((widths[4] - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_header_only_document() {
        let doc = OutputDocument::header_only();
        assert_eq!(doc.lines().len(), 1);
        assert_eq!(doc.lines()[0].values.len(), 5);
        assert_eq!(doc.lines()[0].first_text(), Some("SKU"));
    }

    #[test]
    fn test_save_writes_named_sheet() {
        use calamine::{open_workbook_auto, Data, Reader};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Restocking.xlsx");
        OutputDocument::grouped(&[group("Wine", &[("1", "Merlot", 3)])], &ctx())
            .save(&path)
            .unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        assert_eq!(workbook.sheet_names(), vec![SHEET_NAME.to_string()]);
        let range = workbook.worksheet_range(SHEET_NAME).unwrap();
        assert_eq!(range.get_value((0, 0)), Some(&Data::String("Sales By Product".into())));
        assert_eq!(range.get_value((7, 4)), Some(&Data::Float(3.0)));
        assert_eq!(range.get_value((8, 0)), Some(&Data::String("Total Wine".into())));
    }
}
