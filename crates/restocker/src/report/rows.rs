//! Product row extraction: filtering and type coercion.

use super::columns::ProductColumns;
use super::table::{format_float, Cell, RawTable};
use crate::result::RestockResult;
use regex::Regex;
use serde::Serialize;

/// Characters stripped from quantity text before parsing
const QTY_NOISE: [char; 5] = ['$', '€', '£', '¥', ','];

/// A product line of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRow {
    /// Product code
    pub sku: String,
    /// Product description
    pub description: String,
    /// Category (never empty)
    pub category: String,
    /// Unit of measure
    pub uom: String,
    /// Units sold
    pub sold_qty: i64,
}

/// Why a line is not a product
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// Blank SKU or the missing-value marker
    BlankSku,
    /// Subtotal / grand-total line
    Total,
    /// Section heading such as `WINE - RED` with no description
    SectionHeader,
}

/// Decides which lines are products
#[derive(Debug, Clone)]
pub struct RowFilter {
    section_header: Regex,
}

impl RowFilter {
    /// Filter with the portal's section-heading pattern
    pub fn new() -> RestockResult<Self> {
        Ok(Self {
            section_header: Regex::new(r"^[A-Z].* - .*$")?,
        })
    }

    /// Exclusion reason for a line with this SKU and description text
    #[must_use]
    pub fn exclusion(&self, sku: &str, description: &str) -> Option<Exclusion> {
        let sku = sku.trim();
        if sku.is_empty() || sku == "nan" {
            Some(Exclusion::BlankSku)
        } else if sku.starts_with("Total") {
            Some(Exclusion::Total)
        } else if description.trim().is_empty() && self.section_header.is_match(sku) {
            Some(Exclusion::SectionHeader)
        } else {
            None
        }
    }

    /// Product rows below the header, filtered and coerced
    pub fn extract(&self, table: &RawTable, header_row: usize, columns: &ProductColumns) -> Vec<ProductRow> {
        let blank = Cell::Empty;
        table
            .rows_from(header_row + 1)
            .filter_map(|row| {
                let cell = |index: usize| row.get(index).unwrap_or(&blank);
                let sku_cell = cell(columns.sku);
                let description = cell(columns.description).as_text();
                if self.exclusion(&sku_cell.as_text(), &description).is_some() {
                    return None;
                }
                let category = cell(columns.category).as_text();
                if category.is_empty() {
                    return None;
                }
                Some(ProductRow {
                    sku: sku_text(sku_cell),
                    description,
                    category,
                    uom: cell(columns.uom).as_text(),
                    sold_qty: coerce_quantity(cell(columns.sold_qty)),
                })
            })
            .collect()
    }
}

/// SKU as text: whole numbers without a fraction, everything else trimmed
#[must_use]
pub fn sku_text(cell: &Cell) -> String {
    match cell {
        Cell::Float(f) => format_float(*f),
        other => other.as_text(),
    }
}

/// Sold quantity from any cell; unparsable values count as 0
#[must_use]
pub fn coerce_quantity(cell: &Cell) -> i64 {
    match cell {
        Cell::Int(n) => *n,
        Cell::Float(f) => truncate(*f),
        Cell::Bool(b) => i64::from(*b),
        Cell::Text(s) => parse_quantity(s),
        Cell::Empty => 0,
    }
}

/// Parse quantity text such as `"$1,234"` or `" 12.9 "`, truncating toward zero
#[must_use]
pub fn parse_quantity(text: &str) -> i64 {
    let cleaned: String = text.chars().filter(|c| !QTY_NOISE.contains(c)).collect();
    cleaned.trim().parse::<f64>().map_or(0, truncate)
}

fn truncate(value: f64) -> i64 {
    if value.is_finite() {
        value.trunc() as i64
    } else {
        0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const COLUMNS: ProductColumns = ProductColumns {
        sku: 0,
        description: 1,
        category: 2,
        uom: 3,
        sold_qty: 4,
    };

    fn row(cells: &[Cell]) -> Vec<Cell> {
        cells.to_vec()
    }

    mod coercion_tests {
        use super::*;

        #[test]
        fn test_currency_and_separators() {
            assert_eq!(parse_quantity("$1,234"), 1234);
            assert_eq!(parse_quantity(" €12 "), 12);
            assert_eq!(parse_quantity("£3.99"), 3);
            assert_eq!(parse_quantity("¥1,000,000"), 1_000_000);
        }

        #[test]
        fn test_unparsable_is_zero() {
            assert_eq!(parse_quantity("abc"), 0);
            assert_eq!(parse_quantity(""), 0);
            assert_eq!(parse_quantity("inf"), 0);
            assert_eq!(parse_quantity("NaN"), 0);
        }

        #[test]
        fn test_truncates_toward_zero() {
            assert_eq!(parse_quantity("-2.7"), -2);
            assert_eq!(coerce_quantity(&Cell::Float(7.9)), 7);
            assert_eq!(coerce_quantity(&Cell::Float(f64::NAN)), 0);
        }

        #[test]
        fn test_numeric_cells_used_directly() {
            assert_eq!(coerce_quantity(&Cell::Int(42)), 42);
            assert_eq!(coerce_quantity(&Cell::Empty), 0);
        }

        #[test]
        fn test_sku_rendering() {
            assert_eq!(sku_text(&Cell::Float(81_234.0)), "81234");
            assert_eq!(sku_text(&Cell::Float(12.5)), "12.5");
            assert_eq!(sku_text(&Cell::text(" A-77 ")), "A-77");
            assert_eq!(sku_text(&Cell::Int(5)), "5");
        }

        proptest! {
            #[test]
            fn prop_integers_survive(n in -1_000_000i64..1_000_000) {
                prop_assert_eq!(parse_quantity(&n.to_string()), n);
                prop_assert_eq!(coerce_quantity(&Cell::Int(n)), n);
            }

            #[test]
            fn prop_never_panics(s in "\\PC*") {
                let _ = parse_quantity(&s);
            }
        }
    }

    mod filter_tests {
        use super::*;

        #[test]
        fn test_exclusion_rules() {
            let filter = RowFilter::new().unwrap();
            assert_eq!(filter.exclusion("", "x"), Some(Exclusion::BlankSku));
            assert_eq!(filter.exclusion("nan", "x"), Some(Exclusion::BlankSku));
            assert_eq!(filter.exclusion("Total Wine", ""), Some(Exclusion::Total));
            assert_eq!(filter.exclusion("WINE - RED", ""), Some(Exclusion::SectionHeader));
            assert_eq!(filter.exclusion("WINE - RED", "Merlot"), None);
            assert_eq!(filter.exclusion("wine - red", ""), None);
            assert_eq!(filter.exclusion("1001", ""), None);
        }

        #[test]
        fn test_extract_filters_and_coerces() {
            let table = RawTable::from_rows(vec![
                row(&[Cell::text("SKU")]),
                row(&[Cell::text("BEER - DOMESTIC"), Cell::Empty, Cell::Empty]),
                row(&[
                    Cell::Float(1001.0),
                    Cell::text("Lager 6pk"),
                    Cell::text(" Beer "),
                    Cell::text("EA"),
                    Cell::text("$1,234"),
                ]),
                row(&[Cell::text("Total Beer"), Cell::Empty, Cell::Empty, Cell::Empty, Cell::Int(1234)]),
                row(&[Cell::text("1002"), Cell::text("No category"), Cell::text("  "), Cell::Empty, Cell::Int(3)]),
                row(&[Cell::Empty, Cell::text("orphan")]),
                row(&[Cell::Int(1003), Cell::text("Short row"), Cell::text("Wine")]),
            ]);

            let rows = RowFilter::new().unwrap().extract(&table, 0, &COLUMNS);
            assert_eq!(
                rows,
                vec![
                    ProductRow {
                        sku: "1001".into(),
                        description: "Lager 6pk".into(),
                        category: "Beer".into(),
                        uom: "EA".into(),
                        sold_qty: 1234,
                    },
                    ProductRow {
                        sku: "1003".into(),
                        description: "Short row".into(),
                        category: "Wine".into(),
                        uom: String::new(),
                        sold_qty: 0,
                    },
                ]
            );
        }

        #[test]
        fn test_rows_above_header_ignored() {
            let table = RawTable::from_rows(vec![
                row(&[Cell::text("9"), Cell::text("d"), Cell::text("c"), Cell::text("u"), Cell::Int(1)]),
                row(&[Cell::text("SKU")]),
            ]);
            assert!(RowFilter::new().unwrap().extract(&table, 1, &COLUMNS).is_empty());
        }
    }
}
