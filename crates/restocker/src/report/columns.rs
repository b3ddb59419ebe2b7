//! Header detection and column normalization.

use super::table::{Cell, RawTable};
use std::collections::HashMap;
use std::fmt;

/// Labels a header row must carry (case-insensitive)
pub const HEADER_LABELS: [&str; 6] = ["SKU", "Description", "Category", "Group", "UOM", "Sold QTY"];

/// Columns of the output document, in order
pub const OUTPUT_COLUMNS: [&str; 5] = ["SKU", "Description", "Category", "UOM", "Sold QTY"];

/// How many leading rows are searched for the header
pub const HEADER_SCAN_ROWS: usize = 40;

/// Alternate spellings mapped onto canonical labels, applied in order
pub const COLUMN_ALIASES: [(&str, &str); 3] =
    [("Sold Qty", "Sold QTY"), ("Qty Sold", "Sold QTY"), ("Unit", "UOM")];

/// First row within the scan window whose cells cover every header label
#[must_use]
pub fn detect_header_row(table: &RawTable) -> Option<usize> {
    (0..table.len().min(HEADER_SCAN_ROWS)).find(|&i| {
        let texts: Vec<String> = table.row(i).iter().map(|c| c.as_text().to_lowercase()).collect();
        HEADER_LABELS
            .iter()
            .all(|label| texts.iter().any(|t| *t == label.to_lowercase()))
    })
}

/// Column positions of the five output columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductColumns {
    /// SKU column
    pub sku: usize,
    /// Description column
    pub description: usize,
    /// Category column
    pub category: usize,
    /// UOM column
    pub uom: usize,
    /// Sold QTY column
    pub sold_qty: usize,
}

/// Required columns absent after normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingColumns {
    /// Canonical labels that were not found
    pub missing: Vec<String>,
    /// Labels present in the header row
    pub found: Vec<String>,
}

impl fmt::Display for MissingColumns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "missing expected columns {:?}, found {:?}",
            self.missing, self.found
        )
    }
}

/// Header labels to column positions
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    labels: Vec<String>,
    positions: HashMap<String, usize>,
}

impl ColumnMap {
    /// Map a header row: trimmed labels, first occurrence wins, aliases
    /// applied where the canonical label is absent
    #[must_use]
    pub fn from_header(cells: &[Cell]) -> Self {
        let labels: Vec<String> = cells.iter().map(Cell::as_text).collect();
        let mut positions = HashMap::new();
        for (index, label) in labels.iter().enumerate() {
            positions.entry(label.clone()).or_insert(index);
        }
        for (alias, canonical) in COLUMN_ALIASES {
            if positions.contains_key(canonical) {
                continue;
            }
            if let Some(index) = positions.remove(alias) {
                positions.insert(canonical.to_string(), index);
            }
        }
        Self { labels, positions }
    }

    /// Position of a label
    #[must_use]
    pub fn get(&self, label: &str) -> Option<usize> {
        self.positions.get(label).copied()
    }

    /// Positions of the output columns, or what is missing
    pub fn resolve(&self) -> Result<ProductColumns, MissingColumns> {
        let missing: Vec<String> = OUTPUT_COLUMNS
            .iter()
            .filter(|label| self.get(label).is_none())
            .map(|label| (*label).to_string())
            .collect();
        match (
            self.get("SKU"),
            self.get("Description"),
            self.get("Category"),
            self.get("UOM"),
            self.get("Sold QTY"),
        ) {
            (Some(sku), Some(description), Some(category), Some(uom), Some(sold_qty)) => Ok(ProductColumns {
                sku,
                description,
                category,
                uom,
                sold_qty,
            }),
            _ => Err(MissingColumns {
                missing,
                found: self.labels.iter().filter(|l| !l.is_empty()).cloned().collect(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn header(labels: &[&str]) -> Vec<Cell> {
        labels.iter().map(|l| Cell::text(*l)).collect()
    }

    fn full_header() -> Vec<Cell> {
        header(&["SKU", "Description", "Category", "Group", "UOM", "Sold QTY"])
    }

    mod detect_tests {
        use super::*;

        #[test]
        fn test_header_any_order_any_case() {
            let table = RawTable::from_rows(vec![
                header(&["Sales By Product"]),
                header(&["sold qty", " uom ", "GROUP", "category", "Description", "sku"]),
            ]);
            assert_eq!(detect_header_row(&table), Some(1));
        }

        #[test]
        fn test_group_label_is_required() {
            let table = RawTable::from_rows(vec![header(&OUTPUT_COLUMNS)]);
            assert_eq!(detect_header_row(&table), None);
        }

        #[test]
        fn test_header_beyond_window_not_found() {
            let mut rows = vec![Vec::new(); HEADER_SCAN_ROWS];
            rows.push(full_header());
            assert_eq!(detect_header_row(&RawTable::from_rows(rows)), None);
        }

        proptest! {
            #[test]
            fn prop_header_found_at_any_row_in_window(h in 0usize..HEADER_SCAN_ROWS, noise in "[a-z ]{0,12}") {
                let mut rows: Vec<Vec<Cell>> = (0..h).map(|_| vec![Cell::text(noise.clone())]).collect();
                rows.push(full_header());
                rows.push(header(&["1", "x", "Wine", "g", "EA", "3"]));
                prop_assert_eq!(detect_header_row(&RawTable::from_rows(rows)), Some(h));
            }
        }
    }

    mod map_tests {
        use super::*;

        #[test]
        fn test_aliases_applied() {
            let map = ColumnMap::from_header(&header(&["SKU", "Description", "Category", "Unit", "Qty Sold"]));
            let cols = map.resolve().unwrap();
            assert_eq!(cols.uom, 3);
            assert_eq!(cols.sold_qty, 4);
        }

        #[test]
        fn test_alias_never_overwrites_canonical() {
            let map = ColumnMap::from_header(&header(&["Sold Qty", "Sold QTY"]));
            assert_eq!(map.get("Sold QTY"), Some(1));
            assert_eq!(map.get("Sold Qty"), Some(0));
        }

        #[test]
        fn test_alias_rules_apply_in_order() {
            let map = ColumnMap::from_header(&header(&["Qty Sold", "Sold Qty"]));
            assert_eq!(map.get("Sold QTY"), Some(1));
        }

        #[test]
        fn test_duplicate_label_first_wins() {
            let map = ColumnMap::from_header(&header(&["SKU", "SKU "]));
            assert_eq!(map.get("SKU"), Some(0));
        }

        #[test]
        fn test_missing_columns_reported() {
            let map = ColumnMap::from_header(&header(&["SKU", "Description", "Category", "Group"]));
            let err = map.resolve().unwrap_err();
            assert_eq!(err.missing, vec!["UOM", "Sold QTY"]);
            assert_eq!(err.found, vec!["SKU", "Description", "Category", "Group"]);
            assert!(err.to_string().contains("UOM"));
        }
    }
}
