//! Grouping by category.

use super::rows::ProductRow;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Products sharing a category, in their original order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryGroup {
    /// Category name
    pub category: String,
    /// Member rows
    pub rows: Vec<ProductRow>,
}

impl CategoryGroup {
    /// Sum of Sold QTY over the group
    #[must_use]
    pub fn total(&self) -> i64 {
        self.rows.iter().map(|r| r.sold_qty).fold(0i64, i64::saturating_add)
    }
}

/// Partition rows by category, categories in first-seen order
#[must_use]
pub fn group_by_category(rows: Vec<ProductRow>) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for row in rows {
        let slot = *index.entry(row.category.clone()).or_insert_with(|| {
            groups.push(CategoryGroup {
                category: row.category.clone(),
                rows: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].rows.push(row);
    }
    groups
}

/// Row counts the notification decision is made on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Product rows after cleaning
    pub rows_total: usize,
    /// Product rows with a positive Sold QTY
    pub rows_with_qty_gt0: usize,
}

impl ReportSummary {
    /// Summary from explicit counts
    #[must_use]
    pub const fn new(rows_total: usize, rows_with_qty_gt0: usize) -> Self {
        Self {
            rows_total,
            rows_with_qty_gt0,
        }
    }

    /// Count the cleaned rows
    #[must_use]
    pub fn of(rows: &[ProductRow]) -> Self {
        Self {
            rows_total: rows.len(),
            rows_with_qty_gt0: rows.iter().filter(|r| r.sold_qty > 0).count(),
        }
    }
}
