//! Before/after migration matrices.
//!
//! Decoupled from the segmenter on purpose: the builder consumes plain
//! `customer id → category` maps, whether they came from a live population
//! scan or from a pre-aggregated snapshot table.

use crate::{
    rules::{CHURN, ENTERED_BASE},
    types::CustomerId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One customer's movement between the two snapshots.
/// Customers missing on one side get the synthetic ENTERED BASE / CHURN
/// labels, so both fields always hold a category name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransitionRecord {
    pub customer_id: CustomerId,
    pub category_before: String,
    pub category_after: String,
}

/// Full outer join of the two snapshots on customer id.
pub fn transitions(
    before: &BTreeMap<CustomerId, String>,
    after: &BTreeMap<CustomerId, String>,
) -> Vec<TransitionRecord> {
    let universe: BTreeSet<&CustomerId> = before.keys().chain(after.keys()).collect();

    universe
        .into_iter()
        .map(|id| TransitionRecord {
            customer_id: id.clone(),
            category_before: before.get(id).cloned().unwrap_or_else(|| ENTERED_BASE.to_string()),
            category_after: after.get(id).cloned().unwrap_or_else(|| CHURN.to_string()),
        })
        .collect()
}

/// The cross-tabulated migration matrix: rows are before-categories,
/// columns are after-categories, cells are customer counts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MigrationMatrix {
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    /// counts[r][c], indexed by row_labels × col_labels.
    pub counts: Vec<Vec<u64>>,
    pub row_totals: Vec<u64>,
    pub col_totals: Vec<u64>,
    pub grand_total: u64,
}

impl MigrationMatrix {
    pub fn cell(&self, before: &str, after: &str) -> u64 {
        let (Some(r), Some(c)) = (
            self.row_labels.iter().position(|l| l == before),
            self.col_labels.iter().position(|l| l == after),
        ) else {
            return 0;
        };
        self.counts[r][c]
    }

    /// Row-normalized view: each nonzero row sums to 100.0, zero rows stay
    /// all-zero instead of producing NaN.
    pub fn percentages(&self) -> Vec<Vec<f64>> {
        self.counts
            .iter()
            .zip(&self.row_totals)
            .map(|(row, &total)| {
                row.iter()
                    .map(|&n| {
                        if total == 0 {
                            0.0
                        } else {
                            n as f64 / total as f64 * 100.0
                        }
                    })
                    .collect()
            })
            .collect()
    }

    /// Plain-text table of absolute counts with the Total row and column.
    pub fn render_counts(&self) -> String {
        self.render(|r, c| format!("{}", self.counts[r][c]), true)
    }

    /// Plain-text table of the percentage view (one decimal place).
    pub fn render_percentages(&self) -> String {
        let pct = self.percentages();
        self.render(|r, c| format!("{:.1}", pct[r][c]), false)
    }

    fn render<F: Fn(usize, usize) -> String>(&self, cell: F, with_totals: bool) -> String {
        let label_width = self
            .row_labels
            .iter()
            .map(|l| l.len())
            .chain(std::iter::once("Total".len()))
            .max()
            .unwrap_or(5);
        let col_width = self
            .col_labels
            .iter()
            .map(|l| l.len().max(8))
            .max()
            .unwrap_or(8);

        let mut out = String::new();
        out.push_str(&format!("{:label_width$}", ""));
        for label in &self.col_labels {
            out.push_str(&format!("  {label:>col_width$}"));
        }
        if with_totals {
            out.push_str(&format!("  {:>col_width$}", "Total"));
        }
        out.push('\n');

        for (r, label) in self.row_labels.iter().enumerate() {
            out.push_str(&format!("{label:label_width$}"));
            for c in 0..self.col_labels.len() {
                out.push_str(&format!("  {:>col_width$}", cell(r, c)));
            }
            if with_totals {
                out.push_str(&format!("  {:>col_width$}", self.row_totals[r]));
            }
            out.push('\n');
        }

        if with_totals {
            out.push_str(&format!("{:label_width$}", "Total"));
            for total in &self.col_totals {
                out.push_str(&format!("  {total:>col_width$}"));
            }
            out.push_str(&format!("  {:>col_width$}\n", self.grand_total));
        }
        out
    }
}

/// Cross-tabulate two snapshots into a migration matrix.
///
/// Rows and columns are laid out preferred-order first (only categories
/// actually present), then any remaining categories alphabetically. The
/// layout stays stable run to run even as ad-hoc categories appear.
pub fn build_migration_matrix(
    before: &BTreeMap<CustomerId, String>,
    after: &BTreeMap<CustomerId, String>,
    row_order: &[String],
    col_order: &[String],
) -> MigrationMatrix {
    let records = transitions(before, after);

    let present_rows: BTreeSet<&str> = records.iter().map(|t| t.category_before.as_str()).collect();
    let present_cols: BTreeSet<&str> = records.iter().map(|t| t.category_after.as_str()).collect();

    let row_labels = order_categories(&present_rows, row_order);
    let col_labels = order_categories(&present_cols, col_order);

    let row_index: BTreeMap<&str, usize> =
        row_labels.iter().enumerate().map(|(i, l)| (l.as_str(), i)).collect();
    let col_index: BTreeMap<&str, usize> =
        col_labels.iter().enumerate().map(|(i, l)| (l.as_str(), i)).collect();

    let mut counts = vec![vec![0u64; col_labels.len()]; row_labels.len()];
    for t in &records {
        let r = row_index[t.category_before.as_str()];
        let c = col_index[t.category_after.as_str()];
        counts[r][c] += 1;
    }

    let row_totals: Vec<u64> = counts.iter().map(|row| row.iter().sum()).collect();
    let col_totals: Vec<u64> = (0..col_labels.len())
        .map(|c| counts.iter().map(|row| row[c]).sum())
        .collect();
    let grand_total = row_totals.iter().sum();

    MigrationMatrix {
        row_labels,
        col_labels,
        counts,
        row_totals,
        col_totals,
        grand_total,
    }
}

/// Preferred categories first (those present), then leftovers sorted
/// alphabetically. BTreeSet iteration supplies the alphabetical order.
fn order_categories(present: &BTreeSet<&str>, preferred: &[String]) -> Vec<String> {
    let mut ordered: Vec<String> = preferred
        .iter()
        .filter(|p| present.contains(p.as_str()))
        .cloned()
        .collect();

    for &cat in present {
        if !preferred.iter().any(|p| p == cat) {
            ordered.push(cat.to_string());
        }
    }
    ordered
}
