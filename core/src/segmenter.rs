//! Population segmentation — one category per customer per analysis date.
//!
//! RULES:
//!   - The customer universe is the WHOLE transaction table. A customer who
//!     never bought the focus product is a legitimate zero-score/CHURN row,
//!     not an omission. Focus membership filters per customer; it never
//!     seeds the scan.
//!   - Rows are grouped by customer once up front; the per-customer loop
//!     never re-scans the full table.
//!   - The NEW CUSTOMER tenure override runs after category assignment and
//!     considers first purchase across ALL product tags.

use crate::{
    error::{RfvError, RfvResult},
    rules::{assign_category, ModelRules, RuleSet, NEW_CUSTOMER, NEW_CUSTOMER_TENURE_DAYS},
    scorer::{score_customer, RfvScore},
    transaction::{Focus, TransactionTable},
    types::{CustomerId, Model},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One customer's segmentation outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerSegment {
    pub customer_id: CustomerId,
    pub category: String,
    pub total_score: u8,
    /// Full R/F/V breakdown for directly ruled focuses.
    /// None for the General composite, whose total is an average.
    pub detail: Option<RfvScore>,
}

/// The segmenter's output: one row per customer in the input table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PopulationSegments {
    pub analysis_date: NaiveDate,
    pub model: Model,
    pub focus: Focus,
    pub rows: BTreeMap<CustomerId, CustomerSegment>,
}

impl PopulationSegments {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, customer_id: &str) -> Option<&CustomerSegment> {
        self.rows.get(customer_id)
    }

    /// The decoupled shape the migration matrix builder consumes.
    pub fn categories(&self) -> BTreeMap<CustomerId, String> {
        self.rows
            .iter()
            .map(|(id, seg)| (id.clone(), seg.category.clone()))
            .collect()
    }
}

/// Segment the full customer population for one analysis date.
pub fn segment_population(
    table: &TransactionTable,
    analysis_date: NaiveDate,
    model: Model,
    focus: Focus,
    rules: &RuleSet,
) -> RfvResult<PopulationSegments> {
    let model_rules = rules.model(model);

    log::info!(
        "segmenting {} customers: model={model} focus={focus} as_of={analysis_date}",
        table.customer_count(),
    );

    let rows = match focus {
        Focus::General => segment_general(table, analysis_date, model_rules)?,
        _ => segment_direct(table, analysis_date, focus, model_rules)?,
    };

    log::info!("segmentation complete: {} rows for focus={focus}", rows.len());

    Ok(PopulationSegments { analysis_date, model, focus, rows })
}

fn segment_direct(
    table: &TransactionTable,
    analysis_date: NaiveDate,
    focus: Focus,
    model_rules: &ModelRules,
) -> RfvResult<BTreeMap<CustomerId, CustomerSegment>> {
    let focus_rules = model_rules.focus_rules(focus)?;
    let tags = focus.tags();

    let mut rows = BTreeMap::new();
    for (i, customer_id) in table.customer_ids().enumerate() {
        let focus_txns: Vec<_> = table.rows_for_tags(customer_id, tags).collect();

        // No focus purchases at all: zero result without invoking the scorer.
        let score = if focus_txns.is_empty() {
            RfvScore::zero()
        } else {
            score_customer(focus_txns, analysis_date, focus_rules)
        };

        let category = categorize(table, customer_id, analysis_date, score.total_score, model_rules);
        rows.insert(
            customer_id.clone(),
            CustomerSegment {
                customer_id: customer_id.clone(),
                category,
                total_score: score.total_score,
                detail: Some(score),
            },
        );

        if i % 500 == 0 {
            log::debug!("segmenter: {i}/{} customers scored", table.customer_count());
        }
    }
    Ok(rows)
}

/// The General composite: average the component-focus total scores.
///
/// A component with no data for one customer contributes 0 to that
/// customer's average. A component with no data anywhere in the population
/// is a structurally broken extract and fails the whole request — silently
/// averaging fewer components would understate every score.
fn segment_general(
    table: &TransactionTable,
    analysis_date: NaiveDate,
    model_rules: &ModelRules,
) -> RfvResult<BTreeMap<CustomerId, CustomerSegment>> {
    let components = model_rules.component_focuses();

    for component in &components {
        if !table.any_row_with_tags(component.tags()) {
            return Err(RfvError::EmptyFocusComponent {
                focus: component.name().to_string(),
            });
        }
    }

    let mut rows = BTreeMap::new();
    for (i, customer_id) in table.customer_ids().enumerate() {
        let mut score_sum: u32 = 0;
        for component in &components {
            let focus_rules = model_rules.focus_rules(*component)?;
            let focus_txns: Vec<_> = table.rows_for_tags(customer_id, component.tags()).collect();
            if focus_txns.is_empty() {
                continue; // contributes 0 to the sum
            }
            score_sum += score_customer(focus_txns, analysis_date, focus_rules).total_score as u32;
        }

        let averaged = (score_sum as f64 / components.len() as f64).round() as u8;
        let category = categorize(table, customer_id, analysis_date, averaged, model_rules);

        rows.insert(
            customer_id.clone(),
            CustomerSegment {
                customer_id: customer_id.clone(),
                category,
                total_score: averaged,
                detail: None,
            },
        );

        if i % 500 == 0 {
            log::debug!("segmenter: {i}/{} customers scored", table.customer_count());
        }
    }
    Ok(rows)
}

/// Category assignment plus the tenure override. The override looks at the
/// first-ever purchase across all tags and beats any score, even CHURN.
fn categorize(
    table: &TransactionTable,
    customer_id: &str,
    analysis_date: NaiveDate,
    total_score: u8,
    model_rules: &ModelRules,
) -> String {
    let category = assign_category(total_score, model_rules);

    if let Some(first) = table.first_purchase(customer_id) {
        if (analysis_date - first).num_days() <= NEW_CUSTOMER_TENURE_DAYS {
            return NEW_CUSTOMER.to_string();
        }
    }

    category.to_string()
}
