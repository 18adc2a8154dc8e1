//! The transaction table — the one tabular input the engine consumes.
//!
//! The data-access layer (warehouse query, SQLite extract, test fixture)
//! supplies flat rows; this module owns them plus the two indexes every
//! downstream pass needs:
//!   1. rows grouped by customer (built once, never re-filtered per customer)
//!   2. each customer's first-ever purchase date across ALL product tags
//!      (drives the 90-day NEW CUSTOMER override)

use crate::types::{CustomerId, OrderId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Product vocabulary ───────────────────────────────────────────────────────

/// The closed vocabulary of product-type tags carried on transaction rows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProductTag {
    Capsule,
    Filter,
    Co2,
}

impl ProductTag {
    pub fn name(&self) -> &'static str {
        match self {
            ProductTag::Capsule => "capsule",
            ProductTag::Filter => "filter",
            ProductTag::Co2 => "co2",
        }
    }

    pub fn parse(s: &str) -> Option<ProductTag> {
        match s {
            "capsule" => Some(ProductTag::Capsule),
            "filter" => Some(ProductTag::Filter),
            "co2" => Some(ProductTag::Co2),
            _ => None,
        }
    }
}

/// A product focus scopes one RFV computation to a subset of tags.
///
/// `General` is a derived composite over the model's component focuses,
/// never a directly ruled focus.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Focus {
    Capsules,
    Supplies,
    Filter,
    Cylinders,
    General,
}

impl Focus {
    /// The tag set a focus selects from the transaction table.
    /// `General` selects nothing directly; it is expanded by the segmenter.
    pub fn tags(&self) -> &'static [ProductTag] {
        match self {
            Focus::Capsules => &[ProductTag::Capsule],
            Focus::Supplies => &[ProductTag::Filter, ProductTag::Co2],
            Focus::Filter => &[ProductTag::Filter],
            Focus::Cylinders => &[ProductTag::Co2],
            Focus::General => &[],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Focus::Capsules => "capsules",
            Focus::Supplies => "supplies",
            Focus::Filter => "filter",
            Focus::Cylinders => "cylinders",
            Focus::General => "general",
        }
    }

    pub fn parse(s: &str) -> Option<Focus> {
        match s {
            "capsules" => Some(Focus::Capsules),
            "supplies" => Some(Focus::Supplies),
            "filter" => Some(Focus::Filter),
            "cylinders" => Some(Focus::Cylinders),
            "general" => Some(Focus::General),
            _ => None,
        }
    }
}

impl std::fmt::Display for Focus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── Records ──────────────────────────────────────────────────────────────────

/// One immutable, externally supplied purchase row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub customer_id: CustomerId,
    pub purchase_date: NaiveDate,
    pub order_id: OrderId,
    pub product_tag: ProductTag,
    /// Non-negative by contract; upstream data cleaning owns validation.
    pub volume: f64,
}

/// The full transaction table with its per-customer index.
///
/// The customer universe of any population scan is `customer_ids()` —
/// every customer in the table, regardless of focus.
#[derive(Debug, Clone, Default)]
pub struct TransactionTable {
    rows: Vec<Transaction>,
    by_customer: BTreeMap<CustomerId, Vec<usize>>,
    first_purchase: BTreeMap<CustomerId, NaiveDate>,
}

impl TransactionTable {
    pub fn new(rows: Vec<Transaction>) -> Self {
        let mut by_customer: BTreeMap<CustomerId, Vec<usize>> = BTreeMap::new();
        let mut first_purchase: BTreeMap<CustomerId, NaiveDate> = BTreeMap::new();

        for (i, t) in rows.iter().enumerate() {
            by_customer.entry(t.customer_id.clone()).or_default().push(i);
            first_purchase
                .entry(t.customer_id.clone())
                .and_modify(|d| {
                    if t.purchase_date < *d {
                        *d = t.purchase_date;
                    }
                })
                .or_insert(t.purchase_date);
        }

        Self { rows, by_customer, first_purchase }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Every distinct customer in the table, in stable order.
    pub fn customer_ids(&self) -> impl Iterator<Item = &CustomerId> {
        self.by_customer.keys()
    }

    pub fn customer_count(&self) -> usize {
        self.by_customer.len()
    }

    /// All of one customer's rows, any tag.
    pub fn rows_for(&self, customer_id: &str) -> impl Iterator<Item = &Transaction> {
        self.by_customer
            .get(customer_id)
            .into_iter()
            .flatten()
            .map(move |&i| &self.rows[i])
    }

    /// One customer's rows restricted to a tag set.
    pub fn rows_for_tags<'a>(
        &'a self,
        customer_id: &str,
        tags: &'a [ProductTag],
    ) -> impl Iterator<Item = &'a Transaction> {
        self.rows_for(customer_id)
            .filter(move |t| tags.contains(&t.product_tag))
    }

    /// Whether ANY row in the whole table carries one of these tags.
    /// The General composite uses this to detect a structurally missing
    /// component before scoring anyone.
    pub fn any_row_with_tags(&self, tags: &[ProductTag]) -> bool {
        self.rows.iter().any(|t| tags.contains(&t.product_tag))
    }

    /// First-ever purchase date across all tags, or None for an unknown id.
    pub fn first_purchase(&self, customer_id: &str) -> Option<NaiveDate> {
        self.first_purchase.get(customer_id).copied()
    }

    pub fn rows(&self) -> &[Transaction] {
        &self.rows
    }
}
