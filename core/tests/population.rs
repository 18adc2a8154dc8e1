use chrono::NaiveDate;
use rfv_core::{
    segment_population, Focus, Model, ProductTag, RfvError, RuleSet, Transaction,
    TransactionTable, CHURN, NEW_CUSTOMER,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn txn(customer: &str, date: &str, order: &str, tag: ProductTag, volume: f64) -> Transaction {
    Transaction {
        customer_id: customer.into(),
        purchase_date: d(date),
        order_id: order.into(),
        product_tag: tag,
        volume,
    }
}

/// A small mixed population: one capsule buyer, one cylinder-only buyer.
/// All first purchases are months old, so no tenure override fires.
fn mixed_table() -> TransactionTable {
    TransactionTable::new(vec![
        txn("c-cap", "2024-09-01", "O-1", ProductTag::Capsule, 40.0),
        txn("c-cap", "2025-05-01", "O-2", ProductTag::Capsule, 60.0),
        txn("c-co2", "2024-09-15", "O-3", ProductTag::Co2, 2.0),
    ])
}

const ANALYSIS: &str = "2025-06-01";

// ── Tests ────────────────────────────────────────────────────────────────────

/// Every customer in the transaction table appears exactly once in the
/// output, whether or not they transacted in the requested focus.
#[test]
fn population_seeds_from_full_customer_universe() {
    let rules = RuleSet::builtin();
    let table = mixed_table();

    let segments =
        segment_population(&table, d(ANALYSIS), Model::Current, Focus::Capsules, &rules).unwrap();

    assert_eq!(segments.len(), 2);
    assert!(segments.get("c-cap").is_some());
    assert!(
        segments.get("c-co2").is_some(),
        "customer outside the focus must still be segmented"
    );
}

/// A customer with no focus transactions gets the zero result and CHURN,
/// not an omission.
#[test]
fn non_focus_customer_rides_zero_path_to_churn() {
    let rules = RuleSet::builtin();
    let table = mixed_table();

    let segments =
        segment_population(&table, d(ANALYSIS), Model::Current, Focus::Capsules, &rules).unwrap();

    let seg = segments.get("c-co2").unwrap();
    assert_eq!(seg.total_score, 0);
    assert_eq!(seg.category, CHURN);
    let detail = seg.detail.as_ref().unwrap();
    assert_eq!(detail.recency_days, -1);
    assert_eq!(detail.frequency, 0);
}

/// Recency 31 (R=3), two orders (F=1), volume 100 (V=1): total 5, SILVER
/// under the current model.
#[test]
fn focus_customer_is_scored_and_categorized() {
    let rules = RuleSet::builtin();
    let table = mixed_table();

    let segments =
        segment_population(&table, d(ANALYSIS), Model::Current, Focus::Capsules, &rules).unwrap();

    let seg = segments.get("c-cap").unwrap();
    assert_eq!(seg.total_score, 5);
    assert_eq!(seg.category, "SILVER");
}

/// Two runs over identical inputs produce identical output.
#[test]
fn segmentation_is_idempotent() {
    let rules = RuleSet::builtin();
    let table = mixed_table();

    let first =
        segment_population(&table, d(ANALYSIS), Model::Current, Focus::Capsules, &rules).unwrap();
    let second =
        segment_population(&table, d(ANALYSIS), Model::Current, Focus::Capsules, &rules).unwrap();

    assert_eq!(first, second);
}

/// First-ever purchase 10 days before the analysis date forces
/// NEW CUSTOMER even though the focus score is a would-be CHURN — and the
/// tenure clock runs on ALL product tags, not just the focus.
#[test]
fn tenure_override_beats_churn_across_tags() {
    let rules = RuleSet::builtin();
    let table = TransactionTable::new(vec![
        txn("c-new", "2025-05-22", "O-1", ProductTag::Co2, 2.0),
    ]);

    let segments =
        segment_population(&table, d(ANALYSIS), Model::Current, Focus::Capsules, &rules).unwrap();

    let seg = segments.get("c-new").unwrap();
    assert_eq!(seg.total_score, 0, "no capsule purchases, zero score");
    assert_eq!(seg.category, NEW_CUSTOMER);
}

/// A first purchase older than 90 days does not trigger the override.
#[test]
fn old_customers_keep_their_scored_category() {
    let rules = RuleSet::builtin();
    let table = mixed_table();

    let segments =
        segment_population(&table, d(ANALYSIS), Model::Current, Focus::Capsules, &rules).unwrap();

    assert_ne!(segments.get("c-cap").unwrap().category, NEW_CUSTOMER);
    assert_ne!(segments.get("c-co2").unwrap().category, NEW_CUSTOMER);
}

/// Requesting a focus the model does not rule is caller misuse.
#[test]
fn unknown_focus_for_model_is_an_error() {
    let rules = RuleSet::builtin();
    let table = mixed_table();

    let err = segment_population(&table, d(ANALYSIS), Model::Legacy, Focus::Filter, &rules)
        .unwrap_err();
    assert!(matches!(err, RfvError::UnknownFocus { .. }), "got {err:?}");
}

/// General composite: a customer scoring 9 on capsules and 0 on the other
/// two components averages to 3 — BRONZE, with no single R/F/V breakdown.
#[test]
fn general_composite_averages_component_scores() {
    let rules = RuleSet::builtin();
    let mut rows = Vec::new();
    // Eight distinct capsule orders, volume 400 total, last one 30 days
    // before the analysis date: R=3, F=3, V=3.
    for (i, date) in [
        "2024-10-01", "2024-11-01", "2024-12-01", "2025-01-01",
        "2025-02-01", "2025-03-01", "2025-04-01", "2025-05-02",
    ]
    .iter()
    .enumerate()
    {
        rows.push(txn("c-heavy", date, &format!("O-{i}"), ProductTag::Capsule, 50.0));
    }
    // Another customer supplies the filter and cylinder components so the
    // population-level coverage check passes.
    rows.push(txn("c-maint", "2024-11-01", "O-m1", ProductTag::Filter, 1.0));
    rows.push(txn("c-maint", "2024-11-01", "O-m2", ProductTag::Co2, 2.0));

    let table = TransactionTable::new(rows);
    let segments =
        segment_population(&table, d(ANALYSIS), Model::Current, Focus::General, &rules).unwrap();

    let seg = segments.get("c-heavy").unwrap();
    assert_eq!(seg.total_score, 3, "round(9 / 3 components)");
    assert_eq!(seg.category, "BRONZE");
    assert!(seg.detail.is_none(), "composite rows carry no single breakdown");
}

/// A component focus with zero rows across the entire population fails the
/// General request loudly instead of silently averaging fewer components.
#[test]
fn general_composite_fails_on_population_empty_component() {
    let rules = RuleSet::builtin();
    let table = TransactionTable::new(vec![
        txn("c-cap", "2025-05-01", "O-1", ProductTag::Capsule, 60.0),
    ]);

    let err = segment_population(&table, d(ANALYSIS), Model::Current, Focus::General, &rules)
        .unwrap_err();
    assert!(matches!(err, RfvError::EmptyFocusComponent { .. }), "got {err:?}");
}
