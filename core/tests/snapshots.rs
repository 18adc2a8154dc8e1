use chrono::NaiveDate;
use rfv_core::{
    build_migration_matrix, history, segment_population, Focus, Model, ProductTag, RfvError,
    RfvStore, RuleSet, Transaction, TransactionTable,
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

fn store() -> RfvStore {
    let store = RfvStore::in_memory().unwrap();
    store.migrate().unwrap();
    store
}

fn demo_table() -> TransactionTable {
    TransactionTable::new(vec![
        txn("c-1", "2024-06-01", "O-1", ProductTag::Capsule, 150.0),
        txn("c-1", "2025-04-01", "O-2", ProductTag::Capsule, 200.0),
        txn("c-2", "2024-07-01", "O-3", ProductTag::Capsule, 30.0),
        txn("c-3", "2024-05-01", "O-4", ProductTag::Co2, 2.0),
    ])
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// A saved snapshot loads back as exactly the category map the segmenter
/// produced.
#[test]
fn snapshot_round_trip_preserves_categories() {
    let rules = RuleSet::builtin();
    let table = demo_table();
    let segments =
        segment_population(&table, d("2025-06-01"), Model::Current, Focus::Capsules, &rules)
            .unwrap();

    let mut store = store();
    store.save_snapshot(&segments).unwrap();

    let loaded = store
        .load_snapshot(d("2025-06-01"), Model::Current, Focus::Capsules)
        .unwrap();
    assert_eq!(loaded, segments.categories());
}

/// Saving the same (date, model, focus) twice replaces, not duplicates.
#[test]
fn resaving_a_snapshot_replaces_it() {
    let rules = RuleSet::builtin();
    let table = demo_table();
    let segments =
        segment_population(&table, d("2025-06-01"), Model::Current, Focus::Capsules, &rules)
            .unwrap();

    let mut store = store();
    store.save_snapshot(&segments).unwrap();
    store.save_snapshot(&segments).unwrap();

    let loaded = store
        .load_snapshot(d("2025-06-01"), Model::Current, Focus::Capsules)
        .unwrap();
    assert_eq!(loaded.len(), segments.len());
}

/// Snapshot dates list newest-first and are scoped to (model, focus).
#[test]
fn available_snapshots_are_scoped_and_descending() {
    let rules = RuleSet::builtin();
    let table = demo_table();
    let mut store = store();

    for date in ["2025-01-01", "2025-06-01", "2025-03-01"] {
        let segments =
            segment_population(&table, d(date), Model::Current, Focus::Capsules, &rules).unwrap();
        store.save_snapshot(&segments).unwrap();
    }

    let dates = store.available_snapshots(Model::Current, Focus::Capsules).unwrap();
    assert_eq!(dates, vec![d("2025-06-01"), d("2025-03-01"), d("2025-01-01")]);

    assert!(
        store.available_snapshots(Model::Legacy, Focus::Capsules).unwrap().is_empty(),
        "legacy snapshots were never saved"
    );
}

/// The matrix-only path: two stored snapshots feed the builder without
/// any re-scoring, and the grand total still covers the customer union.
#[test]
fn migration_matrix_builds_from_stored_snapshots() {
    let rules = RuleSet::builtin();
    let table = demo_table();
    let mut store = store();

    for date in ["2025-01-01", "2025-06-01"] {
        let segments =
            segment_population(&table, d(date), Model::Current, Focus::Capsules, &rules).unwrap();
        store.save_snapshot(&segments).unwrap();
    }

    let before = store
        .load_snapshot(d("2025-01-01"), Model::Current, Focus::Capsules)
        .unwrap();
    let after = store
        .load_snapshot(d("2025-06-01"), Model::Current, Focus::Capsules)
        .unwrap();

    let order = &rules.model(Model::Current).tier_order;
    let matrix = build_migration_matrix(&before, &after, order, order);
    assert_eq!(matrix.grand_total, table.customer_count() as u64);
}

/// The NET series runs oldest-first and nets active against churned.
#[test]
fn net_series_counts_active_minus_churned() {
    let rules = RuleSet::builtin();
    let table = demo_table();
    let mut store = store();

    for date in ["2025-01-01", "2025-06-01"] {
        let segments =
            segment_population(&table, d(date), Model::Current, Focus::Capsules, &rules).unwrap();
        store.save_snapshot(&segments).unwrap();
    }

    let series = history::net_series(&store, Model::Current, Focus::Capsules).unwrap();
    assert_eq!(series.len(), 2);
    assert_eq!(series[0].date, d("2025-01-01"), "oldest first");

    for point in &series {
        assert_eq!(point.active + point.churned, table.customer_count() as i64);
        assert_eq!(point.net, point.active - point.churned);
    }
}

/// Transaction rows round-trip through the purchase table.
#[test]
fn transactions_round_trip_through_store() {
    let mut store = store();
    let rows: Vec<Transaction> = demo_table().rows().to_vec();
    store.insert_transactions(&rows).unwrap();

    let loaded = store.load_transactions().unwrap();
    assert_eq!(loaded.len(), rows.len());
    assert_eq!(loaded.customer_count(), 3);
    assert_eq!(
        loaded.first_purchase("c-1"),
        Some(d("2024-06-01")),
        "first-purchase index survives the round trip"
    );
}

/// Loading transactions from a database without the expected shape is the
/// fatal data-shape error, raised before any row is read.
#[test]
fn missing_transaction_columns_are_fatal() {
    // No migrate(): the purchase table does not exist at all.
    let store = RfvStore::in_memory().unwrap();

    let err = store.load_transactions().unwrap_err();
    assert!(matches!(err, RfvError::MissingColumn { .. }), "got {err:?}");
}
