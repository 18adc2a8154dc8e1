//! rfv-runner: headless before/after RFV analysis over a synthetic fixture.
//!
//! Usage:
//!   rfv-runner --seed 42 --customers 2000 --before 2025-01-01 --after 2025-06-01
//!   rfv-runner --model legacy --focus capsules --db history.db
//!   rfv-runner --json > report.json

mod fixture;

use anyhow::Result;
use chrono::NaiveDate;
use rfv_core::{
    build_migration_matrix, history, segment_population, Focus, MigrationMatrix, Model,
    PopulationSegments, RfvStore, RuleSet, TransactionTable,
};
use std::env;

/// The machine-readable shape `--json` emits for downstream dashboards.
#[derive(serde::Serialize)]
struct MatrixReport {
    model: Model,
    focus: Focus,
    before_date: NaiveDate,
    after_date: NaiveDate,
    customers: usize,
    matrix: MigrationMatrix,
    percentages: Vec<Vec<f64>>,
}

impl MatrixReport {
    fn new(before: &PopulationSegments, after: &PopulationSegments, matrix: MigrationMatrix) -> Self {
        Self {
            model: before.model,
            focus: before.focus,
            before_date: before.analysis_date,
            after_date: after.analysis_date,
            customers: matrix.grand_total as usize,
            percentages: matrix.percentages(),
            matrix,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let customers = parse_arg(&args, "--customers", 2000usize);
    let before_date = parse_date_arg(&args, "--before", "2025-01-01")?;
    let after_date = parse_date_arg(&args, "--after", "2025-06-01")?;
    let model = str_arg(&args, "--model", "current");
    let focus = str_arg(&args, "--focus", "general");
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str());
    let json = args.iter().any(|a| a == "--json");

    let model = Model::parse(model)
        .ok_or_else(|| anyhow::anyhow!("Unknown model '{model}' (legacy|current)"))?;
    let focus = Focus::parse(focus)
        .ok_or_else(|| anyhow::anyhow!("Unknown focus '{focus}'"))?;

    anyhow::ensure!(before_date < after_date, "--before must precede --after");

    if !json {
        println!("RFV before/after analysis");
        println!("  seed:      {seed}");
        println!("  customers: {customers}");
        println!("  before:    {before_date}");
        println!("  after:     {after_date}");
        println!("  model:     {model}");
        println!("  focus:     {focus}");
        println!();
    }

    // Two years of purchase history ending at the after date, so the before
    // date has a full 365-day window behind it too.
    let rows = fixture::generate_transactions(seed, customers, after_date, 730);
    log::info!("fixture: {} transaction rows", rows.len());
    let table = TransactionTable::new(rows);

    let rules = RuleSet::builtin();
    let before = segment_population(&table, before_date, model, focus, &rules)?;
    let after = segment_population(&table, after_date, model, focus, &rules)?;

    let tier_order = &rules.model(model).tier_order;
    let matrix = build_migration_matrix(
        &before.categories(),
        &after.categories(),
        tier_order,
        tier_order,
    );

    if json {
        let report = MatrixReport::new(&before, &after, matrix);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("=== MIGRATION MATRIX (counts) ===");
        println!("{}", matrix.render_counts());
        println!("=== MIGRATION MATRIX (row %) ===");
        println!("{}", matrix.render_percentages());
    }

    if let Some(db) = db {
        persist_and_report(db, &before, &after, model, focus, json)?;
    }

    Ok(())
}

/// Save both snapshots and print the NET series read back from the store.
/// In `--json` mode only the snapshots are written, so stdout stays one document.
fn persist_and_report(
    db: &str,
    before: &PopulationSegments,
    after: &PopulationSegments,
    model: Model,
    focus: Focus,
    json: bool,
) -> Result<()> {
    let mut store = RfvStore::open(db)?;
    store.migrate()?;
    store.save_snapshot(before)?;
    store.save_snapshot(after)?;

    if json {
        return Ok(());
    }
    println!("=== NET SERIES ({db}) ===");
    for point in history::net_series(&store, model, focus)? {
        println!(
            "  {}  active={:6}  churned={:6}  net={:6}",
            point.date, point.active, point.churned, point.net
        );
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn str_arg<'a>(args: &'a [String], flag: &str, default: &'a str) -> &'a str {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .unwrap_or(default)
}

fn parse_date_arg(args: &[String], flag: &str, default: &str) -> Result<NaiveDate> {
    let raw = str_arg(args, flag, default);
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("Bad date '{raw}' for {flag}: {e}"))
}
