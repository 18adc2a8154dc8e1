//! SQLite persistence layer.
//!
//! RULE: only this module talks to the database. The scoring core never
//! touches it — the store exists for the two collaborator shapes: loading
//! an externally supplied transaction table, and keeping/reading the
//! pre-aggregated segment-snapshot history that matrix-only runs consume.

use crate::{
    error::{RfvError, RfvResult},
    segmenter::PopulationSegments,
    transaction::{Focus, ProductTag, Transaction, TransactionTable},
    types::{CustomerId, Model},
};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct RfvStore {
    conn: Connection,
}

impl RfvStore {
    pub fn open(path: &str) -> RfvResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL only matters for real files; :memory: ignores it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> RfvResult<Self> {
        Ok(Self { conn: Connection::open(":memory:")? })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> RfvResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_snapshots.sql"))?;
        Ok(())
    }

    // ── Snapshot history ───────────────────────────────────────

    /// Persist one population scan as a snapshot, replacing any prior rows
    /// for the same (date, model, focus).
    pub fn save_snapshot(&mut self, segments: &PopulationSegments) -> RfvResult<()> {
        let date = segments.analysis_date.format(DATE_FORMAT).to_string();
        let model = segments.model.name();
        let focus = segments.focus.name();

        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM segment_snapshot
             WHERE snapshot_date = ?1 AND model = ?2 AND focus = ?3",
            params![date, model, focus],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO segment_snapshot
                     (snapshot_date, model, focus, customer_id, category, total_score)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for seg in segments.rows.values() {
                stmt.execute(params![
                    date,
                    model,
                    focus,
                    seg.customer_id,
                    seg.category,
                    seg.total_score as i64,
                ])?;
            }
        }
        tx.commit()?;

        log::info!(
            "saved snapshot {date} model={model} focus={focus} ({} rows)",
            segments.rows.len(),
        );
        Ok(())
    }

    /// Distinct snapshot dates for one (model, focus), newest first.
    pub fn available_snapshots(&self, model: Model, focus: Focus) -> RfvResult<Vec<NaiveDate>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT snapshot_date FROM segment_snapshot
             WHERE model = ?1 AND focus = ?2
             ORDER BY snapshot_date DESC",
        )?;
        let dates = stmt
            .query_map(params![model.name(), focus.name()], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        dates
            .into_iter()
            .map(|d| {
                NaiveDate::parse_from_str(&d, DATE_FORMAT)
                    .map_err(|e| anyhow::anyhow!("Bad snapshot_date '{d}': {e}").into())
            })
            .collect()
    }

    /// One snapshot in the decoupled shape the matrix builder consumes.
    pub fn load_snapshot(
        &self,
        date: NaiveDate,
        model: Model,
        focus: Focus,
    ) -> RfvResult<BTreeMap<CustomerId, String>> {
        let mut stmt = self.conn.prepare(
            "SELECT customer_id, category FROM segment_snapshot
             WHERE snapshot_date = ?1 AND model = ?2 AND focus = ?3",
        )?;
        let rows = stmt
            .query_map(
                params![date.format(DATE_FORMAT).to_string(), model.name(), focus.name()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )?
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(rows)
    }

    // ── Transaction table ──────────────────────────────────────

    /// Bulk-insert transaction rows (fixture seeding; real deployments
    /// attach a database the warehouse extract already populated).
    pub fn insert_transactions(&mut self, rows: &[Transaction]) -> RfvResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO purchase
                     (customer_id, purchase_date, order_id, product_tag, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for t in rows {
                stmt.execute(params![
                    t.customer_id,
                    t.purchase_date.format(DATE_FORMAT).to_string(),
                    t.order_id,
                    t.product_tag.name(),
                    t.volume,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Load the full transaction table, validating the required columns
    /// before reading a single row. A missing column is fatal — the rest
    /// of the engine assumes the shape holds.
    pub fn load_transactions(&self) -> RfvResult<TransactionTable> {
        self.require_columns(
            "purchase",
            &["customer_id", "purchase_date", "order_id", "product_tag", "volume"],
        )?;

        let mut stmt = self.conn.prepare(
            "SELECT customer_id, purchase_date, order_id, product_tag, volume FROM purchase",
        )?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, f64>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = Vec::with_capacity(raw.len());
        for (customer_id, date, order_id, tag, volume) in raw {
            let purchase_date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
                .map_err(|e| anyhow::anyhow!("Bad purchase_date '{date}': {e}"))?;
            let product_tag = ProductTag::parse(&tag)
                .ok_or_else(|| anyhow::anyhow!("Unknown product_tag '{tag}'"))?;
            rows.push(Transaction { customer_id, purchase_date, order_id, product_tag, volume });
        }

        log::debug!("loaded {} transaction rows", rows.len());
        Ok(TransactionTable::new(rows))
    }

    fn require_columns(&self, table: &str, required: &[&str]) -> RfvResult<()> {
        let mut stmt = self.conn.prepare(&format!("PRAGMA table_info({table})"))?;
        let present = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;

        for &column in required {
            if !present.iter().any(|c| c == column) {
                return Err(RfvError::MissingColumn {
                    table: table.to_string(),
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }
}
