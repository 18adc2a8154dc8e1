//! Historical rollups over stored snapshots.
//!
//! Nothing here re-scores anything — these are simple aggregations over
//! categories the segmenter already computed and the store persisted.

use crate::{
    error::RfvResult,
    rules::CHURN,
    store::RfvStore,
    transaction::Focus,
    types::Model,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One point of the NET series: active customers minus churned customers
/// at a snapshot date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetPoint {
    pub date: NaiveDate,
    pub active: i64,
    pub churned: i64,
    pub net: i64,
}

/// The NET series for one (model, focus), oldest snapshot first.
/// Every category other than CHURN counts as active.
pub fn net_series(store: &RfvStore, model: Model, focus: Focus) -> RfvResult<Vec<NetPoint>> {
    let mut dates = store.available_snapshots(model, focus)?;
    dates.reverse(); // store lists newest first

    let mut series = Vec::with_capacity(dates.len());
    for date in dates {
        let snapshot = store.load_snapshot(date, model, focus)?;

        let churned = snapshot.values().filter(|c| c.as_str() == CHURN).count() as i64;
        let active = snapshot.len() as i64 - churned;

        series.push(NetPoint { date, active, churned, net: active - churned });
    }
    Ok(series)
}
