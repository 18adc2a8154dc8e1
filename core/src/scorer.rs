//! Per-customer RFV scoring.
//!
//! `score_customer` is a pure function of (transactions, analysis date,
//! rules). No hidden state, no I/O; the caller hands in rows already
//! restricted to one customer and one focus's tag set.

use crate::{rules::FocusRules, transaction::Transaction};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Length of the trailing scoring window, in days.
pub const SCORING_WINDOW_DAYS: u64 = 365;

/// Recency value when no purchase fell inside the window.
pub const NO_PURCHASE_RECENCY: i64 = -1;

/// One customer's raw metrics and bucketed scores for one
/// (analysis date, focus) pair. Derived, recomputed on demand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RfvScore {
    /// Days since the most recent in-window purchase; −1 if none.
    pub recency_days: i64,
    /// Distinct in-window order ids.
    pub frequency: u64,
    /// Sum of the in-window volume field.
    pub volume: f64,
    pub r_score: u8,
    pub f_score: u8,
    pub v_score: u8,
    /// r + f + v, in 0..=9.
    pub total_score: u8,
}

impl RfvScore {
    /// The valid zero outcome: no purchase in the window, churn candidate.
    pub fn zero() -> Self {
        Self {
            recency_days: NO_PURCHASE_RECENCY,
            frequency: 0,
            volume: 0.0,
            r_score: 0,
            f_score: 0,
            v_score: 0,
            total_score: 0,
        }
    }
}

/// Score one customer's transactions (already filtered to one focus's tag
/// set) against one focus's rule tables, as of `analysis_date`.
///
/// The window is the closed interval
/// `[analysis_date − 365 days, analysis_date]`. An empty window is the
/// zero result, not an error.
pub fn score_customer<'a, I>(transactions: I, analysis_date: NaiveDate, rules: &FocusRules) -> RfvScore
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let window_start = analysis_date - Days::new(SCORING_WINDOW_DAYS);

    let mut last_purchase: Option<NaiveDate> = None;
    let mut orders: BTreeSet<&str> = BTreeSet::new();
    let mut volume = 0.0;

    for t in transactions {
        if t.purchase_date < window_start || t.purchase_date > analysis_date {
            continue;
        }
        if last_purchase.map_or(true, |d| t.purchase_date > d) {
            last_purchase = Some(t.purchase_date);
        }
        orders.insert(&t.order_id);
        volume += t.volume;
    }

    let Some(last_purchase) = last_purchase else {
        return RfvScore::zero();
    };

    let recency_days = (analysis_date - last_purchase).num_days();
    let frequency = orders.len() as u64;

    let r_score = rules.recency.score(recency_days as f64);
    let f_score = rules.frequency.score(frequency as f64);
    let v_score = rules.volume.score(volume);

    RfvScore {
        recency_days,
        frequency,
        volume,
        r_score,
        f_score,
        v_score,
        total_score: r_score + f_score + v_score,
    }
}
