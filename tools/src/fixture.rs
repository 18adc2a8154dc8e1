//! Deterministic synthetic transaction fixture.
//!
//! Purchase behavior derives entirely from the seed passed on the command
//! line, so segmentation output is reproducible run to run. Order ids are
//! opaque uuids; only their distinctness matters to the scorer.

use chrono::{Days, NaiveDate};
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;
use rfv_core::{ProductTag, Transaction};

/// Seeded RNG with the few draws the generator needs.
pub struct FixtureRng {
    inner: Pcg64Mcg,
}

impl FixtureRng {
    pub fn new(seed: u64) -> Self {
        Self { inner: Pcg64Mcg::seed_from_u64(seed) }
    }

    /// Roll a float in [0.0, 1.0).
    fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Bernoulli trial: returns true with probability p.
    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// Per-tag purchase behavior for one synthetic customer archetype.
struct Archetype {
    /// Probability a customer belongs to this archetype.
    share: f64,
    /// (tag, orders per year, volume per order low, volume per order high)
    habits: &'static [(ProductTag, u64, f64, f64)],
}

const ARCHETYPES: &[Archetype] = &[
    // Heavy capsule subscriber with full machine maintenance.
    Archetype {
        share: 0.25,
        habits: &[
            (ProductTag::Capsule, 12, 30.0, 80.0),
            (ProductTag::Filter, 2, 1.0, 2.0),
            (ProductTag::Co2, 4, 1.0, 3.0),
        ],
    },
    // Occasional capsule buyer, no maintenance purchases.
    Archetype {
        share: 0.40,
        habits: &[(ProductTag::Capsule, 3, 10.0, 40.0)],
    },
    // Sparkling-water household: cylinders and filters, few capsules.
    Archetype {
        share: 0.20,
        habits: &[
            (ProductTag::Co2, 6, 1.0, 3.0),
            (ProductTag::Filter, 3, 1.0, 2.0),
            (ProductTag::Capsule, 1, 10.0, 20.0),
        ],
    },
    // Lapsed customer: one old burst of purchases, then silence.
    Archetype {
        share: 0.15,
        habits: &[(ProductTag::Capsule, 2, 10.0, 30.0)],
    },
];

/// Generate a synthetic transaction table spanning `span_days` days ending
/// at `end_date`. Lapsed-archetype customers only purchase in the first
/// third of the span, so any recent analysis date sees them as churned.
pub fn generate_transactions(
    seed: u64,
    customers: usize,
    end_date: NaiveDate,
    span_days: u64,
) -> Vec<Transaction> {
    let mut rng = FixtureRng::new(seed);
    let span_start = end_date - Days::new(span_days);
    let years = span_days as f64 / 365.0;

    let mut rows = Vec::new();
    for i in 0..customers {
        let customer_id = format!("c-{i:06}");
        let archetype_idx = pick_archetype(&mut rng);
        let archetype = &ARCHETYPES[archetype_idx];
        let lapsed = archetype_idx == ARCHETYPES.len() - 1;

        for &(tag, orders_per_year, vol_lo, vol_hi) in archetype.habits {
            let orders = (orders_per_year as f64 * years).round() as u64;
            for _ in 0..orders {
                // Lapsed customers stop buying after the first third.
                let latest_offset = if lapsed { span_days / 3 } else { span_days };
                let offset = rng.next_u64_below(latest_offset.max(1));
                let purchase_date = span_start + Days::new(offset);

                let volume = vol_lo + rng.next_f64() * (vol_hi - vol_lo);
                let order_id = uuid::Uuid::new_v4().to_string();

                // Roughly one in five orders splits into two lines with the
                // same order id, so distinct-order counting gets exercised.
                let lines = if rng.chance(0.2) { 2 } else { 1 };
                for _ in 0..lines {
                    rows.push(Transaction {
                        customer_id: customer_id.clone(),
                        purchase_date,
                        order_id: order_id.clone(),
                        product_tag: tag,
                        volume: (volume / lines as f64).round(),
                    });
                }
            }
        }
    }
    rows
}

fn pick_archetype(rng: &mut FixtureRng) -> usize {
    let roll = rng.next_f64();
    let mut cumulative = 0.0;
    for (i, archetype) in ARCHETYPES.iter().enumerate() {
        cumulative += archetype.share;
        if roll < cumulative {
            return i;
        }
    }
    ARCHETYPES.len() - 1
}
