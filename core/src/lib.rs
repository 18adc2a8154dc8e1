//! rfv-core — RFV customer segmentation and before/after migration engine.
//!
//! The pipeline, leaf first:
//!   1. `rules`       — static score bands and score→category mappings for
//!                      the two segmentation models.
//!   2. `scorer`      — per-customer recency/frequency/volume metrics and
//!                      bucketed scores over a trailing 365-day window.
//!   3. `segmenter`   — one category per customer across the WHOLE
//!                      population, with the General composite and the
//!                      90-day NEW CUSTOMER tenure override.
//!   4. `matrix`      — before/after cross-tabulation with ENTERED BASE /
//!                      CHURN edge populations.
//!
//! `store` and `history` are the data-access side: SQLite snapshot history
//! for matrix-only runs and the NET rollup. The scoring path itself is
//! pure and does no I/O.

pub mod error;
pub mod history;
pub mod matrix;
pub mod rules;
pub mod scorer;
pub mod segmenter;
pub mod store;
pub mod transaction;
pub mod types;

pub use error::{RfvError, RfvResult};
pub use matrix::{build_migration_matrix, transitions, MigrationMatrix, TransitionRecord};
pub use rules::{assign_category, RuleSet, CHURN, ENTERED_BASE, NEW_CUSTOMER, UNDEFINED};
pub use scorer::{score_customer, RfvScore};
pub use segmenter::{segment_population, CustomerSegment, PopulationSegments};
pub use store::RfvStore;
pub use transaction::{Focus, ProductTag, Transaction, TransactionTable};
pub use types::{CustomerId, Model, OrderId};
