//! Rule tables — the business configuration for RFV scoring and
//! category assignment.
//!
//! RULE: every score lookup is total. A value of exactly 0 scores 0, a
//! value outside every band scores 0, and both branches are deliberate,
//! tested behavior — not fallthrough.
//!
//! Category names live here too. CHURN, NEW CUSTOMER, ENTERED BASE and
//! UNDEFINED are reserved labels applied by code, never rows in a table.

use crate::{
    error::{RfvError, RfvResult},
    transaction::Focus,
    types::Model,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Reserved category labels ─────────────────────────────────────────────────

/// Total score below 3, or a customer absent from the before snapshot's
/// counterpart in a migration join.
pub const CHURN: &str = "CHURN";
/// First-ever purchase within 90 days of the analysis date.
pub const NEW_CUSTOMER: &str = "NEW CUSTOMER";
/// Present only on the after side of a migration join.
pub const ENTERED_BASE: &str = "ENTERED BASE";
/// A 3..=9 score that matched no category rule — a table-authoring bug,
/// surfaced instead of aborting the scan.
pub const UNDEFINED: &str = "UNDEFINED";

/// Days since first-ever purchase at or under which the NEW CUSTOMER
/// override applies.
pub const NEW_CUSTOMER_TENURE_DAYS: i64 = 90;

// ── Score bands ──────────────────────────────────────────────────────────────

/// One closed interval `[lower, upper]` mapped to an ordinal score.
/// `upper = None` means unbounded above.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreBand {
    pub lower: f64,
    pub upper: Option<f64>,
    pub score: u8,
}

impl ScoreBand {
    pub const fn new(lower: f64, upper: f64, score: u8) -> Self {
        Self { lower, upper: Some(upper), score }
    }

    pub const fn open(lower: f64, score: u8) -> Self {
        Self { lower, upper: None, score }
    }

    fn contains(&self, value: f64) -> bool {
        value >= self.lower && self.upper.map_or(true, |u| value <= u)
    }
}

/// The ordered band list for one RFV dimension.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DimensionRules {
    pub bands: Vec<ScoreBand>,
}

impl DimensionRules {
    pub fn new(bands: Vec<ScoreBand>) -> Self {
        Self { bands }
    }

    /// Total lookup: exactly 0 scores 0 before any band is consulted;
    /// first matching band wins; a gap scores 0.
    pub fn score(&self, value: f64) -> u8 {
        if value == 0.0 {
            return 0;
        }
        for band in &self.bands {
            if band.contains(value) {
                return band.score;
            }
        }
        0
    }
}

/// The three dimension tables for one (model, focus) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FocusRules {
    pub recency: DimensionRules,
    pub frequency: DimensionRules,
    pub volume: DimensionRules,
}

// ── Category mapping ─────────────────────────────────────────────────────────

/// The two key shapes the models use, resolved through one dispatch:
/// the legacy model keys categories by exact score, the current model by
/// inclusive score range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKey {
    Exact(u8),
    Range(u8, u8),
}

impl CategoryKey {
    pub fn matches(&self, score: u8) -> bool {
        match *self {
            CategoryKey::Exact(n) => score == n,
            CategoryKey::Range(lo, hi) => score >= lo && score <= hi,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryRule {
    pub key: CategoryKey,
    pub name: String,
}

// ── Model rule sets ──────────────────────────────────────────────────────────

/// Everything one model needs: per-focus dimension tables, the score→name
/// mapping, and the business-preferred tier order for matrix layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelRules {
    pub model: Model,
    pub focus_rules: BTreeMap<Focus, FocusRules>,
    pub categories: Vec<CategoryRule>,
    pub tier_order: Vec<String>,
}

impl ModelRules {
    /// The dimension tables for a directly ruled focus.
    /// `General` is not ruled; the segmenter expands it first.
    pub fn focus_rules(&self, focus: Focus) -> RfvResult<&FocusRules> {
        self.focus_rules.get(&focus).ok_or_else(|| RfvError::UnknownFocus {
            focus: focus.name().to_string(),
            model: self.model.name().to_string(),
        })
    }

    /// The component focuses a General composite averages over.
    pub fn component_focuses(&self) -> Vec<Focus> {
        self.focus_rules.keys().copied().collect()
    }
}

/// Assign a category name to a total score.
///
/// Scores below 3 are CHURN before any table is consulted — this rule is
/// code, not configuration. A well-formed table resolves every score in
/// 3..=9; anything unresolved surfaces as UNDEFINED.
pub fn assign_category(total_score: u8, rules: &ModelRules) -> &str {
    if total_score < 3 {
        return CHURN;
    }
    for rule in &rules.categories {
        if rule.key.matches(total_score) {
            return &rule.name;
        }
    }
    UNDEFINED
}

/// Both models' rules, the unit callers pass around.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleSet {
    pub legacy: ModelRules,
    pub current: ModelRules,
}

impl RuleSet {
    pub fn model(&self, model: Model) -> &ModelRules {
        match model {
            Model::Legacy => &self.legacy,
            Model::Current => &self.current,
        }
    }

    /// Load a rule-set override from a JSON file.
    /// Production analysis uses `builtin()`; overrides exist for what-if runs.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let rules: RuleSet = serde_json::from_str(&content)?;
        Ok(rules)
    }

    /// The production rule values.
    pub fn builtin() -> Self {
        // Capsules score the same under both models.
        let capsules = FocusRules {
            recency: DimensionRules::new(vec![
                ScoreBand::new(0.0, 90.0, 3),
                ScoreBand::new(91.0, 180.0, 2),
                ScoreBand::new(181.0, 365.0, 1),
            ]),
            frequency: DimensionRules::new(vec![
                ScoreBand::open(8.0, 3),
                ScoreBand::new(3.0, 7.0, 2),
                ScoreBand::new(1.0, 2.0, 1),
            ]),
            volume: DimensionRules::new(vec![
                ScoreBand::open(360.0, 3),
                ScoreBand::new(120.0, 359.0, 2),
                ScoreBand::new(1.0, 119.0, 1),
            ]),
        };

        let supplies = FocusRules {
            recency: DimensionRules::new(vec![
                ScoreBand::new(0.0, 90.0, 3),
                ScoreBand::new(91.0, 180.0, 2),
                ScoreBand::new(181.0, 365.0, 1),
            ]),
            frequency: DimensionRules::new(vec![
                ScoreBand::open(5.0, 3),
                ScoreBand::new(3.0, 4.0, 2),
                ScoreBand::new(1.0, 2.0, 1),
            ]),
            volume: DimensionRules::new(vec![
                ScoreBand::open(6.0, 3),
                ScoreBand::new(4.0, 5.0, 2),
                ScoreBand::new(1.0, 3.0, 1),
            ]),
        };

        let filter = FocusRules {
            recency: DimensionRules::new(vec![
                ScoreBand::new(0.0, 120.0, 3),
                ScoreBand::new(121.0, 180.0, 2),
                ScoreBand::new(181.0, 365.0, 1),
            ]),
            frequency: DimensionRules::new(vec![
                ScoreBand::open(3.0, 3),
                ScoreBand::new(2.0, 2.0, 2),
                ScoreBand::new(1.0, 1.0, 1),
            ]),
            volume: DimensionRules::new(vec![
                ScoreBand::open(3.0, 3),
                ScoreBand::new(2.0, 2.0, 2),
                ScoreBand::new(1.0, 1.0, 1),
            ]),
        };

        let cylinders = FocusRules {
            recency: DimensionRules::new(vec![
                ScoreBand::new(0.0, 60.0, 3),
                ScoreBand::new(61.0, 180.0, 2),
                ScoreBand::new(181.0, 365.0, 1),
            ]),
            frequency: DimensionRules::new(vec![
                ScoreBand::open(5.0, 3),
                ScoreBand::new(4.0, 4.0, 2),
                ScoreBand::new(1.0, 3.0, 1),
            ]),
            volume: DimensionRules::new(vec![
                ScoreBand::open(6.0, 3),
                ScoreBand::new(4.0, 5.0, 2),
                ScoreBand::new(1.0, 3.0, 1),
            ]),
        };

        let legacy = ModelRules {
            model: Model::Legacy,
            focus_rules: BTreeMap::from([
                (Focus::Capsules, capsules.clone()),
                (Focus::Supplies, supplies),
            ]),
            categories: vec![
                CategoryRule { key: CategoryKey::Exact(9), name: "ELITE".into() },
                CategoryRule { key: CategoryKey::Exact(8), name: "POTENTIAL ELITE".into() },
                CategoryRule { key: CategoryKey::Exact(7), name: "LOYAL CUSTOMER".into() },
                CategoryRule { key: CategoryKey::Exact(6), name: "PROMISING".into() },
                CategoryRule { key: CategoryKey::Exact(5), name: "DOZING OFF".into() },
                CategoryRule { key: CategoryKey::Exact(4), name: "AT RISK".into() },
                CategoryRule { key: CategoryKey::Exact(3), name: "DORMANT".into() },
            ],
            tier_order: [
                ENTERED_BASE,
                NEW_CUSTOMER,
                "ELITE",
                "POTENTIAL ELITE",
                "LOYAL CUSTOMER",
                "PROMISING",
                "DOZING OFF",
                "AT RISK",
                "DORMANT",
                CHURN,
                UNDEFINED,
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        };

        let current = ModelRules {
            model: Model::Current,
            focus_rules: BTreeMap::from([
                (Focus::Capsules, capsules),
                (Focus::Filter, filter),
                (Focus::Cylinders, cylinders),
            ]),
            categories: vec![
                CategoryRule { key: CategoryKey::Range(9, 9), name: "DIAMOND".into() },
                CategoryRule { key: CategoryKey::Range(7, 8), name: "GOLD".into() },
                CategoryRule { key: CategoryKey::Range(5, 6), name: "SILVER".into() },
                CategoryRule { key: CategoryKey::Range(3, 4), name: "BRONZE".into() },
            ],
            tier_order: [
                ENTERED_BASE,
                NEW_CUSTOMER,
                "DIAMOND",
                "GOLD",
                "SILVER",
                "BRONZE",
                CHURN,
                UNDEFINED,
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        };

        Self { legacy, current }
    }
}
