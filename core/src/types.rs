//! Shared primitive types used across the whole engine.

use serde::{Deserialize, Serialize};

/// A stable customer identifier, as supplied by the data extract.
pub type CustomerId = String;

/// A sales-order identifier. Distinct order ids define frequency.
pub type OrderId = String;

/// Which segmentation model's rule tables apply.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Model {
    /// The original 7-tier model (ELITE .. DORMANT); focuses Capsules/Supplies.
    Legacy,
    /// The 4-tier model (DIAMOND/GOLD/SILVER/BRONZE); focuses Capsules/Filter/Cylinders.
    Current,
}

impl Model {
    pub fn name(&self) -> &'static str {
        match self {
            Model::Legacy => "legacy",
            Model::Current => "current",
        }
    }

    /// Parse the form stored in snapshot rows and accepted on the CLI.
    pub fn parse(s: &str) -> Option<Model> {
        match s {
            "legacy" => Some(Model::Legacy),
            "current" => Some(Model::Current),
            _ => None,
        }
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
