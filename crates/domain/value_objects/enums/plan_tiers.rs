use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanTier {
    #[default]
    Free,
    Starter,
    Pro,
    Business,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "FREE",
            PlanTier::Starter => "STARTER",
            PlanTier::Pro => "PRO",
            PlanTier::Business => "BUSINESS",
        }
    }

    /// Unknown values fall back to the most restrictive tier.
    pub fn from_str(value: &str) -> Self {
        match value {
            "STARTER" => PlanTier::Starter,
            "PRO" => PlanTier::Pro,
            "BUSINESS" => PlanTier::Business,
            _ => PlanTier::Free,
        }
    }
}

impl Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
