use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Plan-limited resources whose creation is admission-controlled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Location,
    Staff,
}

impl ResourceKind {
    pub fn from_path(value: &str) -> Option<Self> {
        match value {
            "location" | "locations" => Some(ResourceKind::Location),
            "staff" => Some(ResourceKind::Staff),
            _ => None,
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            ResourceKind::Location => "location",
            ResourceKind::Staff => "staff",
        };
        write!(f, "{}", kind)
    }
}
