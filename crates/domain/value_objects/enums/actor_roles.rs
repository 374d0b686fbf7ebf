use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Owner,
    Admin,
    Staff,
}

impl ActorRole {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "owner" => Some(ActorRole::Owner),
            "admin" => Some(ActorRole::Admin),
            "staff" => Some(ActorRole::Staff),
            _ => None,
        }
    }

    pub fn is_manager(&self) -> bool {
        matches!(self, ActorRole::Owner | ActorRole::Admin)
    }
}

impl Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let role = match self {
            ActorRole::Owner => "owner",
            ActorRole::Admin => "admin",
            ActorRole::Staff => "staff",
        };
        write!(f, "{}", role)
    }
}
