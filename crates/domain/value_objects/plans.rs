use serde::{Deserialize, Serialize};

use crate::domain::value_objects::enums::{plan_tiers::PlanTier, resource_kinds::ResourceKind};

pub const FREE_MONTHLY_BOOKINGS: i64 = 50;

/// Limits attached to a plan tier. `None` means unlimited.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PlanLimits {
    pub max_locations: Option<i64>,
    pub max_staff: Option<i64>,
    pub max_monthly_bookings: Option<i64>,
}

impl PlanLimits {
    pub fn for_tier(tier: PlanTier) -> Self {
        match tier {
            PlanTier::Free => Self {
                max_locations: Some(1),
                max_staff: Some(1),
                max_monthly_bookings: Some(FREE_MONTHLY_BOOKINGS),
            },
            PlanTier::Starter => Self {
                max_locations: Some(1),
                max_staff: Some(1),
                max_monthly_bookings: None,
            },
            PlanTier::Pro | PlanTier::Business => Self::default(),
        }
    }

    pub fn limit_for(&self, kind: ResourceKind) -> Option<i64> {
        match kind {
            ResourceKind::Location => self.max_locations,
            ResourceKind::Staff => self.max_staff,
        }
    }
}
