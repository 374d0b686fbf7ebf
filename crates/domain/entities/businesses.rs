use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::plan_tiers::PlanTier,
    infra::db::postgres::schema::businesses,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = businesses)]
pub struct BusinessEntity {
    pub id: Uuid,
    pub name: String,
    pub plan: String,
    pub created_at: DateTime<Utc>,
}

impl BusinessEntity {
    pub fn plan_tier(&self) -> PlanTier {
        PlanTier::from_str(&self.plan)
    }
}
