use anyhow::Result;
use async_trait::async_trait;
use diesel::{OptionalExtension, RunQueryDsl, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{businesses, locations, staff},
    },
};
use domain::{
    entities::businesses::BusinessEntity, repositories::businesses::BusinessRepository,
    value_objects::enums::resource_kinds::ResourceKind,
};

pub struct BusinessPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl BusinessPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl BusinessRepository for BusinessPostgres {
    async fn find_by_id(&self, business_id: Uuid) -> Result<Option<BusinessEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = businesses::table
            .filter(businesses::id.eq(business_id))
            .select(BusinessEntity::as_select())
            .first::<BusinessEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn count_resources(&self, business_id: Uuid, kind: ResourceKind) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let count = match kind {
            ResourceKind::Location => locations::table
                .filter(locations::business_id.eq(business_id))
                .count()
                .get_result::<i64>(&mut conn)?,
            ResourceKind::Staff => staff::table
                .filter(staff::business_id.eq(business_id))
                .count()
                .get_result::<i64>(&mut conn)?,
        };

        Ok(count)
    }
}
