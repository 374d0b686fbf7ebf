use anyhow::{Result, anyhow};
use async_trait::async_trait;
use diesel::{
    OptionalExtension, RunQueryDsl,
    dsl::exists,
    insert_into,
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
    select,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{clients, locations, services, staff},
    },
};
use domain::{
    entities::{
        clients::{ClientEntity, InsertClientEntity},
        services::ServiceEntity,
    },
    repositories::catalog::CatalogRepository,
};

pub struct CatalogPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CatalogPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }

    fn find_client_by_email(
        conn: &mut PgConnection,
        business_id: Uuid,
        email: &str,
    ) -> QueryResult<Option<ClientEntity>> {
        clients::table
            .filter(clients::business_id.eq(business_id))
            .filter(clients::email.eq(email))
            .select(ClientEntity::as_select())
            .first::<ClientEntity>(conn)
            .optional()
    }
}

#[async_trait]
impl CatalogRepository for CatalogPostgres {
    async fn find_service(
        &self,
        business_id: Uuid,
        service_id: Uuid,
    ) -> Result<Option<ServiceEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = services::table
            .filter(services::id.eq(service_id))
            .filter(services::business_id.eq(business_id))
            .filter(services::is_active.eq(true))
            .select(ServiceEntity::as_select())
            .first::<ServiceEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_client(
        &self,
        business_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<ClientEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = clients::table
            .filter(clients::id.eq(client_id))
            .filter(clients::business_id.eq(business_id))
            .select(ClientEntity::as_select())
            .first::<ClientEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn location_exists(&self, business_id: Uuid, location_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let found = select(exists(
            locations::table
                .filter(locations::id.eq(location_id))
                .filter(locations::business_id.eq(business_id)),
        ))
        .get_result::<bool>(&mut conn)?;

        Ok(found)
    }

    async fn staff_exists(&self, business_id: Uuid, staff_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let found = select(exists(
            staff::table
                .filter(staff::id.eq(staff_id))
                .filter(staff::business_id.eq(business_id)),
        ))
        .get_result::<bool>(&mut conn)?;

        Ok(found)
    }

    async fn find_or_create_client(&self, client: InsertClientEntity) -> Result<ClientEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let email = client
            .email
            .clone()
            .ok_or_else(|| anyhow!("client email is required for lookup"))?;

        if let Some(existing) = Self::find_client_by_email(&mut conn, client.business_id, &email)? {
            return Ok(existing);
        }

        let inserted = insert_into(clients::table)
            .values(&client)
            .returning(ClientEntity::as_returning())
            .get_result::<ClientEntity>(&mut conn);

        match inserted {
            Ok(created) => Ok(created),
            // Lost a race against a concurrent booking with the same email.
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Self::find_client_by_email(&mut conn, client.business_id, &email)?
                    .ok_or_else(|| anyhow!("client vanished after unique violation"))
            }
            Err(err) => Err(err.into()),
        }
    }
}
