use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::{
    clients::{ClientEntity, InsertClientEntity},
    services::ServiceEntity,
};

/// Read-mostly reference data owned by the catalog. Lookups are tenant-scoped.
#[automock]
#[async_trait]
pub trait CatalogRepository {
    async fn find_service(
        &self,
        business_id: Uuid,
        service_id: Uuid,
    ) -> Result<Option<ServiceEntity>>;

    async fn find_client(&self, business_id: Uuid, client_id: Uuid)
    -> Result<Option<ClientEntity>>;

    async fn location_exists(&self, business_id: Uuid, location_id: Uuid) -> Result<bool>;

    async fn staff_exists(&self, business_id: Uuid, staff_id: Uuid) -> Result<bool>;

    /// Matches on the normalized (lowercase) email within the tenant.
    async fn find_or_create_client(&self, client: InsertClientEntity) -> Result<ClientEntity>;
}
