use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::businesses::BusinessEntity, value_objects::enums::resource_kinds::ResourceKind,
};

#[automock]
#[async_trait]
pub trait BusinessRepository {
    async fn find_by_id(&self, business_id: Uuid) -> Result<Option<BusinessEntity>>;

    async fn count_resources(&self, business_id: Uuid, kind: ResourceKind) -> Result<i64>;
}
