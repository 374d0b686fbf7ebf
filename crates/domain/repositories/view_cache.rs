use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use serde_json::Value;

/// Read-path cache. Entries are dropped, never locked.
#[automock]
#[async_trait]
pub trait ViewCache {
    async fn get(&self, key: String) -> Result<Option<Value>>;

    async fn put(&self, key: String, value: Value) -> Result<()>;

    /// Returns how many entries were dropped.
    async fn invalidate_prefix(&self, prefix: String) -> Result<usize>;
}
