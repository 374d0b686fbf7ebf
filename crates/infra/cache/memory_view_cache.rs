use anyhow::Result;
use async_trait::async_trait;
use lru::LruCache;
use serde_json::Value;
use std::{
    num::NonZeroUsize,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::repositories::view_cache::ViewCache;

struct CachedView {
    value: Value,
    stored_at: Instant,
}

/// Process-local view cache bounded by entry count (least recently used goes first)
/// and age.
pub struct MemoryViewCache {
    entries: Mutex<LruCache<String, CachedView>>,
    ttl: Duration,
}

impl MemoryViewCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl ViewCache for MemoryViewCache {
    async fn get(&self, key: String) -> Result<Option<Value>> {
        let mut entries = self.entries.lock().await;

        let looked_up = entries
            .get(&key)
            .map(|cached| (cached.stored_at.elapsed() < self.ttl).then(|| cached.value.clone()));

        // Expired.
        if let Some(None) = looked_up {
            entries.pop(&key);
        }

        Ok(looked_up.flatten())
    }

    async fn put(&self, key: String, value: Value) -> Result<()> {
        self.entries.lock().await.put(
            key,
            CachedView {
                value,
                stored_at: Instant::now(),
            },
        );

        Ok(())
    }

    async fn invalidate_prefix(&self, prefix: String) -> Result<usize> {
        let mut entries = self.entries.lock().await;

        let matching: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &matching {
            entries.pop(key);
        }
        let dropped = matching.len();

        debug!(%prefix, dropped, "view_cache: invalidated prefix");
        Ok(dropped)
    }
}
