use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crates::domain::{
    repositories::{notifications::BookingNotifier, view_cache::ViewCache},
    value_objects::{
        bookings::BookingDto,
        notifications::{BookingNotification, NotificationKind},
        view_cache::tenant_write_prefixes,
    },
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SideEffectFailures {
    pub cache: u64,
    pub notifications: u64,
}

/// Best-effort collaborators around a booking write: view cache and notifications.
/// Failures are logged and counted, never returned.
pub struct BookingSideEffects<V, N>
where
    V: ViewCache + Send + Sync + 'static,
    N: BookingNotifier + Send + Sync + 'static,
{
    view_cache: Arc<V>,
    notifier: Arc<N>,
    cache_failures: AtomicU64,
    notification_failures: AtomicU64,
}

impl<V, N> BookingSideEffects<V, N>
where
    V: ViewCache + Send + Sync + 'static,
    N: BookingNotifier + Send + Sync + 'static,
{
    pub fn new(view_cache: Arc<V>, notifier: Arc<N>) -> Self {
        Self {
            view_cache,
            notifier,
            cache_failures: AtomicU64::new(0),
            notification_failures: AtomicU64::new(0),
        }
    }

    pub fn failures(&self) -> SideEffectFailures {
        SideEffectFailures {
            cache: self.cache_failures.load(Ordering::Relaxed),
            notifications: self.notification_failures.load(Ordering::Relaxed),
        }
    }

    /// Drops every cached view a booking write can make stale for this tenant.
    pub async fn invalidate_tenant(&self, business_id: Uuid) {
        for prefix in tenant_write_prefixes(business_id) {
            if let Err(err) = self.view_cache.invalidate_prefix(prefix.clone()).await {
                self.cache_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    %business_id,
                    %prefix,
                    cache_error = ?err,
                    "side_effects: cache invalidation failed"
                );
            }
        }
    }

    pub fn notify(&self, kind: NotificationKind, booking: &BookingDto) {
        let notification = BookingNotification::new(kind, booking.clone());

        if let Err(err) = self.notifier.publish(notification) {
            self.notification_failures.fetch_add(1, Ordering::Relaxed);
            warn!(
                business_id = %booking.business_id,
                booking_id = %booking.id,
                kind = %kind,
                notify_error = ?err,
                "side_effects: notification dispatch failed"
            );
        }
    }

    pub async fn read_view<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        match self.view_cache.get(key.to_string()).await {
            Ok(Some(value)) => match serde_json::from_value::<T>(value) {
                Ok(view) => {
                    debug!(%key, "side_effects: cache hit");
                    Some(view)
                }
                Err(err) => {
                    warn!(%key, decode_error = ?err, "side_effects: cached view unreadable");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                self.cache_failures.fetch_add(1, Ordering::Relaxed);
                warn!(%key, cache_error = ?err, "side_effects: cache read failed");
                None
            }
        }
    }

    pub async fn store_view<T>(&self, key: String, view: &T)
    where
        T: Serialize,
    {
        let value = match serde_json::to_value(view) {
            Ok(value) => value,
            Err(err) => {
                warn!(%key, encode_error = ?err, "side_effects: view not cacheable");
                return;
            }
        };

        if let Err(err) = self.view_cache.put(key.clone(), value).await {
            self.cache_failures.fetch_add(1, Ordering::Relaxed);
            warn!(%key, cache_error = ?err, "side_effects: cache write failed");
        }
    }
}
