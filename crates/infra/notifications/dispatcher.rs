use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

use crate::domain::{
    repositories::notifications::BookingNotifier,
    value_objects::notifications::BookingNotification,
};

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

#[async_trait]
pub trait NotificationProvider: Send + Sync {
    async fn send(&self, notification: &BookingNotification) -> Result<()>;
    fn provider_name(&self) -> &'static str;
}

/// Queues notifications and delivers them from a background task.
/// Delivery failures are logged per provider and never reach the caller.
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<BookingNotification>,
}

impl NotificationDispatcher {
    /// Must be called from within a tokio runtime.
    pub fn new(providers: Vec<Arc<dyn NotificationProvider>>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<BookingNotification>(capacity.max(1));

        tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                for provider in &providers {
                    if let Err(error) = provider.send(&notification).await {
                        warn!(
                            provider = provider.provider_name(),
                            kind = %notification.kind,
                            booking_id = %notification.booking.id,
                            error = %error,
                            "notifications: provider failed"
                        );
                    }
                }
            }
        });

        Self { tx }
    }
}

impl BookingNotifier for NotificationDispatcher {
    fn publish(&self, notification: BookingNotification) -> Result<()> {
        match self.tx.try_send(notification) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!(
                    kind = %dropped.kind,
                    booking_id = %dropped.booking.id,
                    "notifications: queue full; dropping event"
                );
                Err(anyhow!("notification queue full"))
            }
            Err(mpsc::error::TrySendError::Closed(dropped)) => {
                warn!(
                    kind = %dropped.kind,
                    booking_id = %dropped.booking.id,
                    "notifications: queue closed; dropping event"
                );
                Err(anyhow!("notification queue closed"))
            }
        }
    }
}
