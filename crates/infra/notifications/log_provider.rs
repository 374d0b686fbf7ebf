use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use super::dispatcher::NotificationProvider;
use crate::domain::value_objects::notifications::BookingNotification;

/// Used when no notification endpoint is configured.
pub struct LogNotificationProvider;

#[async_trait]
impl NotificationProvider for LogNotificationProvider {
    async fn send(&self, notification: &BookingNotification) -> Result<()> {
        info!(
            kind = %notification.kind,
            business_id = %notification.business_id,
            booking_id = %notification.booking.id,
            start_time = %notification.booking.start_time,
            "notifications: booking notification"
        );
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "log"
    }
}
