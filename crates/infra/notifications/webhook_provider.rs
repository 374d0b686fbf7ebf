use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use url::Url;

use super::dispatcher::NotificationProvider;
use crate::domain::value_objects::notifications::BookingNotification;

/// Posts notifications as JSON to the notification service.
pub struct WebhookNotificationProvider {
    endpoint: Url,
    client: Client,
}

impl WebhookNotificationProvider {
    pub fn new(endpoint: Url) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(3)).build()?;

        Ok(Self { endpoint, client })
    }

    fn payload(notification: &BookingNotification) -> Value {
        json!({
            "event": notification.kind.as_str(),
            "business_id": notification.business_id,
            "booking": notification.booking,
        })
    }
}

#[async_trait]
impl NotificationProvider for WebhookNotificationProvider {
    async fn send(&self, notification: &BookingNotification) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&Self::payload(notification))
            .send()
            .await
            .map_err(sanitize_reqwest_error)?;

        if response.status().is_success() {
            return Ok(());
        }

        Err(anyhow!(
            "notification webhook returned non-success status: {}",
            response.status()
        ))
    }

    fn provider_name(&self) -> &'static str {
        "webhook"
    }
}

// Endpoint URLs may carry tokens; keep them out of the error text.
fn sanitize_reqwest_error(error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("notification webhook request timed out");
    }
    if error.is_connect() {
        return anyhow!("notification webhook connection failed");
    }
    anyhow!("notification webhook request failed")
}
