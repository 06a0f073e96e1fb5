use std::time::Duration;

use engine_logging::engine_info;
use pagewatch_core::Notification;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery request failed: {0}")]
    Transport(String),
    #[error("endpoint answered with status {0}")]
    Status(u16),
    #[error("failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Where change reports go. Failures are reported back, never retried here.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, subscriber: &str, notification: &Notification)
        -> Result<(), DeliveryError>;
}

/// Writes each notification to the log. Useful for dry runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait::async_trait]
impl NotificationSink for LogSink {
    async fn send(
        &self,
        subscriber: &str,
        notification: &Notification,
    ) -> Result<(), DeliveryError> {
        engine_info!("Notify {}:\n{}", subscriber, notification.text());
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    subscriber: &'a str,
    url: &'a str,
    category: &'a str,
    text: String,
}

/// POSTs each notification as JSON to a fixed endpoint.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait::async_trait]
impl NotificationSink for WebhookSink {
    async fn send(
        &self,
        subscriber: &str,
        notification: &Notification,
    ) -> Result<(), DeliveryError> {
        let payload = WebhookPayload {
            subscriber,
            url: &notification.url,
            category: notification.category.label(),
            text: notification.text(),
        };
        let body = serde_json::to_vec(&payload)?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|err| DeliveryError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }
        Ok(())
    }
}
