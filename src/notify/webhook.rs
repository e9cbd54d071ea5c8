use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, instrument};

use super::NotificationSink;
use crate::alerts::AlertEvent;
use crate::config::Webhook;

/// Posts `{message, host, host_id, kind, timestamp}` as JSON.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: Client,
    webhook: Webhook,
}

impl WebhookSink {
    pub fn new(client: Client, webhook: Webhook) -> Self {
        Self { client, webhook }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    fn name(&self) -> &'static str {
        "webhook"
    }

    #[instrument(skip_all, fields(host = %alert.host_id))]
    async fn notify(&self, alert: &AlertEvent) -> anyhow::Result<()> {
        let payload = json!({
            "message": alert.message,
            "host": alert.host_name,
            "host_id": alert.host_id,
            "kind": alert.kind,
            "timestamp": alert.timestamp.to_rfc3339(),
        });

        let response = self
            .client
            .post(&self.webhook.url)
            .json(&payload)
            .send()
            .await
            .context("failed to send webhook alert")?;

        if !response.status().is_success() {
            anyhow::bail!("webhook alert failed with status: {}", response.status());
        }

        debug!("sent webhook alert");
        Ok(())
    }
}
