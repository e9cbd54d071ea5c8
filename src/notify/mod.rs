//! Notification sinks for alert events.
//!
//! The notifier actor spawns every delivery and only logs failures, so a
//! broken sink never holds up a poll cycle. HTTP sinks share one client whose
//! requests give up after [`SINK_TIMEOUT`].

pub mod discord;
pub mod webhook;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::alerts::AlertEvent;
use crate::config::NotifierConfig;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn notify(&self, alert: &AlertEvent) -> anyhow::Result<()>;
}

/// Writes alerts to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn notify(&self, alert: &AlertEvent) -> anyhow::Result<()> {
        warn!(host = %alert.host_id, "ALERT {}: {}", alert.host_name, alert.message);
        Ok(())
    }
}

pub const SINK_TIMEOUT: Duration = Duration::from_secs(10);

pub fn build_sinks(configs: &[NotifierConfig]) -> Vec<Arc<dyn NotificationSink>> {
    let client = reqwest::Client::builder()
        .timeout(SINK_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            warn!("failed to build HTTP client, sending without a timeout: {e}");
            reqwest::Client::new()
        });

    configs
        .iter()
        .map(|config| -> Arc<dyn NotificationSink> {
            match config {
                NotifierConfig::Log => Arc::new(LogSink),
                NotifierConfig::Webhook(webhook) => {
                    Arc::new(webhook::WebhookSink::new(client.clone(), webhook.clone()))
                }
                NotifierConfig::Discord(discord) => {
                    Arc::new(discord::DiscordSink::new(client.clone(), discord.clone()))
                }
            }
        })
        .collect()
}
