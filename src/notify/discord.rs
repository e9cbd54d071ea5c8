use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};

use super::NotificationSink;
use crate::alerts::{AlertEvent, AlertKind};
use crate::config::Discord;

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

const RED: u32 = 15158332;
const ORANGE: u32 = 15105570;

/// Sends alerts to a Discord webhook as an embed.
#[derive(Debug, Clone)]
pub struct DiscordSink {
    client: Client,
    discord: Discord,
}

impl DiscordSink {
    pub fn new(client: Client, discord: Discord) -> Self {
        Self { client, discord }
    }

    /// One embed per alert, plus a mention of the configured user.
    pub fn build_message(&self, alert: &AlertEvent) -> Message {
        Message {
            content: self
                .discord
                .user_id
                .as_ref()
                .map(|user_id| format!("🚨 {} <@{user_id}>", alert.host_name)),
            embeds: vec![build_embed(alert)],
        }
    }
}

fn build_embed(alert: &AlertEvent) -> Embed {
    let (title, color, current, value, limit, limit_text) = match alert.kind {
        AlertKind::Cpu { value, limit } => (
            "💻 CPU Usage Alert",
            ORANGE,
            format!("{value:.1}%"),
            value,
            limit,
            format!("{limit}%"),
        ),
        AlertKind::Ram { value, limit } => (
            "🧠 Memory Alert",
            ORANGE,
            format!("{value:.1}%"),
            value,
            limit,
            format!("{limit}%"),
        ),
        AlertKind::Disk { value, limit } => (
            "💾 Disk Alert",
            ORANGE,
            format!("{value:.1}%"),
            value,
            limit,
            format!("{limit}%"),
        ),
        AlertKind::Temperature { value, limit } => (
            "🔥 Temperature Alert",
            RED,
            format!("{value:.1}°C"),
            value,
            limit,
            format!("{limit}°C"),
        ),
        AlertKind::Offline { seconds, limit } => (
            "🔴 Host Offline",
            RED,
            format!("{seconds}s"),
            seconds as f64,
            limit as f64,
            format!("{limit}s"),
        ),
    };

    Embed {
        title: Some(title.to_string()),
        description: Some(format!("**{}**: {}", alert.host_name, alert.message)),
        color: Some(color),
        fields: vec![
            EmbedField {
                name: "Current".to_string(),
                value: current,
                inline: true,
            },
            EmbedField {
                name: "⚠️ Limit".to_string(),
                value: limit_text,
                inline: true,
            },
            EmbedField {
                name: "📊 Status".to_string(),
                value: progress_bar(value, limit),
                inline: false,
            },
        ],
        timestamp: Some(alert.timestamp.to_rfc3339()),
    }
}

fn progress_bar(current: f64, limit: f64) -> String {
    if limit <= 0.0 {
        return "🔴 limit is zero".to_string();
    }

    let ratio = current / limit;
    let filled = ((ratio * 10.0) as usize).min(10);
    let bar = "█".repeat(filled) + &"░".repeat(10 - filled);

    format!("🔴 `{}` {:.1}% of limit", bar, ratio * 100.0)
}

#[async_trait]
impl NotificationSink for DiscordSink {
    fn name(&self) -> &'static str {
        "discord"
    }

    #[instrument(skip_all, fields(host = %alert.host_id))]
    async fn notify(&self, alert: &AlertEvent) -> anyhow::Result<()> {
        let message = self.build_message(alert);

        let response = self
            .client
            .post(&self.discord.url)
            .json(&message)
            .send()
            .await
            .context("failed to send Discord message")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Discord message failed with status {status}: {body}");
        }

        debug!("sent Discord message");
        Ok(())
    }
}
