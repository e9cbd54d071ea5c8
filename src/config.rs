use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::trace;

pub const DEFAULT_SSH_PORT: u16 = 22;

const DEFAULT_CPU_LIMIT: f64 = 90.0;
const DEFAULT_TEMP_LIMIT: f64 = 75.0;
const DEFAULT_RAM_LIMIT: f64 = 85.0;
const DEFAULT_DISK_LIMIT: f64 = 90.0;
const DEFAULT_OFFLINE_SECS: u64 = 30;

/// Per-host alert ceilings.
///
/// Missing or `null` fields in a stored record fall back to the defaults, so
/// legacy records that only carry some of the limits still load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredThresholds")]
pub struct AlertThresholds {
    pub cpu: f64,
    pub temp: f64,
    pub ram: f64,
    pub disk: f64,
    #[serde(rename = "offline_sec")]
    pub offline_seconds: u64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            cpu: DEFAULT_CPU_LIMIT,
            temp: DEFAULT_TEMP_LIMIT,
            ram: DEFAULT_RAM_LIMIT,
            disk: DEFAULT_DISK_LIMIT,
            offline_seconds: DEFAULT_OFFLINE_SECS,
        }
    }
}

#[derive(Deserialize)]
struct StoredThresholds {
    cpu: Option<f64>,
    temp: Option<f64>,
    ram: Option<f64>,
    disk: Option<f64>,
    #[serde(alias = "offline_seconds")]
    offline_sec: Option<f64>,
}

impl From<StoredThresholds> for AlertThresholds {
    fn from(stored: StoredThresholds) -> Self {
        let defaults = AlertThresholds::default();
        Self {
            cpu: stored.cpu.unwrap_or(defaults.cpu),
            temp: stored.temp.unwrap_or(defaults.temp),
            ram: stored.ram.unwrap_or(defaults.ram),
            disk: stored.disk.unwrap_or(defaults.disk),
            offline_seconds: stored
                .offline_sec
                .filter(|secs| secs.is_finite())
                .map_or(defaults.offline_seconds, |secs| secs.max(0.0).round() as u64),
        }
    }
}

/// A monitored host as stored in the host file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(rename = "ip")]
    pub address: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(rename = "ssh_key", default, deserialize_with = "non_empty_path")]
    pub key_path: Option<PathBuf>,
    #[serde(rename = "alerts", default, deserialize_with = "thresholds_or_default")]
    pub thresholds: AlertThresholds,
}

impl HostConfig {
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            format!("{}:{}", self.address, self.port)
        } else {
            self.name.clone()
        }
    }
}

fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}

fn non_empty_path<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let path = Option::<String>::deserialize(deserializer)?;
    Ok(path
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .map(PathBuf::from))
}

fn thresholds_or_default<'de, D>(deserializer: D) -> Result<AlertThresholds, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<AlertThresholds>::deserialize(deserializer)?.unwrap_or_default())
}

/// Where an alert event should be delivered.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifierConfig {
    /// Emit the alert as a tracing event.
    Log,
    Webhook(Webhook),
    Discord(Discord),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Webhook {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Discord {
    pub url: String,
    pub user_id: Option<String>,
}

/// Settings of the polling hub.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HubConfig {
    /// JSON file holding the host records
    #[serde(default = "default_hosts_file")]
    pub hosts_file: PathBuf,

    /// Seconds between two poll cycles (default: 10)
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Upper bound of concurrent SSH sessions per cycle (default: 15)
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,

    /// Budget for running the probe bundle once authenticated
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Key used for hosts without a configured key
    pub default_key: Option<PathBuf>,

    #[serde(default = "default_notifiers")]
    pub notifiers: Vec<NotifierConfig>,
}

fn default_hosts_file() -> PathBuf {
    PathBuf::from("servers.json")
}

fn default_interval() -> u64 {
    10
}

fn default_max_workers() -> usize {
    15
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_handshake_timeout() -> u64 {
    10
}

fn default_command_timeout() -> u64 {
    15
}

fn default_notifiers() -> Vec<NotifierConfig> {
    vec![NotifierConfig::Log]
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            hosts_file: default_hosts_file(),
            interval_secs: default_interval(),
            max_workers: default_max_workers(),
            connect_timeout_secs: default_connect_timeout(),
            handshake_timeout_secs: default_handshake_timeout(),
            command_timeout_secs: default_command_timeout(),
            default_key: None,
            notifiers: default_notifiers(),
        }
    }
}

impl HubConfig {
    /// Load the hub settings from `path`, from `~/.config/arccat/hub.toml` if
    /// that exists, or fall back to the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = path.map(|p| p.to_path_buf()).or_else(|| {
            let home = dirs::home_dir()?;
            let default_path = home.join(".config/arccat/hub.toml");
            default_path.exists().then_some(default_path)
        });

        let Some(path) = config_path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str::<Self>(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
            .inspect(|config| trace!("loaded config: {config:?}"))
    }
}
