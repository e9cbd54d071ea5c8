pub mod actors;
pub mod alerts;
pub mod config;
pub mod fetcher;
pub mod format;
pub mod monitors;
pub mod notify;
pub mod orchestrator;
pub mod parser;
pub mod probe;
pub mod state;
pub mod storage;
pub mod util;

use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::config::HostConfig;
use crate::parser::ParsedMetrics;

/// Used/total pair in megabytes, with the derived percentage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub used: f64,
    pub total: f64,
    pub percent: f64,
}

impl Usage {
    pub fn new(used: f64, total: f64) -> Self {
        let percent = if total > 0.0 {
            format::round1(used / total * 100.0)
        } else {
            0.0
        };

        Self {
            used,
            total,
            percent,
        }
    }
}

/// Instantaneous network throughput in bytes per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Throughput {
    pub rx_per_sec: f64,
    pub tx_per_sec: f64,
}

/// Online/offline state of a host as observed by the last connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum HostStatus {
    Online,
    Offline {
        /// Last successful connection, `None` if the host was never reached.
        last_seen: Option<DateTime<Utc>>,
        /// Seconds since `last_seen`.
        offline_secs: Option<i64>,
    },
}

impl HostStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, HostStatus::Online)
    }
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostStatus::Online => write!(f, "Online"),
            HostStatus::Offline {
                last_seen: Some(last_seen),
                offline_secs,
            } => write!(
                f,
                "Offline (last seen {}, {} ago)",
                last_seen.with_timezone(&Local).format("%H:%M:%S"),
                format::duration(offline_secs.unwrap_or_default())
            ),
            HostStatus::Offline { .. } => write!(f, "Offline"),
        }
    }
}

/// Metrics of one host for one cycle. Built once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub host_id: String,
    pub host_name: String,
    pub status: HostStatus,
    pub collected_at: DateTime<Utc>,
    pub os: String,
    pub uptime: String,
    pub cpu: f64,
    pub temperature: f64,
    pub load: f64,
    pub memory: Usage,
    pub swap: Usage,
    pub disk: Usage,
    pub rx_total: f64,
    pub tx_total: f64,
    pub throughput: Throughput,
    /// e.g. `"512/2048 MB"`
    pub memory_text: String,
    pub swap_text: String,
    /// e.g. `"12.5/50.0 GB"`
    pub disk_text: String,
    pub net_instant: String,
    pub net_total: String,
}

impl MetricsSnapshot {
    pub fn new(
        host: &HostConfig,
        metrics: ParsedMetrics,
        throughput: Throughput,
        collected_at: DateTime<Utc>,
    ) -> Self {
        let ParsedMetrics {
            cpu,
            temperature,
            load,
            memory,
            swap,
            disk,
            rx_total,
            tx_total,
            os,
            uptime,
        } = metrics;

        Self {
            host_id: host.id.clone(),
            host_name: host.name.clone(),
            status: HostStatus::Online,
            collected_at,
            os,
            uptime,
            cpu,
            temperature,
            load,
            memory,
            swap,
            disk,
            rx_total,
            tx_total,
            throughput,
            memory_text: format!("{}/{} MB", memory.used as i64, memory.total as i64),
            swap_text: format!("{}/{} MB", swap.used as i64, swap.total as i64),
            disk_text: format!(
                "{:.1}/{:.1} GB",
                format::round1(disk.used / 1024.0),
                format::round1(disk.total / 1024.0)
            ),
            net_instant: format!(
                "↓ {} ↑ {}",
                format::speed(throughput.rx_per_sec),
                format::speed(throughput.tx_per_sec)
            ),
            net_total: format!(
                "Total: ↓ {} | ↑ {}",
                format::bytes(rx_total),
                format::bytes(tx_total)
            ),
        }
    }
}

/// Result for a host that could not be reached this cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineRecord {
    pub host_id: String,
    pub host_name: String,
    pub status: HostStatus,
    /// Rendered status line, e.g. `"Offline (last seen 14:03:22, 2m 5s ago)"`.
    pub detail: String,
}

/// Per-host entry of a cycle result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostSnapshot {
    Online(MetricsSnapshot),
    Offline(OfflineRecord),
}

impl HostSnapshot {
    pub fn host_id(&self) -> &str {
        match self {
            HostSnapshot::Online(snapshot) => &snapshot.host_id,
            HostSnapshot::Offline(record) => &record.host_id,
        }
    }

    pub fn status(&self) -> HostStatus {
        match self {
            HostSnapshot::Online(snapshot) => snapshot.status,
            HostSnapshot::Offline(record) => record.status,
        }
    }

    pub fn as_online(&self) -> Option<&MetricsSnapshot> {
        match self {
            HostSnapshot::Online(snapshot) => Some(snapshot),
            HostSnapshot::Offline(_) => None,
        }
    }
}
