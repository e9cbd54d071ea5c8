//! Threshold evaluation.
//!
//! Evaluation is a pure function of one cycle's result and the host's
//! thresholds. Every rule is a strict greater-than comparison, and there is
//! no memory between cycles: a condition that holds for ten cycles raises ten
//! alerts.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::monitors::presence::exceeds_grace;
use crate::{MetricsSnapshot, config::HostConfig, format};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertKind {
    Cpu { value: f64, limit: f64 },
    Ram { value: f64, limit: f64 },
    Disk { value: f64, limit: f64 },
    Temperature { value: f64, limit: f64 },
    Offline { seconds: i64, limit: u64 },
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::Cpu { value, limit } => write!(f, "CPU: {value}% (limit {limit}%)"),
            AlertKind::Ram { value, limit } => write!(f, "RAM: {value}% (limit {limit}%)"),
            AlertKind::Disk { value, limit } => write!(f, "Disk: {value}% (limit {limit}%)"),
            AlertKind::Temperature { value, limit } => {
                write!(f, "Temperature: {value}°C (limit {limit}°C)")
            }
            AlertKind::Offline { seconds, limit } => write!(
                f,
                "OFFLINE for {} (limit {limit}s)",
                format::duration(*seconds)
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub host_id: String,
    pub host_name: String,
    pub kind: AlertKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl AlertEvent {
    fn new(host: &HostConfig, kind: AlertKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            host_id: host.id.clone(),
            host_name: host.display_name(),
            message: kind.to_string(),
            kind,
            timestamp,
        }
    }
}

/// Check CPU, RAM, disk and temperature of a collected snapshot.
pub fn evaluate_metrics(host: &HostConfig, snapshot: &MetricsSnapshot) -> Vec<AlertEvent> {
    let limits = &host.thresholds;

    let candidates: [(f64, f64, fn(f64, f64) -> AlertKind); 4] = [
        (snapshot.cpu, limits.cpu, |value, limit| {
            AlertKind::Cpu { value, limit }
        }),
        (snapshot.memory.percent, limits.ram, |value, limit| {
            AlertKind::Ram { value, limit }
        }),
        (snapshot.disk.percent, limits.disk, |value, limit| {
            AlertKind::Disk { value, limit }
        }),
        (snapshot.temperature, limits.temp, |value, limit| {
            AlertKind::Temperature { value, limit }
        }),
    ];

    let alerts: Vec<_> = candidates
        .into_iter()
        .filter(|(value, limit, _)| exceeds(*value, *limit))
        .map(|(value, limit, kind)| AlertEvent::new(host, kind(value, limit), snapshot.collected_at))
        .collect();

    trace!("{}: {} threshold alert(s)", host.id, alerts.len());
    alerts
}

/// Check how long a host has been unreachable. The alert carries whole
/// seconds, the comparison does not.
pub fn evaluate_offline(
    host: &HostConfig,
    elapsed: TimeDelta,
    now: DateTime<Utc>,
) -> Option<AlertEvent> {
    let limit = host.thresholds.offline_seconds;
    exceeds_grace(elapsed, limit).then(|| {
        AlertEvent::new(
            host,
            AlertKind::Offline {
                seconds: elapsed.num_seconds(),
                limit,
            },
            now,
        )
    })
}

fn exceeds(value: f64, limit: f64) -> bool {
    value > limit
}
