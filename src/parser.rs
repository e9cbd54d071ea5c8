//! Turns the raw probe output of one host into typed metrics.
//!
//! Parsing never fails. A missing key, a missing sub-field or a value that is
//! not a number degrades to `0` for that field alone.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{Usage, format::round1, probe};

const DEFAULT_OS: &str = "Linux";
const DEFAULT_UPTIME: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedMetrics {
    /// Busy CPU in percent
    pub cpu: f64,
    /// Degrees celsius, one decimal
    pub temperature: f64,
    /// One minute load average
    pub load: f64,
    pub memory: Usage,
    pub swap: Usage,
    pub disk: Usage,
    /// Cumulative received bytes
    pub rx_total: f64,
    /// Cumulative transmitted bytes
    pub tx_total: f64,
    pub os: String,
    pub uptime: String,
}

impl Default for ParsedMetrics {
    fn default() -> Self {
        parse("")
    }
}

/// Split `KEY:value` lines on the first colon. Lines without a colon are
/// skipped; a repeated key keeps its last value.
pub fn parse_records(raw: &str) -> HashMap<&str, &str> {
    raw.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect()
}

pub fn parse(raw: &str) -> ParsedMetrics {
    let records = parse_records(raw);
    trace!("parsed {} probe records", records.len());

    let memory = usage(&records, probe::MEMORY);
    let swap = usage(&records, probe::SWAP);
    let disk = usage(&records, probe::DISK);

    ParsedMetrics {
        cpu: cpu(&records),
        temperature: temperature(&records),
        load: field(&records, probe::LOAD, 0),
        memory,
        swap,
        disk,
        rx_total: field(&records, probe::NETWORK, 0),
        tx_total: field(&records, probe::NETWORK, 1),
        os: text(&records, probe::OS, DEFAULT_OS),
        uptime: text(&records, probe::UPTIME, DEFAULT_UPTIME),
    }
}

fn number(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// The `index`-th whitespace separated number of `key`, or `0`.
fn field(records: &HashMap<&str, &str>, key: &str, index: usize) -> f64 {
    records
        .get(key)
        .and_then(|value| value.split_whitespace().nth(index))
        .and_then(number)
        .unwrap_or(0.0)
}

fn cpu(records: &HashMap<&str, &str>) -> f64 {
    records
        .get(probe::CPU)
        .and_then(|value| value.split_whitespace().next())
        .and_then(|first| number(&first.replace(',', ".")))
        .unwrap_or(0.0)
}

fn temperature(records: &HashMap<&str, &str>) -> f64 {
    let Some(raw) = records.get(probe::TEMPERATURE) else {
        return 0.0;
    };

    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return 0.0;
    }

    raw.parse::<u64>()
        .map(|millis| round1(millis as f64 / 1000.0))
        .unwrap_or(0.0)
}

/// `KEY:total used` → usage with percentage.
fn usage(records: &HashMap<&str, &str>, key: &str) -> Usage {
    let total = field(records, key, 0);
    let used = field(records, key, 1);
    Usage::new(used, total)
}

fn text(records: &HashMap<&str, &str>, key: &str, fallback: &str) -> String {
    records
        .get(key)
        .filter(|value| !value.is_empty())
        .map_or_else(|| fallback.to_string(), |value| value.to_string())
}
