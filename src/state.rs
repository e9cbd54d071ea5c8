//! Cross-cycle per-host state.
//!
//! The store is owned by the orchestrator and handed by reference to the rate
//! calculator and the presence tracker. Workers of one cycle touch it
//! concurrently for different hosts, so each map sits behind its own mutex.
//! Nothing here is persisted; a restart starts from empty maps.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

/// Last cumulative network counters seen for a host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetCounterState {
    pub rx_total: f64,
    pub tx_total: f64,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct StateStore {
    net_counters: Mutex<HashMap<String, NetCounterState>>,
    last_seen: Mutex<HashMap<String, DateTime<Utc>>>,
}

// The maps stay consistent even if a holder panicked; every update is a
// single insert.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn net_counters(&self, host_id: &str) -> Option<NetCounterState> {
        lock(&self.net_counters).get(host_id).copied()
    }

    pub fn last_seen(&self, host_id: &str) -> Option<DateTime<Utc>> {
        lock(&self.last_seen).get(host_id).copied()
    }

    /// Run `f` with the counter map locked, so a read-modify-write for one
    /// host is atomic.
    pub(crate) fn with_net_counters<R>(
        &self,
        f: impl FnOnce(&mut HashMap<String, NetCounterState>) -> R,
    ) -> R {
        f(&mut lock(&self.net_counters))
    }

    pub(crate) fn set_last_seen(&self, host_id: &str, at: DateTime<Utc>) {
        lock(&self.last_seen).insert(host_id.to_string(), at);
    }

    /// Drop the state of hosts that are no longer configured.
    pub fn retain_hosts(&self, host_ids: &HashSet<&str>) {
        lock(&self.net_counters).retain(|id, _| host_ids.contains(id.as_str()));
        lock(&self.last_seen).retain(|id, _| host_ids.contains(id.as_str()));
    }
}
