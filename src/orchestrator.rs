//! Poll cycle orchestration.
//!
//! A cycle loads the host list, fans out one worker per host on a bounded
//! pool and runs fetch, parse, rate, presence and alert evaluation for each.
//! Hosts are independent: a host that hangs only costs its own timeouts and
//! one pool slot.
//!
//! ```text
//! load hosts → dedupe → [worker per host] → CycleReport { hosts, alerts }
//!                          │
//!                          fetch → parse → rates → presence → alerts
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::{self, JoinSet};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::alerts::{self, AlertEvent};
use crate::config::HostConfig;
use crate::fetcher::{ConnectionFailure, FailureReason, MetricsFetcher};
use crate::monitors::presence::PresenceTracker;
use crate::monitors::rates::RateCalculator;
use crate::state::StateStore;
use crate::storage::HostStore;
use crate::{HostSnapshot, MetricsSnapshot, OfflineRecord, parser};

pub const MAX_WORKERS: usize = 15;

/// Worker count for a cycle over `host_count` hosts: one more than the
/// number of hosts, capped, and never zero.
pub fn pool_size(host_count: usize, cap: usize) -> usize {
    (host_count + 1).min(cap).max(1)
}

/// Everything one cycle produced.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Per-host result keyed by host id
    pub hosts: HashMap<String, HostSnapshot>,
    pub alerts: Vec<AlertEvent>,
}

impl CycleReport {
    pub fn online_count(&self) -> usize {
        self.hosts
            .values()
            .filter(|snapshot| snapshot.status().is_online())
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleError {
    /// A cycle was requested while another one was still running
    AlreadyRunning,
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleError::AlreadyRunning => write!(f, "a poll cycle is already running"),
        }
    }
}

impl std::error::Error for CycleError {}

pub struct Orchestrator {
    store: Arc<dyn HostStore>,
    fetcher: Arc<dyn MetricsFetcher>,
    state: Arc<StateStore>,
    max_workers: usize,
    /// Held for the duration of a cycle
    running: Mutex<()>,
    cycles: AtomicU64,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn HostStore>, fetcher: Arc<dyn MetricsFetcher>) -> Self {
        Self {
            store,
            fetcher,
            state: Arc::new(StateStore::new()),
            max_workers: MAX_WORKERS,
            running: Mutex::new(()),
            cycles: AtomicU64::new(0),
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    /// Run one poll cycle over every configured host.
    ///
    /// Returns [`CycleError::AlreadyRunning`] without doing anything when
    /// another cycle holds the single-flight guard.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        let Ok(_guard) = self.running.try_lock() else {
            debug!("previous cycle still running, skipping");
            return Err(CycleError::AlreadyRunning);
        };

        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let started_at = Utc::now();

        // state is only pruned against a host list that actually loaded
        let hosts = match self.store.load().await {
            Ok(hosts) => {
                let hosts = unique_hosts(hosts);
                self.state
                    .retain_hosts(&hosts.iter().map(|host| host.id.as_str()).collect());
                hosts
            }
            Err(e) => {
                error!("failed to load hosts, polling none this cycle: {e}");
                Vec::new()
            }
        };

        let workers = pool_size(hosts.len(), self.max_workers);
        trace!("cycle {cycle}: {} host(s), {workers} worker(s)", hosts.len());

        let permits = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();
        let mut in_flight: HashMap<task::Id, HostConfig> = HashMap::new();

        for host in hosts {
            let permits = permits.clone();
            let fetcher = self.fetcher.clone();
            let state = self.state.clone();
            let worker_host = host.clone();

            let handle = tasks.spawn(async move {
                // the semaphore is never closed
                let _permit = permits.acquire_owned().await.ok();
                poll_host(fetcher.as_ref(), &state, &worker_host).await
            });
            in_flight.insert(handle.id(), host);
        }

        let mut report = CycleReport {
            cycle,
            started_at,
            finished_at: started_at,
            hosts: HashMap::new(),
            alerts: Vec::new(),
        };

        while let Some(joined) = tasks.join_next_with_id().await {
            let (snapshot, alerts) = match joined {
                Ok((id, result)) => {
                    in_flight.remove(&id);
                    result
                }
                Err(e) => {
                    let Some(host) = in_flight.remove(&e.id()) else {
                        error!("poll worker failed: {e}");
                        continue;
                    };
                    error!("poll worker for {} failed: {e}", host.id);
                    let failure = ConnectionFailure::new(FailureReason::Exec, &e);
                    process_fetch(&self.state, &host, Err(failure), Utc::now())
                }
            };

            report.alerts.extend(alerts);
            report
                .hosts
                .insert(snapshot.host_id().to_string(), snapshot);
        }

        report.finished_at = Utc::now();
        info!(
            "cycle {cycle} done: {}/{} online, {} alert(s) in {}ms",
            report.online_count(),
            report.hosts.len(),
            report.alerts.len(),
            (report.finished_at - started_at).num_milliseconds()
        );

        Ok(report)
    }
}

/// Drop records whose id was already seen, keeping the first one.
fn unique_hosts(hosts: Vec<HostConfig>) -> Vec<HostConfig> {
    let mut seen = HashSet::new();
    hosts
        .into_iter()
        .filter(|host| {
            let fresh = seen.insert(host.id.clone());
            if !fresh {
                warn!("duplicate host id {}, ignoring {}", host.id, host.display_name());
            }
            fresh
        })
        .collect()
}

#[instrument(skip_all, fields(host = %host.id))]
async fn poll_host(
    fetcher: &dyn MetricsFetcher,
    state: &StateStore,
    host: &HostConfig,
) -> (HostSnapshot, Vec<AlertEvent>) {
    let result = fetcher.fetch(host).await;
    process_fetch(state, host, result, Utc::now())
}

/// Turn the outcome of one fetch into the host's cycle result and alerts.
pub fn process_fetch(
    state: &StateStore,
    host: &HostConfig,
    result: Result<String, ConnectionFailure>,
    now: DateTime<Utc>,
) -> (HostSnapshot, Vec<AlertEvent>) {
    match result {
        Ok(raw) => {
            let metrics = parser::parse(&raw);
            let throughput =
                RateCalculator::new(state).sample(&host.id, metrics.rx_total, metrics.tx_total, now);
            PresenceTracker::new(state).record_success(&host.id, now);

            let snapshot = MetricsSnapshot::new(host, metrics, throughput, now);
            let alerts = alerts::evaluate_metrics(host, &snapshot);
            (HostSnapshot::Online(snapshot), alerts)
        }
        Err(failure) => {
            debug!("{} unreachable: {failure}", host.id);

            let report = PresenceTracker::new(state).record_failure(host, now);
            let alerts = report
                .offline_condition
                .and_then(|elapsed| alerts::evaluate_offline(host, elapsed, now))
                .into_iter()
                .collect();

            let record = OfflineRecord {
                host_id: host.id.clone(),
                host_name: host.name.clone(),
                status: report.status,
                detail: report.status.to_string(),
            };
            (HostSnapshot::Offline(record), alerts)
        }
    }
}
