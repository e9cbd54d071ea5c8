use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::HostStatus;
use crate::config::HostConfig;
use crate::state::StateStore;

/// Outcome of a failed connection as seen by the presence tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OfflineReport {
    pub status: HostStatus,
    /// Time since last seen, set when it is longer than the grace period.
    pub offline_condition: Option<TimeDelta>,
}

/// Maps connection outcomes to online/offline status.
#[derive(Debug, Clone, Copy)]
pub struct PresenceTracker<'a> {
    state: &'a StateStore,
}

impl<'a> PresenceTracker<'a> {
    pub fn new(state: &'a StateStore) -> Self {
        Self { state }
    }

    pub fn record_success(&self, host_id: &str, now: DateTime<Utc>) -> HostStatus {
        self.state.set_last_seen(host_id, now);
        HostStatus::Online
    }

    /// A host that was never reached is plainly offline and never raises the
    /// offline alert.
    pub fn record_failure(&self, host: &HostConfig, now: DateTime<Utc>) -> OfflineReport {
        let Some(last_seen) = self.state.last_seen(&host.id) else {
            return OfflineReport {
                status: HostStatus::Offline {
                    last_seen: None,
                    offline_secs: None,
                },
                offline_condition: None,
            };
        };

        let elapsed = (now - last_seen).max(TimeDelta::zero());
        let offline_secs = elapsed.num_seconds();
        let exceeded = exceeds_grace(elapsed, host.thresholds.offline_seconds);
        if exceeded {
            debug!(
                "{}: offline for {offline_secs}s (grace {}s)",
                host.id, host.thresholds.offline_seconds
            );
        }

        OfflineReport {
            status: HostStatus::Offline {
                last_seen: Some(last_seen),
                offline_secs: Some(offline_secs),
            },
            offline_condition: exceeded.then_some(elapsed),
        }
    }
}

/// Strict comparison at millisecond precision, so 30.9 s is past a 30 s grace.
pub fn exceeds_grace(elapsed: TimeDelta, grace_secs: u64) -> bool {
    i128::from(elapsed.num_milliseconds()) > i128::from(grace_secs) * 1000
}
