use chrono::{DateTime, Utc};
use tracing::trace;

use crate::Throughput;
use crate::state::{NetCounterState, StateStore};

/// Derives per-second throughput from cumulative rx/tx byte counters.
#[derive(Debug, Clone, Copy)]
pub struct RateCalculator<'a> {
    state: &'a StateStore,
}

impl<'a> RateCalculator<'a> {
    pub fn new(state: &'a StateStore) -> Self {
        Self { state }
    }

    /// Record a counter sample for `host_id` and return the rate since the
    /// previous sample.
    ///
    /// - first sample: zero rate, the sample becomes the baseline
    /// - non-positive elapsed time: zero rate, the baseline is kept
    /// - a counter that went backwards (reboot, wrap) yields zero for that
    ///   direction
    pub fn sample(
        &self,
        host_id: &str,
        rx_total: f64,
        tx_total: f64,
        now: DateTime<Utc>,
    ) -> Throughput {
        let current = NetCounterState {
            rx_total,
            tx_total,
            observed_at: now,
        };

        self.state.with_net_counters(|counters| {
            let Some(previous) = counters.get(host_id).copied() else {
                trace!("{host_id}: first counter sample, seeding baseline");
                counters.insert(host_id.to_string(), current);
                return Throughput::default();
            };

            let elapsed = (now - previous.observed_at).num_milliseconds() as f64 / 1000.0;
            if elapsed <= 0.0 {
                trace!("{host_id}: non-positive elapsed time ({elapsed}s), keeping baseline");
                return Throughput::default();
            }

            counters.insert(host_id.to_string(), current);

            Throughput {
                rx_per_sec: rate(previous.rx_total, rx_total, elapsed),
                tx_per_sec: rate(previous.tx_total, tx_total, elapsed),
            }
        })
    }
}

fn rate(previous: f64, current: f64, elapsed: f64) -> f64 {
    (current - previous).max(0.0) / elapsed
}
