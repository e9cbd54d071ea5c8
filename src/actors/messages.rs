//! Message types exchanged with the actors.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::orchestrator::{CycleError, CycleReport};

/// Report of one finished cycle, shared by every subscriber.
pub type CycleEvent = Arc<CycleReport>;

/// Commands that can be sent to the [`PollerActor`](super::poller::PollerActor)
#[derive(Debug)]
pub enum PollerCommand {
    /// Run a cycle right away instead of waiting for the next tick
    ///
    /// The report is published like any other and also returned here.
    PollNow {
        respond_to: oneshot::Sender<Result<CycleEvent, CycleError>>,
    },

    /// Change the tick period. The schedule restarts from now.
    UpdateInterval { interval_secs: u64 },

    /// Stop after the cycle in progress, if any
    Shutdown,
}

/// Delivery counters of the notifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifierStats {
    pub reports: u64,
    /// Alert deliveries handed to sinks (one alert × one sink each)
    pub dispatched: u64,
    pub failed: u64,
}

/// Commands that can be sent to the [`NotifierActor`](super::notifier::NotifierActor)
#[derive(Debug)]
pub enum NotifierCommand {
    GetStats {
        respond_to: oneshot::Sender<NotifierStats>,
    },

    /// Stop taking reports, wait for deliveries in flight, then answer with
    /// the final counters
    Shutdown {
        respond_to: oneshot::Sender<NotifierStats>,
    },
}
