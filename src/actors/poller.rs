//! PollerActor - runs poll cycles on a timer
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick ─┐
//!             ├→ Orchestrator::run_cycle → publish Arc<CycleReport> → [NotifierActor, hub output, ...]
//! PollNow ────┘
//! ```
//!
//! Cycles run inside the actor loop, so ticks that fall due while a cycle is
//! still running are skipped rather than queued.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval, interval_at};
use tracing::{debug, instrument, trace};

use super::messages::{CycleEvent, PollerCommand};
use crate::orchestrator::{CycleError, Orchestrator};

pub struct PollerActor {
    orchestrator: Arc<Orchestrator>,
    command_rx: mpsc::Receiver<PollerCommand>,
    report_tx: broadcast::Sender<CycleEvent>,
    interval_duration: Duration,
}

impl PollerActor {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        interval_duration: Duration,
        command_rx: mpsc::Receiver<PollerCommand>,
        report_tx: broadcast::Sender<CycleEvent>,
    ) -> Self {
        Self {
            orchestrator,
            command_rx,
            report_tx,
            interval_duration,
        }
    }

    /// Run until a Shutdown command arrives or every handle is dropped.
    ///
    /// The first cycle starts immediately.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting poller, interval {:?}", self.interval_duration);

        let mut ticker = interval(self.interval_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.poll().await {
                        debug!("tick skipped: {e}");
                    }
                }

                cmd = self.command_rx.recv() => {
                    let Some(cmd) = cmd else {
                        debug!("all handles dropped, shutting down");
                        break;
                    };

                    match cmd {
                        PollerCommand::PollNow { respond_to } => {
                            debug!("received PollNow command");
                            let _ = respond_to.send(self.poll().await);
                        }

                        PollerCommand::UpdateInterval { interval_secs } => {
                            debug!("updating interval to {interval_secs}s");
                            self.interval_duration = Duration::from_secs(interval_secs.max(1));
                            ticker = restarted(self.interval_duration);
                        }

                        PollerCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }
            }
        }

        debug!("poller stopped");
    }

    async fn poll(&self) -> Result<CycleEvent, CycleError> {
        let report = Arc::new(self.orchestrator.run_cycle().await?);

        match self.report_tx.send(report.clone()) {
            Ok(receivers) => trace!("published cycle {} to {receivers} receivers", report.cycle),
            Err(_) => trace!("no receivers for cycle {}", report.cycle),
        }

        Ok(report)
    }
}

fn restarted(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Handle for controlling a [`PollerActor`]. Cheap to clone.
#[derive(Clone)]
pub struct PollerHandle {
    sender: mpsc::Sender<PollerCommand>,
}

impl PollerHandle {
    pub fn spawn(
        orchestrator: Arc<Orchestrator>,
        interval_duration: Duration,
        report_tx: broadcast::Sender<CycleEvent>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = PollerActor::new(orchestrator, interval_duration, cmd_rx, report_tx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Run a cycle now and wait for its report.
    pub async fn poll_now(&self) -> Result<CycleEvent> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PollerCommand::PollNow { respond_to: tx })
            .await
            .context("failed to send PollNow command")?;

        let report = rx.await.context("failed to receive response")??;
        Ok(report)
    }

    pub async fn update_interval(&self, interval_secs: u64) -> Result<()> {
        self.sender
            .send(PollerCommand::UpdateInterval { interval_secs })
            .await
            .context("failed to send UpdateInterval command")?;
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(PollerCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
