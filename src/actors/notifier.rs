//! NotifierActor - hands cycle alerts to the notification sinks
//!
//! Every alert of every report goes to every sink. Deliveries run on their
//! own tasks, so a slow or failing sink cannot delay the next report, let
//! alone the next poll cycle. On shutdown the actor waits up to
//! [`DRAIN_TIMEOUT`] for deliveries still in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, error, instrument, trace, warn};

use super::messages::{CycleEvent, NotifierCommand, NotifierStats};
use crate::alerts::AlertEvent;
use crate::notify::NotificationSink;

pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Default)]
struct Counters {
    reports: AtomicU64,
    dispatched: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> NotifierStats {
        NotifierStats {
            reports: self.reports.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

pub struct NotifierActor {
    sinks: Vec<Arc<dyn NotificationSink>>,
    command_rx: mpsc::Receiver<NotifierCommand>,
    report_rx: broadcast::Receiver<CycleEvent>,
    counters: Arc<Counters>,
    deliveries: JoinSet<()>,
}

impl NotifierActor {
    pub fn new(
        sinks: Vec<Arc<dyn NotificationSink>>,
        command_rx: mpsc::Receiver<NotifierCommand>,
        report_rx: broadcast::Receiver<CycleEvent>,
    ) -> Self {
        Self {
            sinks,
            command_rx,
            report_rx,
            counters: Arc::new(Counters::default()),
            deliveries: JoinSet::new(),
        }
    }

    #[instrument(skip(self), fields(sinks = self.sinks.len()))]
    pub async fn run(mut self) {
        debug!("starting notifier");

        let mut shutdown_ack = None;

        loop {
            tokio::select! {
                // reports already published are handled before a shutdown
                biased;

                result = self.report_rx.recv() => {
                    match result {
                        Ok(report) => self.handle_report(&report),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("notifier lagged, skipped {skipped} cycle report(s)");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("report channel closed, shutting down");
                            break;
                        }
                    }
                }

                Some(_) = self.deliveries.join_next(), if !self.deliveries.is_empty() => {}

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(NotifierCommand::GetStats { respond_to }) => {
                            let _ = respond_to.send(self.counters.snapshot());
                        }
                        Some(NotifierCommand::Shutdown { respond_to }) => {
                            debug!("received shutdown command");
                            shutdown_ack = Some(respond_to);
                            break;
                        }
                        None => {
                            debug!("all handles dropped, shutting down");
                            break;
                        }
                    }
                }
            }
        }

        self.drain().await;
        if let Some(respond_to) = shutdown_ack {
            let _ = respond_to.send(self.counters.snapshot());
        }

        debug!("notifier stopped");
    }

    async fn drain(&mut self) {
        if self.deliveries.is_empty() {
            return;
        }
        debug!("waiting for {} delivery task(s)", self.deliveries.len());

        let deliveries = &mut self.deliveries;
        let finished = tokio::time::timeout(DRAIN_TIMEOUT, async {
            while deliveries.join_next().await.is_some() {}
        })
        .await;

        if finished.is_err() {
            warn!(
                "abandoning {} delivery task(s) after {DRAIN_TIMEOUT:?}",
                self.deliveries.len()
            );
            self.deliveries.shutdown().await;
        }
    }

    fn handle_report(&mut self, report: &CycleEvent) {
        self.counters.reports.fetch_add(1, Ordering::Relaxed);
        trace!("cycle {}: {} alert(s)", report.cycle, report.alerts.len());

        if self.sinks.is_empty() {
            return;
        }

        for alert in &report.alerts {
            self.dispatch(alert.clone());
        }
    }

    /// Deliver one alert to all sinks concurrently on its own task.
    fn dispatch(&mut self, alert: AlertEvent) {
        self.counters
            .dispatched
            .fetch_add(self.sinks.len() as u64, Ordering::Relaxed);
        let sinks = self.sinks.clone();
        let counters = self.counters.clone();

        self.deliveries.spawn(async move {
            let results = join_all(sinks.iter().map(|sink| sink.notify(&alert))).await;

            for (sink, result) in sinks.iter().zip(results) {
                if let Err(e) = result {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    error!(
                        "{} sink failed to deliver alert for {}: {e:#}",
                        sink.name(),
                        alert.host_id
                    );
                }
            }
        });
    }
}

#[derive(Clone)]
pub struct NotifierHandle {
    sender: mpsc::Sender<NotifierCommand>,
}

impl NotifierHandle {
    pub fn spawn(
        sinks: Vec<Arc<dyn NotificationSink>>,
        report_rx: broadcast::Receiver<CycleEvent>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        tokio::spawn(NotifierActor::new(sinks, cmd_rx, report_rx).run());

        Self { sender: cmd_tx }
    }

    pub async fn stats(&self) -> Result<NotifierStats> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(NotifierCommand::GetStats { respond_to: tx })
            .await
            .context("failed to send GetStats command")?;

        rx.await.context("failed to receive response")
    }

    /// Stop the actor once pending deliveries are done and return the final
    /// counters.
    pub async fn shutdown(&self) -> Result<NotifierStats> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(NotifierCommand::Shutdown { respond_to: tx })
            .await
            .context("failed to send Shutdown command")?;

        rx.await.context("failed to receive response")
    }
}
