//! Actors driving the hub.
//!
//! Each actor runs as its own tokio task and is controlled through a cloneable
//! handle that sends commands over an mpsc channel.
//!
//! ```text
//!   interval tick / PollNow
//!            │
//!   ┌────────▼────────┐
//!   │   PollerActor   │  runs Orchestrator::run_cycle
//!   └────────┬────────┘
//!            │ broadcast Arc<CycleReport>
//!     ┌──────┴───────────────┐
//!     │                      │
//! ┌───▼───────────┐   ┌──────▼───────┐
//! │ NotifierActor │   │ presentation │  (hub output, tests, ...)
//! └───┬───────────┘   └──────────────┘
//!     │ spawned delivery per alert and sink
//!     ▼
//!  NotificationSink
//! ```
//!
//! Commands are answered through oneshot channels. Reports fan out on a
//! broadcast channel, so a slow subscriber only lags itself.

pub mod messages;
pub mod notifier;
pub mod poller;
