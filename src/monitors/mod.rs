//! Stateful per-host monitors fed by every fetch result.
//!
//! - [`rates::RateCalculator`] turns cumulative network counters into throughput
//! - [`presence::PresenceTracker`] turns connection outcomes into online/offline status

pub mod presence;
pub mod rates;
