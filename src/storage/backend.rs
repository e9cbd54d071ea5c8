//! Host store trait definition

use async_trait::async_trait;

use super::error::StorageResult;
use crate::config::HostConfig;

/// Durable collection of host records.
///
/// The store is always read and written as a whole. Readers get a snapshot
/// of the full list; writers replace the full list.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync` as the orchestrator loads hosts from
/// a spawned task while the catalog may write from another.
#[async_trait]
pub trait HostStore: Send + Sync {
    /// Load every host record.
    ///
    /// Records without alert thresholds come back with the defaults filled in.
    async fn load(&self) -> StorageResult<Vec<HostConfig>>;

    /// Replace the stored list with `hosts`.
    ///
    /// Either the full list is written or the previous content stays intact.
    async fn save(&self, hosts: &[HostConfig]) -> StorageResult<()>;
}
