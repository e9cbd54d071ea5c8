//! In-memory host store (no persistence)
//!
//! Useful for tests and for embedding the collector with a host list that
//! is managed elsewhere. All data is lost on restart.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::HostStore;
use super::error::StorageResult;
use crate::config::HostConfig;

#[derive(Debug, Default)]
pub struct MemoryHostStore {
    hosts: RwLock<Vec<HostConfig>>,
}

impl MemoryHostStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hosts(hosts: Vec<HostConfig>) -> Self {
        Self {
            hosts: RwLock::new(hosts),
        }
    }
}

#[async_trait]
impl HostStore for MemoryHostStore {
    async fn load(&self) -> StorageResult<Vec<HostConfig>> {
        Ok(self.hosts.read().await.clone())
    }

    async fn save(&self, hosts: &[HostConfig]) -> StorageResult<()> {
        debug!("in-memory store: replacing {} host(s)", hosts.len());
        *self.hosts.write().await = hosts.to_vec();
        Ok(())
    }
}
