//! Configuration mutations issued by the presentation layer.
//!
//! Every operation loads the whole host list, applies one change and writes
//! the whole list back. Mutations are serialized through a lock so two
//! concurrent edits cannot lose each other's update. When the write fails
//! the stored list is left as it was and the error goes back to the caller.

use std::path::PathBuf;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use super::backend::HostStore;
use super::error::{StorageError, StorageResult};
use crate::config::{AlertThresholds, DEFAULT_SSH_PORT, HostConfig};

/// Identity and connection fields of a host, as entered by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHost {
    pub name: String,
    pub address: String,
    pub port: Option<u16>,
    pub user: String,
    pub key_path: Option<PathBuf>,
}

impl NewHost {
    fn validate(&self) -> StorageResult<()> {
        if self.name.trim().is_empty() {
            return Err(StorageError::InvalidRecord("name is required".to_string()));
        }
        if self.address.trim().is_empty() {
            return Err(StorageError::InvalidRecord(
                "address is required".to_string(),
            ));
        }
        Ok(())
    }

    fn into_config(self, id: String, thresholds: AlertThresholds) -> HostConfig {
        HostConfig {
            id,
            name: self.name.trim().to_string(),
            address: self.address.trim().to_string(),
            port: self.port.unwrap_or(DEFAULT_SSH_PORT),
            user: self.user.trim().to_string(),
            key_path: self.key_path.filter(|p| !p.as_os_str().is_empty()),
            thresholds,
        }
    }
}

pub struct HostCatalog<S> {
    store: S,
    write_lock: Mutex<()>,
}

impl<S: HostStore> HostCatalog<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn list(&self) -> StorageResult<Vec<HostConfig>> {
        self.store.load().await
    }

    pub async fn get(&self, id: &str) -> StorageResult<HostConfig> {
        self.store
            .load()
            .await?
            .into_iter()
            .find(|host| host.id == id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    /// Add a host with a fresh id and the default thresholds.
    #[instrument(skip(self))]
    pub async fn create(&self, host: NewHost) -> StorageResult<HostConfig> {
        host.validate()?;
        let _guard = self.write_lock.lock().await;

        let mut hosts = self.store.load().await?;
        let created = host.into_config(next_id(&hosts), AlertThresholds::default());
        hosts.push(created.clone());
        self.store.save(&hosts).await?;

        debug!("created host {}", created.id);
        Ok(created)
    }

    /// Replace the identity fields of a host. Its thresholds are kept.
    #[instrument(skip(self))]
    pub async fn update(&self, id: &str, host: NewHost) -> StorageResult<HostConfig> {
        host.validate()?;
        self.replace(id, |current| host.into_config(current.id.clone(), current.thresholds))
            .await
    }

    /// Replace the thresholds of a host as a whole.
    #[instrument(skip(self))]
    pub async fn update_thresholds(
        &self,
        id: &str,
        thresholds: AlertThresholds,
    ) -> StorageResult<HostConfig> {
        self.replace(id, |current| HostConfig {
            thresholds,
            ..current.clone()
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> StorageResult<HostConfig> {
        let _guard = self.write_lock.lock().await;

        let mut hosts = self.store.load().await?;
        let index = hosts
            .iter()
            .position(|host| host.id == id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        let removed = hosts.remove(index);
        self.store.save(&hosts).await?;

        debug!("deleted host {id}");
        Ok(removed)
    }

    async fn replace(
        &self,
        id: &str,
        change: impl FnOnce(&HostConfig) -> HostConfig,
    ) -> StorageResult<HostConfig> {
        let _guard = self.write_lock.lock().await;

        let mut hosts = self.store.load().await?;
        let slot = hosts
            .iter_mut()
            .find(|host| host.id == id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        let replaced = change(slot);
        *slot = replaced.clone();
        self.store.save(&hosts).await?;

        debug!("replaced host {id}");
        Ok(replaced)
    }
}

/// Unix timestamp based id, bumped until it is unused.
fn next_id(hosts: &[HostConfig]) -> String {
    let mut candidate = Utc::now().timestamp();
    while hosts.iter().any(|host| host.id == candidate.to_string()) {
        candidate += 1;
    }
    candidate.to_string()
}
