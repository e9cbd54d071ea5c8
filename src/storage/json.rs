//! JSON file host store
//!
//! The file holds a single JSON array of host records. Writes go to a
//! sibling temporary file first and are renamed over the original, so a
//! failed write never leaves a truncated store behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::backend::HostStore;
use super::error::StorageResult;
use crate::config::HostConfig;

#[derive(Debug, Clone)]
pub struct JsonHostStore {
    path: PathBuf,
}

impl JsonHostStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl HostStore for JsonHostStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> StorageResult<Vec<HostConfig>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("host file missing, creating an empty one");
                self.save(&[]).await?;
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let hosts: Vec<HostConfig> = serde_json::from_str(&content)?;
        debug!("loaded {} host(s)", hosts.len());
        Ok(hosts)
    }

    #[instrument(skip(self, hosts), fields(path = %self.path.display(), count = hosts.len()))]
    async fn save(&self, hosts: &[HostConfig]) -> StorageResult<()> {
        let content = serde_json::to_string_pretty(hosts)?;
        let temp = self.temp_path();

        if let Err(e) = tokio::fs::write(&temp, content).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }
        tokio::fs::rename(&temp, &self.path).await?;

        debug!("saved host file");
        Ok(())
    }
}
