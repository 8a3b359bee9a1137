use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::will::{Address, Timestamp, WillSnapshot};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Last confirmed snapshot persisted for offline display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedWill {
    pub owner: Address,
    pub saved_at: Timestamp,
    pub snapshot: WillSnapshot,
}

impl CachedWill {
    pub async fn save(&self, path: &Path) -> Result<(), CacheError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    /// `None` when nothing has been cached yet.
    pub async fn load(path: &Path) -> Result<Option<Self>, CacheError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}
