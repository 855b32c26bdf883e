//! File-backed `LedgerStore`: one pretty-printed JSON document per collection.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use illustra_core::domain::access::{AuthorizationRecord, PendingAccessRequest};
use illustra_core::ports::{LedgerStore, StoreError};

#[derive(Clone, Debug)]
pub struct JsonFileLedgerStore {
    authorized_users_path: PathBuf,
    pending_requests_path: PathBuf,
}

impl JsonFileLedgerStore {
    pub fn new(
        authorized_users_path: impl Into<PathBuf>,
        pending_requests_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            authorized_users_path: authorized_users_path.into(),
            pending_requests_path: pending_requests_path.into(),
        }
    }

    pub fn authorized_users_path(&self) -> &Path {
        &self.authorized_users_path
    }

    pub fn pending_requests_path(&self) -> &Path {
        &self.pending_requests_path
    }
}

async fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            debug!(
                event_name = "access.store.missing",
                path = %path.display(),
                "ledger file not found; collection will be seeded"
            );
            return Ok(None);
        }
        Err(error) => {
            return Err(StoreError::Io(format!("failed to read {}: {error}", path.display())));
        }
    };

    serde_json::from_str::<T>(&raw).map(Some).map_err(|error| {
        warn!(
            event_name = "access.store.corrupt",
            path = %path.display(),
            error = %error,
            "ledger file could not be parsed"
        );
        StoreError::Corrupt(format!("{}: {error}", path.display()))
    })
}

async fn write_document<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|error| {
            StoreError::Io(format!("failed to prepare {}: {error}", parent.display()))
        })?;
    }

    let payload = serde_json::to_vec_pretty(value)
        .map_err(|error| StoreError::Encode(format!("{}: {error}", path.display())))?;
    let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));

    tokio::fs::write(&temp_path, payload).await.map_err(|error| {
        StoreError::Io(format!("failed to write {}: {error}", temp_path.display()))
    })?;
    tokio::fs::rename(&temp_path, path).await.map_err(|error| {
        StoreError::Io(format!("failed to finalize {}: {error}", path.display()))
    })?;

    Ok(())
}

#[async_trait]
impl LedgerStore for JsonFileLedgerStore {
    async fn load_authorizations(&self) -> Result<Option<AuthorizationRecord>, StoreError> {
        read_document(&self.authorized_users_path).await
    }

    async fn save_authorizations(&self, record: &AuthorizationRecord) -> Result<(), StoreError> {
        write_document(&self.authorized_users_path, record).await
    }

    async fn load_pending(&self) -> Result<Option<Vec<PendingAccessRequest>>, StoreError> {
        read_document(&self.pending_requests_path).await
    }

    async fn save_pending(&self, pending: &[PendingAccessRequest]) -> Result<(), StoreError> {
        write_document(&self.pending_requests_path, pending).await
    }
}
