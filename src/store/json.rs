use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{ListingStore, StoreState};
use crate::error::StoreError;
use crate::models::{ClosedListingRecord, ListingRecord, Source, SyncStats};

/// Store persisted as one pretty-printed JSON document.
///
/// The whole document is rewritten after each mutation, through a temporary
/// file renamed over the previous snapshot.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl JsonFileStore {
    /// Open the snapshot at `path`, starting empty when it does not exist yet.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!("No store at {}, starting empty", path.display());
                StoreState::default()
            }
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_vec_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!("Saved {} bytes to {}", json.len(), self.path.display());
        Ok(())
    }

    async fn mutate<F>(&self, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut StoreState) + Send,
    {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        apply(&mut next);
        self.persist(&next).await?;
        *state = next;
        Ok(())
    }
}

#[async_trait]
impl ListingStore for JsonFileStore {
    async fn find_open(&self, source: &Source) -> Result<Vec<ListingRecord>, StoreError> {
        Ok(self.state.lock().await.find_open(source))
    }

    async fn upsert_open(&self, record: &ListingRecord) -> Result<(), StoreError> {
        self.mutate(|state| state.upsert_open(record)).await
    }

    async fn delete_open(&self, source: &Source, id: &str) -> Result<(), StoreError> {
        let ids = [id.to_string()];
        self.mutate(|state| state.delete_open(source, &ids)).await
    }

    async fn delete_open_many(&self, source: &Source, ids: &[String]) -> Result<(), StoreError> {
        self.mutate(|state| state.delete_open(source, ids)).await
    }

    async fn find_closed(&self) -> Result<Vec<ClosedListingRecord>, StoreError> {
        Ok(self.state.lock().await.find_closed())
    }

    async fn upsert_closed_many(&self, records: &[ClosedListingRecord]) -> Result<(), StoreError> {
        self.mutate(|state| state.upsert_closed(records)).await
    }

    async fn insert_stats(&self, stats: &SyncStats) -> Result<(), StoreError> {
        self.mutate(|state| state.insert_stats(stats)).await
    }

    async fn find_stats(&self, source: &Source) -> Result<Vec<SyncStats>, StoreError> {
        Ok(self.state.lock().await.find_stats(source))
    }
}
