use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ListingStore, StoreState};
use crate::error::StoreError;
use crate::models::{ClosedListingRecord, ListingRecord, Source, SyncStats};

/// Store kept entirely in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn find_open(&self, source: &Source) -> Result<Vec<ListingRecord>, StoreError> {
        Ok(self.state.read().await.find_open(source))
    }

    async fn upsert_open(&self, record: &ListingRecord) -> Result<(), StoreError> {
        self.state.write().await.upsert_open(record);
        Ok(())
    }

    async fn delete_open(&self, source: &Source, id: &str) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .delete_open(source, &[id.to_string()]);
        Ok(())
    }

    async fn delete_open_many(&self, source: &Source, ids: &[String]) -> Result<(), StoreError> {
        self.state.write().await.delete_open(source, ids);
        Ok(())
    }

    async fn find_closed(&self) -> Result<Vec<ClosedListingRecord>, StoreError> {
        Ok(self.state.read().await.find_closed())
    }

    async fn upsert_closed_many(&self, records: &[ClosedListingRecord]) -> Result<(), StoreError> {
        self.state.write().await.upsert_closed(records);
        Ok(())
    }

    async fn insert_stats(&self, stats: &SyncStats) -> Result<(), StoreError> {
        self.state.write().await.insert_stats(stats);
        Ok(())
    }

    async fn find_stats(&self, source: &Source) -> Result<Vec<SyncStats>, StoreError> {
        Ok(self.state.read().await.find_stats(source))
    }
}
