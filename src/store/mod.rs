//! Persistence of open listings, the closed archive and pass statistics.
//!
//! Every mutation is a single upsert or delete keyed by listing id (or archive
//! key), so re-running an interrupted pass never duplicates records.

mod json;
mod memory;
mod retrying;

pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use retrying::RetryingStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::StoreError;
use crate::models::{ClosedListingRecord, ListingRecord, Source, SyncStats};

#[async_trait]
pub trait ListingStore: Send + Sync {
    /// All open listings of one source, ordered by listing id.
    async fn find_open(&self, source: &Source) -> Result<Vec<ListingRecord>, StoreError>;

    /// Insert or replace the open listing with the record's `(source, id)`.
    async fn upsert_open(&self, record: &ListingRecord) -> Result<(), StoreError>;

    async fn delete_open(&self, source: &Source, id: &str) -> Result<(), StoreError>;

    async fn delete_open_many(&self, source: &Source, ids: &[String]) -> Result<(), StoreError>;

    /// The whole closed archive, ordered by archive key.
    async fn find_closed(&self) -> Result<Vec<ClosedListingRecord>, StoreError>;

    /// Insert or replace closed records by archive key.
    async fn upsert_closed_many(&self, records: &[ClosedListingRecord]) -> Result<(), StoreError>;

    async fn insert_stats(&self, stats: &SyncStats) -> Result<(), StoreError>;

    async fn find_stats(&self, source: &Source) -> Result<Vec<SyncStats>, StoreError>;
}

/// Whole store contents, shared by the in-memory and file-backed stores.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub(crate) struct StoreState {
    #[serde(default)]
    open: BTreeMap<Source, BTreeMap<String, ListingRecord>>,
    #[serde(default)]
    closed: BTreeMap<String, ClosedListingRecord>,
    #[serde(default)]
    stats: Vec<SyncStats>,
}

impl StoreState {
    fn find_open(&self, source: &Source) -> Vec<ListingRecord> {
        self.open
            .get(source)
            .map(|listings| listings.values().cloned().collect())
            .unwrap_or_default()
    }

    fn upsert_open(&mut self, record: &ListingRecord) {
        self.open
            .entry(record.source.clone())
            .or_default()
            .insert(record.id.clone(), record.clone());
    }

    fn delete_open(&mut self, source: &Source, ids: &[String]) {
        if let Some(listings) = self.open.get_mut(source) {
            for id in ids {
                listings.remove(id);
            }
        }
    }

    fn find_closed(&self) -> Vec<ClosedListingRecord> {
        self.closed.values().cloned().collect()
    }

    fn upsert_closed(&mut self, records: &[ClosedListingRecord]) {
        for record in records {
            self.closed
                .insert(record.archive_key.clone(), record.clone());
        }
    }

    fn insert_stats(&mut self, stats: &SyncStats) {
        self.stats.push(stats.clone());
    }

    fn find_stats(&self, source: &Source) -> Vec<SyncStats> {
        self.stats
            .iter()
            .filter(|stats| &stats.source == source)
            .cloned()
            .collect()
    }
}
