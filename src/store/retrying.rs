use async_trait::async_trait;

use super::ListingStore;
use crate::error::StoreError;
use crate::models::{ClosedListingRecord, ListingRecord, Source, SyncStats};
use crate::retry::{retry, RetryPolicy};

/// Wraps every call of an inner store in the retry executor, so callers only
/// ever see errors that outlived the policy.
#[derive(Debug)]
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: ListingStore> RetryingStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: ListingStore> ListingStore for RetryingStore<S> {
    async fn find_open(&self, source: &Source) -> Result<Vec<ListingRecord>, StoreError> {
        retry(&self.policy, "loading open listings", || self.inner.find_open(source)).await
    }

    async fn upsert_open(&self, record: &ListingRecord) -> Result<(), StoreError> {
        retry(&self.policy, "saving open listing", || self.inner.upsert_open(record)).await
    }

    async fn delete_open(&self, source: &Source, id: &str) -> Result<(), StoreError> {
        retry(&self.policy, "deleting open listing", || {
            self.inner.delete_open(source, id)
        })
        .await
    }

    async fn delete_open_many(&self, source: &Source, ids: &[String]) -> Result<(), StoreError> {
        retry(&self.policy, "deleting open listings", || {
            self.inner.delete_open_many(source, ids)
        })
        .await
    }

    async fn find_closed(&self) -> Result<Vec<ClosedListingRecord>, StoreError> {
        retry(&self.policy, "loading closed archive", || self.inner.find_closed()).await
    }

    async fn upsert_closed_many(&self, records: &[ClosedListingRecord]) -> Result<(), StoreError> {
        retry(&self.policy, "saving closed listings", || {
            self.inner.upsert_closed_many(records)
        })
        .await
    }

    async fn insert_stats(&self, stats: &SyncStats) -> Result<(), StoreError> {
        retry(&self.policy, "saving sync stats", || self.inner.insert_stats(stats)).await
    }

    async fn find_stats(&self, source: &Source) -> Result<Vec<SyncStats>, StoreError> {
        retry(&self.policy, "loading sync stats", || self.inner.find_stats(source)).await
    }
}
