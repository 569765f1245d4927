//! Reconciliation of one source's feed against the listing store.
//!
//! A pass runs in three phases:
//!
//! 1. Fetch the feed's short listings (retried; exhaustion aborts the pass)
//!    and diff them against one snapshot of the source's open listings.
//! 2. Close listings that left the feed: reconcile each against the closed
//!    archive working set, flush the touched archive records, then delete the
//!    closed ids from the open set.
//! 3. Fetch and upsert added and refreshed listings one at a time. Transport
//!    failures of a detail fetch are retried. A listing that still fails is
//!    logged and skipped; after a transport failure the browsing session is
//!    also replaced, and failing to do so aborts the pass.
//!
//! The closed archive is shared by every source, so the closure phase of
//! concurrent passes runs one pass at a time.
//!
//! Every store write is keyed by listing id or archive key, so re-running an
//! interrupted pass converges on the same state.

use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::archive::{ClosedArchive, ClosureOutcome};
use super::images::ImageCollector;
use super::plan::{ChangeKind, SyncPlan};
use super::types::EngineConfig;
use crate::error::{ConfigError, DetailError, SyncError};
use crate::hashing::DifferenceHasher;
use crate::models::{ListingDescriptor, ListingRecord, Source, SyncStats};
use crate::retry::{retry, retry_if};
use crate::scrapers::{ImageFetcher, SourceFeed};
use crate::similarity::SimilarityDetector;
use crate::store::ListingStore;

pub struct SyncEngine {
    pub(crate) store: Arc<dyn ListingStore>,
    images: Arc<dyn ImageFetcher>,
    hasher: DifferenceHasher,
    detector: SimilarityDetector,
    pub(crate) config: EngineConfig,
    /// Held for the whole load-reconcile-flush of the closed archive.
    closing: Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn ListingStore>,
        images: Arc<dyn ImageFetcher>,
        config: EngineConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            store,
            images,
            hasher: DifferenceHasher::new(config.grid_size),
            detector: SimilarityDetector::new(config.similarity_threshold, config.matching),
            config,
            closing: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one full synchronization pass for `feed`'s source.
    pub async fn sync(&self, feed: &dyn SourceFeed) -> Result<SyncStats, SyncError> {
        let source = feed.source().clone();
        info!("Starting sync pass for {}", source);

        let descriptors = self.fetch_short_listings(feed).await?;
        let open = self.store.find_open(&source).await?;
        let plan = SyncPlan::diff(open, descriptors);
        info!(
            "{}: {} to fetch, {} closed, {} unchanged",
            source,
            plan.changes.len(),
            plan.removed.len(),
            plan.unchanged
        );

        let mut stats = SyncStats::new(source.clone(), Utc::now());

        if !plan.abandoned.is_empty() {
            debug!("{}: dropping {} unfinished rows", source, plan.abandoned.len());
            self.store.delete_open_many(&source, &plan.abandoned).await?;
        }

        stats.closed_count = self.close_removed(&source, plan.removed).await?;

        for change in &plan.changes {
            let descriptor = &change.descriptor;

            match self.fetch_record(feed, descriptor).await {
                Ok(record) => {
                    self.store.upsert_open(&record).await?;
                    match change.kind {
                        ChangeKind::Add => stats.added_count += 1,
                        ChangeKind::Refresh => stats.updated_count += 1,
                    }
                    debug!("{}: stored listing {} ({:?})", source, descriptor.id, change.kind);
                }
                Err(err) => self.recover(feed, descriptor, err).await?,
            }
        }

        self.store.insert_stats(&stats).await?;
        info!(
            "Finished sync pass for {}: {} added, {} updated, {} closed",
            source, stats.added_count, stats.updated_count, stats.closed_count
        );

        Ok(stats)
    }

    pub(crate) async fn fetch_short_listings(
        &self,
        feed: &dyn SourceFeed,
    ) -> Result<Vec<ListingDescriptor>, SyncError> {
        let source = feed.source();
        let message = format!("fetching short listings for {}", source);

        retry(&self.config.feed_retry, &message, || feed.fetch_short_listings())
            .await
            .map_err(|error| SyncError::FeedUnreachable {
                feed: source.clone(),
                error,
            })
    }

    /// Move listings that left the feed into the closed archive.
    async fn close_removed(
        &self,
        source: &Source,
        removed: Vec<ListingRecord>,
    ) -> Result<usize, SyncError> {
        if removed.is_empty() {
            return Ok(0);
        }

        let _closing = self.closing.lock().await;
        let mut archive = ClosedArchive::new(self.store.find_closed().await?);
        let closed_date = Utc::now();
        let ids: Vec<String> = removed.iter().map(|record| record.id.clone()).collect();

        for record in removed {
            let id = record.id.clone();
            match archive.close(record, source, closed_date, &self.detector)? {
                ClosureOutcome::Merged {
                    archive_key,
                    replaced,
                } => debug!(
                    "{}: listing {} closed into {} (canonical copy replaced: {})",
                    source, id, archive_key, replaced
                ),
                ClosureOutcome::Archived { archive_key } => {
                    debug!("{}: listing {} archived as {}", source, id, archive_key)
                }
            }
        }

        self.store.upsert_closed_many(&archive.take_dirty()).await?;
        self.store.delete_open_many(source, &ids).await?;

        Ok(ids.len())
    }

    /// Fetch a listing's detail and photos and build its record.
    pub(crate) async fn fetch_record(
        &self,
        feed: &dyn SourceFeed,
        descriptor: &ListingDescriptor,
    ) -> Result<ListingRecord, DetailError> {
        self.pace().await;

        let message = format!("fetching listing {} from {}", descriptor.id, feed.source());
        let detail = retry_if(
            &self.config.detail_retry,
            &message,
            || feed.fetch_detail(descriptor),
            DetailError::is_unexpected,
        )
        .await?;
        let collector = ImageCollector {
            fetcher: self.images.as_ref(),
            hasher: &self.hasher,
            retry_delay: self.config.image_retry_delay(),
        };
        let fingerprints = collector.fingerprints(&detail.image_urls).await?;

        Ok(ListingRecord::from_detail(
            feed.source().clone(),
            descriptor,
            detail,
            fingerprints,
            Utc::now(),
        ))
    }

    /// Log a per-listing failure and, for transport failures, replace the
    /// browsing session before the pass continues.
    pub(crate) async fn recover(
        &self,
        feed: &dyn SourceFeed,
        descriptor: &ListingDescriptor,
        err: DetailError,
    ) -> Result<(), SyncError> {
        warn!("{}: skipping listing {}: {}", feed.source(), descriptor.id, err);

        if !err.is_unexpected() {
            return Ok(());
        }

        let message = format!("renewing session for {}", feed.source());
        retry(&self.config.session_retry, &message, || feed.renew_session())
            .await
            .map_err(|error| SyncError::SessionLost {
                feed: feed.source().clone(),
                error,
            })
    }

    async fn pace(&self) {
        let Some(pacing) = self.config.pacing else {
            return;
        };

        let delay_ms = rand::thread_rng().gen_range(pacing.min_ms..=pacing.max_ms);
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}
