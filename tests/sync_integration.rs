//! End-to-end passes of the sync engine and initializer against fake feeds,
//! fake image hosts and the in-memory store.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use image::{DynamicImage, GrayImage, Luma};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use listing_sync::error::{DetailError, FetchError, StoreError, SyncError, ValidationError};
use listing_sync::hashing::{DifferenceHasher, Fingerprint};
use listing_sync::models::{
    ClosedListingRecord, ListingDescriptor, ListingDetail, ListingRecord, Source, SyncStats,
};
use listing_sync::retry::RetryPolicy;
use listing_sync::scrapers::{ImageFetcher, SourceFeed};
use listing_sync::store::{ListingStore, MemoryStore};
use listing_sync::sync::{sync_all, EngineConfig, SyncEngine};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn t0() -> DateTime<Utc> {
    "2024-05-01T12:00:00Z".parse().unwrap()
}

/// Deterministic noise photo; different seeds give unrelated fingerprints.
fn photo(seed: u32) -> DynamicImage {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    DynamicImage::ImageLuma8(GrayImage::from_fn(64, 64, |_, _| {
        state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        Luma([(state >> 16) as u8])
    }))
}

fn fingerprint(seed: u32) -> Fingerprint {
    DifferenceHasher::default().fingerprint(&photo(seed))
}

fn photo_url(seed: u32) -> String {
    format!("https://img.example.test/{}.jpg", seed)
}

fn descriptor(id: &str, last_modified: DateTime<Utc>) -> ListingDescriptor {
    ListingDescriptor {
        id: id.to_string(),
        url: format!("https://example.test/annons/{}", id),
        last_modified,
    }
}

fn detail(price: i64, rooms: u32, photos: &[u32]) -> ListingDetail {
    ListingDetail {
        price,
        surface: 55.0,
        rooms_count: rooms,
        image_urls: photos.iter().map(|s| photo_url(*s)).collect(),
        address: Some("Götgatan 120".to_string()),
    }
}

fn open_record(
    source: &str,
    id: &str,
    price: i64,
    rooms: u32,
    photos: &[u32],
    last_modified: DateTime<Utc>,
) -> ListingRecord {
    ListingRecord::from_detail(
        Source::new(source),
        &descriptor(id, last_modified),
        detail(price, rooms, photos),
        photos.iter().map(|s| fingerprint(*s)).collect(),
        t0(),
    )
}

#[derive(Clone, Copy)]
enum Failure {
    Transport,
    Invalid,
}

#[derive(Default)]
struct FeedState {
    listings: Vec<ListingDescriptor>,
    details: HashMap<String, Result<ListingDetail, Failure>>,
    /// Transport failures still to serve per listing id before its detail.
    flaky: HashMap<String, usize>,
    unreachable: bool,
    renew_fails: bool,
    short_calls: usize,
    detail_calls: Vec<String>,
    renewals: usize,
}

struct FakeFeed {
    source: Source,
    state: Mutex<FeedState>,
}

impl FakeFeed {
    fn new(source: &str) -> Self {
        Self {
            source: Source::new(source),
            state: Mutex::new(FeedState::default()),
        }
    }

    fn list(self, id: &str, last_modified: DateTime<Utc>, detail: Result<ListingDetail, Failure>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.listings.push(descriptor(id, last_modified));
            state.details.insert(id.to_string(), detail);
        }
        self
    }

    fn flaky(self, id: &str, failures: usize) -> Self {
        self.state.lock().unwrap().flaky.insert(id.to_string(), failures);
        self
    }

    fn unreachable(self) -> Self {
        self.state.lock().unwrap().unreachable = true;
        self
    }

    fn renew_fails(self) -> Self {
        self.state.lock().unwrap().renew_fails = true;
        self
    }

    fn set_detail(&self, id: &str, detail: Result<ListingDetail, Failure>) {
        self.state.lock().unwrap().details.insert(id.to_string(), detail);
    }

    fn detail_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().detail_calls.clone()
    }

    fn short_calls(&self) -> usize {
        self.state.lock().unwrap().short_calls
    }

    fn renewals(&self) -> usize {
        self.state.lock().unwrap().renewals
    }
}

#[async_trait]
impl SourceFeed for FakeFeed {
    fn source(&self) -> &Source {
        &self.source
    }

    async fn fetch_short_listings(&self) -> Result<Vec<ListingDescriptor>, FetchError> {
        let mut state = self.state.lock().unwrap();
        state.short_calls += 1;
        if state.unreachable {
            return Err(FetchError::Transport {
                url: "https://example.test/search".to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(state.listings.clone())
    }

    async fn fetch_detail(&self, descriptor: &ListingDescriptor) -> Result<ListingDetail, DetailError> {
        let mut state = self.state.lock().unwrap();
        state.detail_calls.push(descriptor.id.clone());

        if let Some(left) = state.flaky.get_mut(&descriptor.id) {
            if *left > 0 {
                *left -= 1;
                return Err(FetchError::Transport {
                    url: descriptor.url.clone(),
                    message: "operation timed out".to_string(),
                }
                .into());
            }
        }

        match state.details.get(&descriptor.id).cloned() {
            Some(Ok(detail)) => Ok(detail),
            Some(Err(Failure::Invalid)) => Err(ValidationError::MissingField("price").into()),
            Some(Err(Failure::Transport)) | None => Err(FetchError::Session("tab crashed".to_string()).into()),
        }
    }

    async fn renew_session(&self) -> Result<(), FetchError> {
        let mut state = self.state.lock().unwrap();
        state.renewals += 1;
        if state.renew_fails {
            return Err(FetchError::Session("chrome failed to start".to_string()));
        }
        Ok(())
    }
}

/// Serves `photo(seed)` for every URL built by `photo_url`, except blocked seeds.
#[derive(Default)]
struct FakeImages {
    blocked: Mutex<Vec<u32>>,
}

impl FakeImages {
    fn block(&self, seeds: &[u32]) {
        self.blocked.lock().unwrap().extend_from_slice(seeds);
    }
}

#[async_trait]
impl ImageFetcher for FakeImages {
    async fn fetch(&self, url: &str) -> Result<DynamicImage, FetchError> {
        let seed: Option<u32> = url
            .strip_prefix("https://img.example.test/")
            .and_then(|rest| rest.strip_suffix(".jpg"))
            .and_then(|n| n.parse().ok());

        match seed {
            Some(seed) if !self.blocked.lock().unwrap().contains(&seed) => Ok(photo(seed)),
            _ => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    images: Arc<FakeImages>,
    engine: SyncEngine,
}

/// Store that yields to the scheduler before each archive access, the way a
/// networked store suspends on I/O.
struct YieldingStore {
    inner: Arc<MemoryStore>,
}

#[async_trait]
impl ListingStore for YieldingStore {
    async fn find_open(&self, source: &Source) -> Result<Vec<ListingRecord>, StoreError> {
        tokio::task::yield_now().await;
        self.inner.find_open(source).await
    }

    async fn upsert_open(&self, record: &ListingRecord) -> Result<(), StoreError> {
        self.inner.upsert_open(record).await
    }

    async fn delete_open(&self, source: &Source, id: &str) -> Result<(), StoreError> {
        self.inner.delete_open(source, id).await
    }

    async fn delete_open_many(&self, source: &Source, ids: &[String]) -> Result<(), StoreError> {
        self.inner.delete_open_many(source, ids).await
    }

    async fn find_closed(&self) -> Result<Vec<ClosedListingRecord>, StoreError> {
        tokio::task::yield_now().await;
        self.inner.find_closed().await
    }

    async fn upsert_closed_many(&self, records: &[ClosedListingRecord]) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.inner.upsert_closed_many(records).await
    }

    async fn insert_stats(&self, stats: &SyncStats) -> Result<(), StoreError> {
        self.inner.insert_stats(stats).await
    }

    async fn find_stats(&self, source: &Source) -> Result<Vec<SyncStats>, StoreError> {
        self.inner.find_stats(source).await
    }
}

fn engine_over(store: Arc<dyn ListingStore>, images: Arc<FakeImages>) -> SyncEngine {
    let config = EngineConfig {
        pacing: None,
        image_retry_delay_ms: 50,
        feed_retry: RetryPolicy::bounded(Duration::from_millis(100), 3),
        detail_retry: RetryPolicy::bounded(Duration::from_millis(100), 2),
        session_retry: RetryPolicy::bounded(Duration::from_millis(100), 2),
        ..EngineConfig::default()
    };

    let images: Arc<dyn ImageFetcher> = images;
    SyncEngine::new(store, images, config).unwrap()
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let images = Arc::new(FakeImages::default());
    let engine = engine_over(store.clone(), images.clone());

    Harness {
        store,
        images,
        engine,
    }
}

fn booli() -> Source {
    Source::new("booli")
}

// ---------------------------------------------------------------------------
// Synchronization passes
// ---------------------------------------------------------------------------

#[test]
fn noise_photos_are_unrelated() {
    let similarity = listing_sync::hash_similarity(&fingerprint(1), &fingerprint(2)).unwrap();
    assert!(similarity < 0.8, "similarity {}", similarity);
}

#[tokio::test(start_paused = true)]
async fn listing_missing_from_feed_is_archived() {
    let h = harness();
    h.store
        .upsert_open(&open_record("booli", "1", 3_000_000, 2, &[1, 2], t0()))
        .await
        .unwrap();
    let feed = FakeFeed::new("booli");

    let stats = h.engine.sync(&feed).await.unwrap();

    assert_eq!((stats.closed_count, stats.added_count, stats.updated_count), (1, 0, 0));
    assert!(h.store.find_open(&booli()).await.unwrap().is_empty());

    let archive = h.store.find_closed().await.unwrap();
    assert_eq!(archive.len(), 1);
    assert_eq!(archive[0].archive_key, "booli:1");
    assert_eq!(archive[0].listing.id, "1");
    assert!(archive[0].closed_date > t0());

    assert_eq!(h.store.find_stats(&booli()).await.unwrap(), vec![stats]);
}

#[tokio::test(start_paused = true)]
async fn newer_feed_timestamp_refreshes_record() {
    let h = harness();
    h.store
        .upsert_open(&open_record("booli", "1", 3_000_000, 2, &[1, 2], t0()))
        .await
        .unwrap();
    let t1 = t0() + ChronoDuration::hours(3);
    let feed = FakeFeed::new("booli").list("1", t1, Ok(detail(2_750_000, 2, &[1, 2, 3])));

    let stats = h.engine.sync(&feed).await.unwrap();

    assert_eq!(stats.updated_count, 1);
    assert_eq!(stats.added_count, 0);
    assert_eq!(stats.closed_count, 0);
    assert_eq!(feed.detail_calls(), vec!["1".to_string()]);

    let open = h.store.find_open(&booli()).await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].price, 2_750_000);
    assert_eq!(open[0].last_modified, t1);
    assert_eq!(open[0].image_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn unchanged_listing_is_not_refetched() {
    let h = harness();
    h.store
        .upsert_open(&open_record("booli", "1", 3_000_000, 2, &[1, 2], t0()))
        .await
        .unwrap();
    let feed = FakeFeed::new("booli").list("1", t0(), Ok(detail(1, 2, &[1, 2])));

    let stats = h.engine.sync(&feed).await.unwrap();

    assert_eq!((stats.closed_count, stats.added_count, stats.updated_count), (0, 0, 0));
    assert!(feed.detail_calls().is_empty());
    assert_eq!(h.store.find_open(&booli()).await.unwrap()[0].price, 3_000_000);
}

#[tokio::test(start_paused = true)]
async fn new_listing_is_added_with_fingerprints() {
    let h = harness();
    let feed = FakeFeed::new("booli").list("7", t0(), Ok(detail(4_100_000, 3, &[5, 6, 7])));

    let stats = h.engine.sync(&feed).await.unwrap();

    assert_eq!(stats.added_count, 1);
    let open = h.store.find_open(&booli()).await.unwrap();
    assert_eq!(open.len(), 1);
    assert!(open[0].complete);
    assert_eq!(open[0].rooms_count, 3);
    assert_eq!(
        open[0].image_fingerprints,
        vec![fingerprint(5), fingerprint(6), fingerprint(7)]
    );
    assert!(open[0].image_fingerprints.iter().all(|f| f.bit_len() == 256));
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_keeps_listing_open() {
    let h = harness();
    h.store
        .upsert_open(&open_record("booli", "1", 3_000_000, 2, &[1, 2], t0()))
        .await
        .unwrap();
    h.images.block(&[11, 12, 13]);
    let feed = FakeFeed::new("booli").list(
        "1",
        t0() + ChronoDuration::hours(1),
        Ok(detail(2_000_000, 2, &[10, 11, 12, 13])),
    );

    let stats = h.engine.sync(&feed).await.unwrap();

    assert_eq!((stats.closed_count, stats.added_count, stats.updated_count), (0, 0, 0));
    assert!(h.store.find_closed().await.unwrap().is_empty());
    let open = h.store.find_open(&booli()).await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].price, 3_000_000);
    // Partial image failures are not transport failures of the page itself.
    assert_eq!(feed.renewals(), 0);
}

#[tokio::test(start_paused = true)]
async fn half_of_the_photos_is_enough_to_add() {
    let h = harness();
    h.images.block(&[21, 22]);
    let feed = FakeFeed::new("booli").list("2", t0(), Ok(detail(2_000_000, 2, &[20, 21, 22, 23])));

    let stats = h.engine.sync(&feed).await.unwrap();

    assert_eq!(stats.added_count, 1);
    let open = h.store.find_open(&booli()).await.unwrap();
    assert_eq!(open[0].image_fingerprints, vec![fingerprint(20), fingerprint(23)]);
}

// ---------------------------------------------------------------------------
// Closure reconciliation
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn closure_merges_into_similar_archived_unit() {
    let h = harness();
    let archived = ClosedListingRecord::new(
        open_record("hemnet", "h-1", 4_000_000, 3, &[1, 2, 3], t0()),
        Source::new("hemnet"),
        t0(),
    );
    h.store.upsert_closed_many(&[archived]).await.unwrap();
    h.store
        .upsert_open(&open_record("booli", "b-1", 3_800_000, 3, &[3, 2, 1, 4], t0()))
        .await
        .unwrap();
    let feed = FakeFeed::new("booli");

    let stats = h.engine.sync(&feed).await.unwrap();

    assert_eq!(stats.closed_count, 1);
    let archive = h.store.find_closed().await.unwrap();
    assert_eq!(archive.len(), 1);
    assert_eq!(archive[0].archive_key, "hemnet:h-1");
    assert_eq!(archive[0].listing.id, "b-1");
    assert_eq!(archive[0].listing.price, 3_800_000);
    assert_eq!(archive[0].source, booli());
    assert!(archive[0].closed_date > t0());
}

#[tokio::test(start_paused = true)]
async fn closure_keeps_cheaper_archived_copy() {
    let h = harness();
    let archived = ClosedListingRecord::new(
        open_record("hemnet", "h-1", 3_500_000, 3, &[1, 2, 3], t0()),
        Source::new("hemnet"),
        t0(),
    );
    h.store.upsert_closed_many(&[archived]).await.unwrap();
    h.store
        .upsert_open(&open_record("booli", "b-1", 3_800_000, 3, &[1, 2, 3], t0()))
        .await
        .unwrap();

    h.engine.sync(&FakeFeed::new("booli")).await.unwrap();

    let archive = h.store.find_closed().await.unwrap();
    assert_eq!(archive.len(), 1);
    assert_eq!(archive[0].listing.id, "h-1");
    assert_eq!(archive[0].source, booli());
    assert!(archive[0].closed_date > t0());
}

#[tokio::test(start_paused = true)]
async fn different_room_counts_are_archived_separately() {
    let h = harness();
    let archived = ClosedListingRecord::new(
        open_record("hemnet", "h-1", 4_000_000, 2, &[1, 2, 3], t0()),
        Source::new("hemnet"),
        t0(),
    );
    h.store.upsert_closed_many(&[archived]).await.unwrap();
    h.store
        .upsert_open(&open_record("booli", "b-1", 3_800_000, 3, &[1, 2, 3], t0()))
        .await
        .unwrap();

    h.engine.sync(&FakeFeed::new("booli")).await.unwrap();

    let keys: Vec<String> = h
        .store
        .find_closed()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.archive_key)
        .collect();
    assert_eq!(keys, vec!["booli:b-1".to_string(), "hemnet:h-1".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn duplicates_closed_in_one_pass_share_one_archive_record() {
    let h = harness();
    h.store
        .upsert_open(&open_record("booli", "a", 3_900_000, 2, &[8, 9], t0()))
        .await
        .unwrap();
    h.store
        .upsert_open(&open_record("booli", "b", 3_700_000, 2, &[9, 8], t0()))
        .await
        .unwrap();

    let stats = h.engine.sync(&FakeFeed::new("booli")).await.unwrap();

    assert_eq!(stats.closed_count, 2);
    let archive = h.store.find_closed().await.unwrap();
    assert_eq!(archive.len(), 1);
    assert_eq!(archive[0].archive_key, "booli:a");
    assert_eq!(archive[0].listing.id, "b");
}

#[tokio::test(start_paused = true)]
async fn mismatched_fingerprint_lengths_abort_the_pass() {
    let h = harness();
    let mut legacy = open_record("hemnet", "h-1", 4_000_000, 2, &[], t0());
    legacy.image_fingerprints = vec![Fingerprint::from_bytes(vec![0; 8]); 2];
    h.store
        .upsert_closed_many(&[ClosedListingRecord::new(legacy, Source::new("hemnet"), t0())])
        .await
        .unwrap();
    h.store
        .upsert_open(&open_record("booli", "1", 3_000_000, 2, &[1, 2], t0()))
        .await
        .unwrap();

    let result = h.engine.sync(&FakeFeed::new("booli")).await;

    assert!(matches!(result, Err(SyncError::Fatal(_))));
    assert_eq!(h.store.find_open(&booli()).await.unwrap().len(), 1);
    assert!(h.store.find_stats(&booli()).await.unwrap().is_empty());
}

#[tokio::test]
async fn sources_closing_one_unit_concurrently_share_one_archive_record() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_over(
        Arc::new(YieldingStore {
            inner: store.clone(),
        }),
        Arc::new(FakeImages::default()),
    );
    store
        .upsert_open(&open_record("booli", "b-1", 3_800_000, 3, &[1, 2, 3], t0()))
        .await
        .unwrap();
    store
        .upsert_open(&open_record("hemnet", "h-1", 4_000_000, 3, &[3, 2, 1], t0()))
        .await
        .unwrap();
    let feeds: Vec<Arc<dyn SourceFeed>> = vec![
        Arc::new(FakeFeed::new("booli")),
        Arc::new(FakeFeed::new("hemnet")),
    ];

    let results = sync_all(&engine, &feeds).await;

    for (source, result) in &results {
        assert_eq!(result.as_ref().unwrap().closed_count, 1, "{}", source);
    }
    let archive = store.find_closed().await.unwrap();
    assert_eq!(archive.len(), 1);
    assert_eq!(archive[0].listing.id, "b-1");
}

// ---------------------------------------------------------------------------
// Failure handling
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn unreachable_feed_aborts_before_any_mutation() {
    let h = harness();
    h.store
        .upsert_open(&open_record("booli", "1", 3_000_000, 2, &[1, 2], t0()))
        .await
        .unwrap();
    let feed = FakeFeed::new("booli").unreachable();

    let result = h.engine.sync(&feed).await;

    assert!(matches!(result, Err(SyncError::FeedUnreachable { .. })));
    assert_eq!(feed.short_calls(), 3);
    assert_eq!(h.store.find_open(&booli()).await.unwrap().len(), 1);
    assert!(h.store.find_closed().await.unwrap().is_empty());
    assert!(h.store.find_stats(&booli()).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn transport_failure_renews_session_and_continues() {
    let h = harness();
    let feed = FakeFeed::new("booli")
        .list("1", t0(), Err(Failure::Transport))
        .list("2", t0(), Ok(detail(2_000_000, 2, &[1, 2])));

    let stats = h.engine.sync(&feed).await.unwrap();

    assert_eq!(stats.added_count, 1);
    assert_eq!(feed.renewals(), 1);
    assert_eq!(feed.detail_calls(), vec!["1", "1", "2"]);
    let ids: Vec<String> = h
        .store
        .find_open(&booli())
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec!["2".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn transient_detail_failure_is_retried_without_renewal() {
    let h = harness();
    let feed = FakeFeed::new("booli")
        .list("1", t0(), Ok(detail(2_000_000, 2, &[1, 2])))
        .flaky("1", 1);

    let stats = h.engine.sync(&feed).await.unwrap();

    assert_eq!(stats.added_count, 1);
    assert_eq!(feed.renewals(), 0);
    assert_eq!(feed.detail_calls(), vec!["1", "1"]);
    assert_eq!(h.store.find_open(&booli()).await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn invalid_listing_is_dropped_without_renewal() {
    let h = harness();
    let feed = FakeFeed::new("booli").list("1", t0(), Err(Failure::Invalid));

    let stats = h.engine.sync(&feed).await.unwrap();

    assert_eq!(stats.added_count, 0);
    assert_eq!(feed.renewals(), 0);
    assert_eq!(feed.detail_calls(), vec!["1"]);
    assert!(h.store.find_open(&booli()).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn lost_session_aborts_remaining_listings() {
    let h = harness();
    let feed = FakeFeed::new("booli")
        .list("1", t0(), Err(Failure::Transport))
        .list("2", t0(), Ok(detail(2_000_000, 2, &[1, 2])))
        .renew_fails();

    let result = h.engine.sync(&feed).await;

    assert!(matches!(result, Err(SyncError::SessionLost { .. })));
    assert_eq!(feed.renewals(), 2);
    assert_eq!(feed.detail_calls(), vec!["1", "1"]);
    assert!(h.store.find_open(&booli()).await.unwrap().is_empty());
    assert!(h.store.find_stats(&booli()).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn repeated_pass_is_idempotent() {
    let h = harness();
    h.store
        .upsert_open(&open_record("booli", "gone", 1_000_000, 1, &[30, 31], t0()))
        .await
        .unwrap();
    let feed = FakeFeed::new("booli").list("1", t0(), Ok(detail(2_000_000, 2, &[1, 2])));

    h.engine.sync(&feed).await.unwrap();
    let open_after_first = h.store.find_open(&booli()).await.unwrap();
    let closed_after_first = h.store.find_closed().await.unwrap();

    let second = h.engine.sync(&feed).await.unwrap();

    assert_eq!((second.closed_count, second.added_count, second.updated_count), (0, 0, 0));
    assert_eq!(h.store.find_open(&booli()).await.unwrap(), open_after_first);
    assert_eq!(h.store.find_closed().await.unwrap(), closed_after_first);
    assert_eq!(h.store.find_stats(&booli()).await.unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn failing_source_does_not_affect_others() {
    let h = harness();
    let broken: Arc<dyn SourceFeed> = Arc::new(FakeFeed::new("hemnet").unreachable());
    let healthy: Arc<dyn SourceFeed> =
        Arc::new(FakeFeed::new("booli").list("1", t0(), Ok(detail(2_000_000, 2, &[1, 2]))));

    let results = sync_all(&h.engine, &[broken, healthy]).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, Source::new("hemnet"));
    assert!(matches!(results[0].1, Err(SyncError::FeedUnreachable { .. })));
    assert_eq!(results[1].0, booli());
    assert_eq!(results[1].1.as_ref().unwrap().added_count, 1);
}

// ---------------------------------------------------------------------------
// Initializer
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn initializer_inserts_new_skips_recorded_and_drops_failures() {
    let h = harness();
    h.store
        .upsert_open(&open_record("booli", "1", 3_000_000, 2, &[1, 2], t0()))
        .await
        .unwrap();
    let feed = FakeFeed::new("booli")
        .list("1", t0() + ChronoDuration::hours(1), Ok(detail(1, 2, &[1, 2])))
        .list("2", t0(), Ok(detail(2_000_000, 2, &[3, 4])))
        .list("3", t0(), Err(Failure::Transport));

    let report = h.engine.initialize(&feed).await.unwrap();

    assert_eq!((report.inserted, report.skipped, report.failed), (1, 1, 1));
    assert_eq!(feed.detail_calls(), vec!["2", "3", "3"]);

    let open = h.store.find_open(&booli()).await.unwrap();
    let ids: Vec<&str> = open.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert!(open.iter().all(|r| r.complete));
    assert_eq!(open[0].price, 3_000_000);
    assert!(h.store.find_closed().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn listing_failed_at_initialization_is_added_by_next_sync() {
    let h = harness();
    let feed = FakeFeed::new("booli")
        .list("1", t0(), Ok(detail(2_000_000, 2, &[1, 2])))
        .list("2", t0(), Err(Failure::Transport));

    h.engine.initialize(&feed).await.unwrap();
    feed.set_detail("2", Ok(detail(2_500_000, 3, &[5, 6])));
    let stats = h.engine.sync(&feed).await.unwrap();

    assert_eq!((stats.closed_count, stats.added_count, stats.updated_count), (0, 1, 0));
    assert_eq!(h.store.find_open(&booli()).await.unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn unfinished_placeholder_is_refetched_by_sync() {
    let h = harness();
    h.store
        .upsert_open(&ListingRecord::placeholder(booli(), &descriptor("1", t0()), t0()))
        .await
        .unwrap();
    let feed = FakeFeed::new("booli").list("1", t0(), Ok(detail(2_000_000, 2, &[1, 2])));

    let stats = h.engine.sync(&feed).await.unwrap();

    assert_eq!(stats.added_count, 1);
    assert!(h.store.find_open(&booli()).await.unwrap()[0].complete);
    assert!(h.store.find_closed().await.unwrap().is_empty());
}
