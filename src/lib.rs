//! Listing synchronizer: keeps a persistent market view of real-estate
//! listings consistent with continuously re-fetched marketplace feeds, and
//! merges listings of the same physical unit using perceptual image hashes.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use listing_sync::{build_feeds, sync_all, Config, HttpImageFetcher, MemoryStore, SyncEngine};
//!
//! let config = Config::load("listing-sync.json".as_ref()).await?;
//! let engine = SyncEngine::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(HttpImageFetcher::new()?),
//!     config.engine.clone(),
//! )?;
//! let feeds = build_feeds(&config.sources)?;
//! for (source, result) in sync_all(&engine, &feeds).await {
//!     println!("{}: {:?}", source, result);
//! }
//! ```

pub mod config;
pub mod error;
pub mod hashing;
pub mod models;
pub mod retry;
pub mod scrapers;
pub mod similarity;
pub mod store;
pub mod sync;

pub use config::Config;
pub use error::{
    ConfigError, DetailError, FetchError, SimilarityError, StoreError, SyncError, ValidationError,
};
pub use hashing::{DifferenceHasher, Fingerprint};
pub use models::{
    ClosedListingRecord, InitReport, ListingDescriptor, ListingDetail, ListingRecord, Source,
    SyncStats,
};
pub use retry::{retry, retry_if, RetryPolicy};
pub use scrapers::{build_feeds, HttpImageFetcher, ImageFetcher, SourceFeed};
pub use similarity::{hash_similarity, pick_canonical, MatchingStrategy, SimilarityDetector};
pub use store::{JsonFileStore, ListingStore, MemoryStore, RetryingStore};
pub use sync::{initialize_all, sync_all, EngineConfig, SyncEngine};
