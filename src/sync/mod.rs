//! Synchronization of the market view with the source feeds.
//!
//! - [`engine`] - `SyncEngine::sync()`, one reconciliation pass per source
//! - [`initializer`] - `SyncEngine::initialize()`, cold start without closures
//! - [`archive`] - closed-archive working set used while closing listings
//! - [`types`] - `EngineConfig` and defaults
//!
//! Passes for different sources own disjoint state and may run concurrently;
//! within one pass listings are processed sequentially.

pub mod archive;
pub mod engine;
mod images;
mod initializer;
mod plan;
pub mod types;

pub use archive::{ClosedArchive, ClosureOutcome};
pub use engine::SyncEngine;
pub use types::{EngineConfig, PacingConfig, DEFAULT_IMAGE_RETRY_DELAY_MS};

use futures::future::join_all;
use std::sync::Arc;
use tracing::error;

use crate::error::SyncError;
use crate::models::{InitReport, Source, SyncStats};
use crate::scrapers::SourceFeed;

/// Run one pass per feed concurrently. A failing source does not affect the others.
pub async fn sync_all(
    engine: &SyncEngine,
    feeds: &[Arc<dyn SourceFeed>],
) -> Vec<(Source, Result<SyncStats, SyncError>)> {
    join_all(feeds.iter().map(|feed| async move {
        let result = engine.sync(feed.as_ref()).await;
        if let Err(err) = &result {
            error!("Sync pass for {} aborted: {}", feed.source(), err);
        }
        (feed.source().clone(), result)
    }))
    .await
}

/// Cold-start every feed concurrently.
pub async fn initialize_all(
    engine: &SyncEngine,
    feeds: &[Arc<dyn SourceFeed>],
) -> Vec<(Source, Result<InitReport, SyncError>)> {
    join_all(feeds.iter().map(|feed| async move {
        let result = engine.initialize(feed.as_ref()).await;
        if let Err(err) = &result {
            error!("Initialization of {} aborted: {}", feed.source(), err);
        }
        (feed.source().clone(), result)
    }))
    .await
}
