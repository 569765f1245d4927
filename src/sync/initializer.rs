//! Cold start for a source without prior state.
//!
//! Listings are identified by their id alone: nothing is closed and no
//! similarity matching happens. A placeholder row is written before each
//! fetch and removed again when the fetch fails, so a later pass picks the
//! listing up as new.

use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use super::engine::SyncEngine;
use crate::error::SyncError;
use crate::models::{InitReport, ListingRecord};
use crate::scrapers::SourceFeed;

impl SyncEngine {
    pub async fn initialize(&self, feed: &dyn SourceFeed) -> Result<InitReport, SyncError> {
        let source = feed.source().clone();
        info!("Initializing {}", source);

        let descriptors = self.fetch_short_listings(feed).await?;
        let recorded: HashMap<String, bool> = self
            .store
            .find_open(&source)
            .await?
            .into_iter()
            .map(|record| (record.id, record.complete))
            .collect();

        let mut report = InitReport {
            source: source.clone(),
            inserted: 0,
            skipped: 0,
            failed: 0,
        };
        let mut seen = HashSet::new();

        for descriptor in descriptors {
            if !seen.insert(descriptor.id.clone()) {
                continue;
            }
            if recorded.get(&descriptor.id).copied().unwrap_or(false) {
                report.skipped += 1;
                continue;
            }

            self.store
                .upsert_open(&ListingRecord::placeholder(source.clone(), &descriptor, Utc::now()))
                .await?;

            match self.fetch_record(feed, &descriptor).await {
                Ok(record) => {
                    self.store.upsert_open(&record).await?;
                    report.inserted += 1;
                    debug!("{}: inserted listing {}", source, descriptor.id);
                }
                Err(err) => {
                    self.store.delete_open(&source, &descriptor.id).await?;
                    report.failed += 1;
                    self.recover(feed, &descriptor, err).await?;
                }
            }
        }

        info!(
            "Initialized {}: {} inserted, {} already recorded, {} failed",
            source, report.inserted, report.skipped, report.failed
        );
        Ok(report)
    }
}
