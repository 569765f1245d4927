//! In-memory working set of the closed archive for one pass.
//!
//! Loaded once, indexed by archive key and by room count, mutated as removed
//! listings are reconciled, then flushed with a single batched upsert. A unit
//! closed earlier in the pass is a merge candidate for units closed later in
//! the same pass, so the outcome follows the order closures are applied in.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::SimilarityError;
use crate::models::{ClosedListingRecord, ListingRecord, Source};
use crate::similarity::{pick_canonical, SimilarityDetector};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClosureOutcome {
    /// Matched an archived unit; `replaced` tells whether the removed copy
    /// became the unit's canonical snapshot.
    Merged { archive_key: String, replaced: bool },
    /// No similar unit; archived as a new closed record.
    Archived { archive_key: String },
}

#[derive(Debug, Default)]
pub struct ClosedArchive {
    records: BTreeMap<String, ClosedListingRecord>,
    /// Archive keys per room count, in candidate order.
    by_rooms: HashMap<u32, Vec<String>>,
    dirty: BTreeSet<String>,
}

impl ClosedArchive {
    pub fn new(records: Vec<ClosedListingRecord>) -> Self {
        let mut archive = Self::default();
        let sorted: BTreeMap<String, ClosedListingRecord> = records
            .into_iter()
            .map(|record| (record.archive_key.clone(), record))
            .collect();

        for record in sorted.into_values() {
            archive.insert(record);
        }
        archive
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, archive_key: &str) -> Option<&ClosedListingRecord> {
        self.records.get(archive_key)
    }

    fn insert(&mut self, record: ClosedListingRecord) {
        let key = record.archive_key.clone();
        let rooms = record.listing.rooms_count;

        if let Some(previous) = self.records.insert(key.clone(), record) {
            if let Some(keys) = self.by_rooms.get_mut(&previous.listing.rooms_count) {
                keys.retain(|k| k != &key);
            }
        }
        self.by_rooms.entry(rooms).or_default().push(key);
    }

    /// First archived unit, in candidate order, similar to `listing`.
    fn find_match(
        &self,
        listing: &ListingRecord,
        detector: &SimilarityDetector,
    ) -> Result<Option<String>, SimilarityError> {
        let Some(candidates) = self.by_rooms.get(&listing.rooms_count) else {
            return Ok(None);
        };

        for key in candidates {
            if let Some(closed) = self.records.get(key) {
                if detector.listings_are_similar(&closed.listing, listing)? {
                    return Ok(Some(key.clone()));
                }
            }
        }
        Ok(None)
    }

    /// Reconcile one listing that left `source`'s feed.
    pub fn close(
        &mut self,
        listing: ListingRecord,
        source: &Source,
        closed_date: DateTime<Utc>,
        detector: &SimilarityDetector,
    ) -> Result<ClosureOutcome, SimilarityError> {
        let Some(key) = self.find_match(&listing, detector)? else {
            let record = ClosedListingRecord::new(listing, source.clone(), closed_date);
            let archive_key = record.archive_key.clone();
            self.insert(record);
            self.dirty.insert(archive_key.clone());
            return Ok(ClosureOutcome::Archived { archive_key });
        };

        let mut merged = self.records[&key].clone();
        let replaced = !std::ptr::eq(pick_canonical(&merged.listing, &listing), &merged.listing);
        if replaced {
            merged.listing = listing;
        }
        merged.closed_date = closed_date;
        merged.source = source.clone();

        self.records.insert(key.clone(), merged);
        self.dirty.insert(key.clone());

        Ok(ClosureOutcome::Merged {
            archive_key: key,
            replaced,
        })
    }

    /// Records changed since loading, ordered by archive key.
    pub fn take_dirty(&mut self) -> Vec<ClosedListingRecord> {
        std::mem::take(&mut self.dirty)
            .into_iter()
            .filter_map(|key| self.records.get(&key).cloned())
            .collect()
    }
}
