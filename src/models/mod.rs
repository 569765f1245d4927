use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hashing::Fingerprint;

/// Name of the marketplace a listing was observed on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Source(String);

impl Source {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Short listing entry produced by one feed pass
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingDescriptor {
    pub id: String,
    pub url: String,
    pub last_modified: DateTime<Utc>,
}

/// Fields extracted from a listing's detail page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingDetail {
    pub price: i64,
    pub surface: f64,
    pub rooms_count: u32,
    pub image_urls: Vec<String>,
    pub address: Option<String>,
}

/// Open listing as held by the listing store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingRecord {
    pub id: String,
    pub source: Source,
    pub url: String,
    pub address: Option<String>,
    pub price: i64,
    pub surface: f64,
    pub rooms_count: u32,
    pub image_fingerprints: Vec<Fingerprint>,
    pub last_modified: DateTime<Utc>,
    pub scraped_at: DateTime<Utc>,
    /// False while the initializer is still fetching the listing's detail.
    #[serde(default = "default_complete")]
    pub complete: bool,
}

fn default_complete() -> bool {
    true
}

impl ListingRecord {
    pub fn from_detail(
        source: Source,
        descriptor: &ListingDescriptor,
        detail: ListingDetail,
        image_fingerprints: Vec<Fingerprint>,
        scraped_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: descriptor.id.clone(),
            source,
            url: descriptor.url.clone(),
            address: detail.address,
            price: detail.price,
            surface: detail.surface,
            rooms_count: detail.rooms_count,
            image_fingerprints,
            last_modified: descriptor.last_modified,
            scraped_at,
            complete: true,
        }
    }

    /// Row reserving a listing id before its detail has been fetched.
    pub fn placeholder(
        source: Source,
        descriptor: &ListingDescriptor,
        scraped_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: descriptor.id.clone(),
            source,
            url: descriptor.url.clone(),
            address: None,
            price: 0,
            surface: 0.0,
            rooms_count: 0,
            image_fingerprints: Vec::new(),
            last_modified: descriptor.last_modified,
            scraped_at,
            complete: false,
        }
    }

    pub fn image_count(&self) -> usize {
        self.image_fingerprints.len()
    }
}

/// Archived snapshot of a listing that disappeared from its feed.
///
/// `archive_key` identifies the physical unit's slot in the archive and stays
/// stable when a better canonical copy replaces `listing`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClosedListingRecord {
    pub archive_key: String,
    pub listing: ListingRecord,
    pub closed_date: DateTime<Utc>,
    /// Source whose pass last closed this unit
    pub source: Source,
}

impl ClosedListingRecord {
    pub fn new(listing: ListingRecord, source: Source, closed_date: DateTime<Utc>) -> Self {
        Self {
            archive_key: format!("{}:{}", source, listing.id),
            listing,
            closed_date,
            source,
        }
    }
}

/// Counts for one synchronization pass
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncStats {
    pub source: Source,
    pub date: DateTime<Utc>,
    pub closed_count: usize,
    pub added_count: usize,
    pub updated_count: usize,
}

impl SyncStats {
    pub fn new(source: Source, date: DateTime<Utc>) -> Self {
        Self {
            source,
            date,
            closed_count: 0,
            added_count: 0,
            updated_count: 0,
        }
    }
}

/// Outcome of a cold-start pass
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitReport {
    pub source: Source,
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
}
