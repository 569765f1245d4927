//! Same-unit detection between listings.
//!
//! Two listings are the same physical unit when they have the same number of
//! rooms and enough of their photos pair up one-to-one with a hash similarity
//! at or above the threshold.

mod matching;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::SimilarityError;
use crate::hashing::Fingerprint;
use crate::models::ListingRecord;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.90;

/// How photos of two listings are paired up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingStrategy {
    /// First-fit per photo in input order, no backtracking.
    #[default]
    Greedy,
    /// Maximum number of one-to-one pairs above the threshold.
    Maximum,
}

/// Fraction of equal bits between two fingerprints, in `[0, 1]`.
pub fn hash_similarity(a: &Fingerprint, b: &Fingerprint) -> Result<f64, SimilarityError> {
    let distance = a.hamming_distance(b)?;
    let bits = a.bit_len();
    if bits == 0 {
        return Ok(1.0);
    }
    Ok((bits as f64 - distance as f64) / bits as f64)
}

/// Picks the copy of a unit worth keeping: lower price, then larger surface,
/// then more photos. A full tie keeps `a`.
pub fn pick_canonical<'a>(a: &'a ListingRecord, b: &'a ListingRecord) -> &'a ListingRecord {
    let order = a
        .price
        .cmp(&b.price)
        .then_with(|| b.surface.total_cmp(&a.surface))
        .then_with(|| b.image_count().cmp(&a.image_count()));

    match order {
        Ordering::Greater => b,
        Ordering::Less | Ordering::Equal => a,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityDetector {
    threshold: f64,
    strategy: MatchingStrategy,
}

impl SimilarityDetector {
    pub fn new(threshold: f64, strategy: MatchingStrategy) -> Self {
        Self {
            threshold,
            strategy,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn strategy(&self) -> MatchingStrategy {
        self.strategy
    }

    pub fn listings_are_similar(
        &self,
        a: &ListingRecord,
        b: &ListingRecord,
    ) -> Result<bool, SimilarityError> {
        if a.rooms_count != b.rooms_count {
            return Ok(false);
        }
        self.fingerprint_sets_are_similar(&a.image_fingerprints, &b.image_fingerprints)
    }

    pub fn fingerprint_sets_are_similar(
        &self,
        a: &[Fingerprint],
        b: &[Fingerprint],
    ) -> Result<bool, SimilarityError> {
        // No credible listing comes without photos, and a single photo is too
        // ambiguous to identify a unit.
        if a.len() < 2 || b.len() < 2 {
            return Ok(false);
        }

        let (smaller, larger) = if b.len() < a.len() { (b, a) } else { (a, b) };

        let matrix = smaller
            .iter()
            .map(|row| {
                larger
                    .iter()
                    .map(|col| hash_similarity(row, col))
                    .collect::<Result<Vec<f64>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let matched = match self.strategy {
            MatchingStrategy::Greedy => matching::greedy_matches(&matrix, self.threshold),
            MatchingStrategy::Maximum => matching::maximum_matches(&matrix, self.threshold),
        };

        Ok(matching::enough_matches(smaller.len(), matched))
    }
}

impl Default for SimilarityDetector {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD, MatchingStrategy::Greedy)
    }
}
