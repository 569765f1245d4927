//! Error types for the listing synchronizer.
//!
//! Per-listing failures ([`DetailError`]) are isolated by the engine: logged,
//! skipped, and the pass continues. Pass-level failures ([`SyncError`]) abort
//! the remainder of one source's pass and leave other sources untouched.

use std::path::PathBuf;
use thiserror::Error;

use crate::models::Source;

/// Transport-level failure talking to a feed, a browser session or an image host.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("browser session error: {0}")]
    Session(String),

    #[error("could not decode image from {url}: {message}")]
    Decode { url: String, message: String },
}

/// A fetched detail page that does not describe a complete, plausible listing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("listing has no {0}")]
    MissingField(&'static str),

    #[error("price {price} is below the floor of {floor}")]
    PriceBelowFloor { price: i64, floor: i64 },

    #[error("listing is marked as expired")]
    Expired,

    #[error("could not parse {field} from {value:?}")]
    Unparsable { field: &'static str, value: String },
}

/// Failure to turn one listing descriptor into a stored record.
#[derive(Error, Debug)]
pub enum DetailError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("only {fetched} of {declared} images could be fetched")]
    PartialData { fetched: usize, declared: usize },
}

impl DetailError {
    /// Transport failures may mean the browsing session is broken and should be replaced.
    pub fn is_unexpected(&self) -> bool {
        matches!(self, DetailError::Fetch(_))
    }
}

/// Comparing fingerprints produced with different grid sizes is a programming error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimilarityError {
    #[error("cannot compare fingerprints of {left} and {right} bits")]
    LengthMismatch { left: usize, right: usize },
}

#[derive(Error, Debug)]
#[error("invalid fingerprint hex: {0:?}")]
pub struct FingerprintParseError(pub String);

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Unrecoverable failure of one source's pass.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("feed for {feed} is unreachable: {error}")]
    FeedUnreachable {
        feed: Source,
        #[source]
        error: FetchError,
    },

    #[error("could not reacquire a browsing session for {feed}: {error}")]
    SessionLost {
        feed: Source,
        #[source]
        error: FetchError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("fatal comparison error: {0}")]
    Fatal(#[from] SimilarityError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config {path}: {error}")]
    Read {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("could not parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
