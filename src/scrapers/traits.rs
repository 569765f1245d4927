use async_trait::async_trait;
use image::DynamicImage;

use crate::error::{DetailError, FetchError};
use crate::models::{ListingDescriptor, ListingDetail, Source};

/// Capabilities every marketplace adapter provides to the sync engine.
/// New marketplaces are added as another adapter, selected by configuration.
#[async_trait]
pub trait SourceFeed: Send + Sync {
    fn source(&self) -> &Source;

    /// One full pass over the marketplace's current listings.
    async fn fetch_short_listings(&self) -> Result<Vec<ListingDescriptor>, FetchError>;

    /// Fetch and validate one listing's detail page.
    async fn fetch_detail(&self, descriptor: &ListingDescriptor) -> Result<ListingDetail, DetailError>;

    /// Discard the current browsing session and acquire a fresh one.
    async fn renew_session(&self) -> Result<(), FetchError> {
        Ok(())
    }
}

/// Downloads and decodes listing photos
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<DynamicImage, FetchError>;
}
