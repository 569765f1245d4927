//! Concurrent download and fingerprinting of one listing's photos.

use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{DetailError, FetchError};
use crate::hashing::{DifferenceHasher, Fingerprint};
use crate::scrapers::ImageFetcher;

pub(crate) struct ImageCollector<'a> {
    pub fetcher: &'a dyn ImageFetcher,
    pub hasher: &'a DifferenceHasher,
    pub retry_delay: Duration,
}

impl ImageCollector<'_> {
    /// Fingerprints of every photo that could be fetched, in declared order.
    ///
    /// At least half of the photos must arrive. Otherwise the whole set is
    /// fetched once more after `retry_delay` before giving up.
    pub async fn fingerprints(&self, urls: &[String]) -> Result<Vec<Fingerprint>, DetailError> {
        match self.gather(urls).await {
            Ok(fingerprints) => Ok(fingerprints),
            Err(err) => {
                warn!("{}; retrying image set in {:?}", err, self.retry_delay);
                tokio::time::sleep(self.retry_delay).await;
                self.gather(urls).await
            }
        }
    }

    async fn gather(&self, urls: &[String]) -> Result<Vec<Fingerprint>, DetailError> {
        let results = join_all(urls.iter().map(|url| self.fingerprint(url))).await;

        let mut fingerprints = Vec::with_capacity(urls.len());
        for (url, result) in urls.iter().zip(results) {
            match result {
                Ok(fingerprint) => fingerprints.push(fingerprint),
                Err(err) => debug!("Image {} failed: {}", url, err),
            }
        }

        if fingerprints.len() * 2 >= urls.len() {
            Ok(fingerprints)
        } else {
            Err(DetailError::PartialData {
                fetched: fingerprints.len(),
                declared: urls.len(),
            })
        }
    }

    /// Download one photo and hash it on the blocking pool.
    async fn fingerprint(&self, url: &str) -> Result<Fingerprint, FetchError> {
        let image = self.fetcher.fetch(url).await?;
        let hasher = *self.hasher;

        tokio::task::spawn_blocking(move || hasher.fingerprint(&image))
            .await
            .map_err(|e| FetchError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}
