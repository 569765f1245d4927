use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::parser::PageParser;
use super::traits::SourceFeed;
use super::types::SourceConfig;
use crate::error::{ConfigError, DetailError, FetchError};
use crate::models::{ListingDescriptor, ListingDetail, Source};

pub(crate) const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Feed for marketplaces whose pages are served as plain HTML
pub struct HttpFeed {
    source: Source,
    search_url: String,
    client: Client,
    parser: PageParser,
}

impl HttpFeed {
    pub fn new(config: &SourceConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            source: Source::new(&config.name),
            search_url: config.search_url.clone(),
            client,
            parser: PageParser::new(config)?,
        })
    }

    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        debug!("Fetching URL: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            warn!("{} returned status: {}", self.source, response.status());
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let html = response.text().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: format!("failed to read response body: {}", e),
        })?;

        debug!("Downloaded {} bytes of HTML", html.len());
        Ok(html)
    }
}

#[async_trait]
impl SourceFeed for HttpFeed {
    fn source(&self) -> &Source {
        &self.source
    }

    async fn fetch_short_listings(&self) -> Result<Vec<ListingDescriptor>, FetchError> {
        let html = self.fetch_page(&self.search_url).await?;
        let descriptors = self.parser.parse_short_listings(&html);
        info!("Found {} listings on {}", descriptors.len(), self.source);
        Ok(descriptors)
    }

    async fn fetch_detail(&self, descriptor: &ListingDescriptor) -> Result<ListingDetail, DetailError> {
        let html = self.fetch_page(&descriptor.url).await?;
        Ok(self.parser.parse_detail(&html)?)
    }
}
