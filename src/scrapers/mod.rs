pub mod browser;
pub mod http;
pub mod images;
pub mod parser;
pub mod traits;
pub mod types;

pub use browser::{BrowserFeed, BrowserSession};
pub use http::HttpFeed;
pub use images::HttpImageFetcher;
pub use parser::PageParser;
pub use traits::{ImageFetcher, SourceFeed};
pub use types::{Selectors, SourceConfig, Transport};

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::ConfigError;

/// Build the adapter matching a source's configured transport.
pub fn build_feed(config: &SourceConfig) -> Result<Arc<dyn SourceFeed>, ConfigError> {
    Ok(match config.transport {
        Transport::Http => Arc::new(HttpFeed::new(config)?),
        Transport::Browser => Arc::new(BrowserFeed::new(config)?),
    })
}

/// Build one adapter per configured source. Source names must be unique.
pub fn build_feeds(configs: &[SourceConfig]) -> Result<Vec<Arc<dyn SourceFeed>>, ConfigError> {
    let mut names = HashSet::new();
    configs
        .iter()
        .map(|config| {
            if !names.insert(config.name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate source {:?}", config.name)));
            }
            build_feed(config)
        })
        .collect()
}
