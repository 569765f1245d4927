use async_trait::async_trait;
use image::DynamicImage;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::http::USER_AGENT;
use super::traits::ImageFetcher;
use crate::error::{ConfigError, FetchError};

/// Downloads listing photos over HTTP and decodes them in memory
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new() -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<DynamicImage, FetchError> {
        let transport = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(transport)?;
        debug!("Downloaded {} bytes from {}", bytes.len(), url);

        let decode_url = url.to_string();
        tokio::task::spawn_blocking(move || {
            image::load_from_memory(&bytes).map_err(|e| FetchError::Decode {
                url: decode_url,
                message: e.to_string(),
            })
        })
        .await
        .map_err(|e| FetchError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })?
    }
}
