//! Configuration file for the synchronizer.
//!
//! ```json
//! {
//!   "engine": { "matching": "greedy", "pacing": { "min_ms": 2000, "max_ms": 6000 } },
//!   "store": { "path": "market.json" },
//!   "sources": [
//!     { "name": "booli", "search_url": "https://www.booli.se/sok/till-salu?areaIds=115341",
//!       "base_url": "https://www.booli.se", "transport": "browser" }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::scrapers::SourceConfig;
use crate::sync::EngineConfig;

/// Environment variable naming the config file when no path is given.
pub const CONFIG_ENV: &str = "LISTING_SYNC_CONFIG";

pub const DEFAULT_CONFIG_PATH: &str = "listing-sync.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON snapshot file; the store stays in memory when unset.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub store: StoreConfig,
    pub sources: Vec<SourceConfig>,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.engine.validate()?;
        Ok(config)
    }

    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|error| ConfigError::Read {
                path: path.to_path_buf(),
                error,
            })?;
        Self::from_json(&json)
    }

    /// Explicit argument, then `LISTING_SYNC_CONFIG`, then `listing-sync.json`.
    pub fn resolve_path(arg: Option<String>) -> PathBuf {
        arg.or_else(|| std::env::var(CONFIG_ENV).ok())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }
}
