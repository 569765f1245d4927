//! Engine configuration and defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;
use crate::hashing::DEFAULT_GRID_SIZE;
use crate::retry::RetryPolicy;
use crate::similarity::{MatchingStrategy, DEFAULT_SIMILARITY_THRESHOLD};

/// Delay before the single retry of a listing's image set.
pub const DEFAULT_IMAGE_RETRY_DELAY_MS: u64 = 5_000;

/// Random delay drawn before every listing fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingConfig {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_ms: 2_000,
            max_ms: 6_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// dHash grid size; fingerprints have `grid_size²` bits.
    pub grid_size: u32,
    pub similarity_threshold: f64,
    pub matching: MatchingStrategy,
    /// `None` disables pacing, e.g. for batch runs and tests.
    pub pacing: Option<PacingConfig>,
    pub image_retry_delay_ms: u64,
    /// Applied to the short-listing fetch; exhaustion aborts the pass.
    pub feed_retry: RetryPolicy,
    /// Applied to transport failures of a detail fetch; exhaustion skips the
    /// listing. Validation failures are never retried.
    pub detail_retry: RetryPolicy,
    /// Applied to browser session renewal; exhaustion aborts the pass.
    pub session_retry: RetryPolicy,
    /// Applied to every store call.
    pub store_retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            matching: MatchingStrategy::Greedy,
            pacing: Some(PacingConfig::default()),
            image_retry_delay_ms: DEFAULT_IMAGE_RETRY_DELAY_MS,
            feed_retry: RetryPolicy::bounded(Duration::from_secs(10), 3),
            detail_retry: RetryPolicy::bounded(Duration::from_secs(3), 3),
            session_retry: RetryPolicy::bounded(Duration::from_secs(5), 3),
            store_retry: RetryPolicy::bounded(Duration::from_secs(2), 5),
        }
    }
}

impl EngineConfig {
    pub fn image_retry_delay(&self) -> Duration {
        Duration::from_millis(self.image_retry_delay_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let cells = self.grid_size.checked_mul(self.grid_size);
        if self.grid_size == 0 || cells.map_or(true, |cells| cells % 8 != 0) {
            return Err(ConfigError::Invalid(format!(
                "grid_size {} must be positive with grid_size² divisible by 8",
                self.grid_size
            )));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::Invalid(format!(
                "similarity_threshold {} must be within [0, 1]",
                self.similarity_threshold
            )));
        }
        if let Some(pacing) = self.pacing {
            if pacing.min_ms > pacing.max_ms {
                return Err(ConfigError::Invalid(format!(
                    "pacing min_ms {} exceeds max_ms {}",
                    pacing.min_ms, pacing.max_ms
                )));
            }
        }
        Ok(())
    }
}
