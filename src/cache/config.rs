//! Cache configuration.
//!
//! Controls the collection TTL and the per-slug cache capacity.

use std::num::NonZeroUsize;

use serde::Deserialize;
use time::Duration;

// Default values for cache configuration
const DEFAULT_TTL_SECONDS: u64 = 300;
const DEFAULT_SLUG_LIMIT: usize = 64;

/// Cache tuning knobs resolved from configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds a written entry stays fresh. Measured from write time, never
    /// reset on read.
    pub ttl_seconds: u64,
    /// Maximum entries in the per-slug LRU cache.
    pub slug_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_TTL_SECONDS,
            slug_limit: DEFAULT_SLUG_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            ttl_seconds: settings.ttl.as_secs(),
            slug_limit: settings.slug_limit.get(),
        }
    }
}

impl CacheConfig {
    /// TTL as a signed duration for clock arithmetic.
    pub fn ttl(&self) -> Duration {
        Duration::seconds(i64::try_from(self.ttl_seconds).unwrap_or(i64::MAX))
    }

    /// Returns the slug cache limit as NonZeroUsize, clamping to 1 if zero.
    pub fn slug_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.slug_limit).unwrap_or(NonZeroUsize::MIN)
    }
}
