//! Cache configuration.
//!
//! [`CacheConfig`] carries the three tunables a cache instance is built
//! from: capacity, TTL, and sweep cadence. It serializes with
//! human-readable durations ("5m", "90s") so it can live inside a larger
//! application config file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_EXPIRE_AFTER, DEFAULT_MAX_ENTRIES, DEFAULT_SWEEP_INTERVAL};
use crate::error::{CacheError, Result};

/// Configuration for a function cache instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached results held at once.
    pub max_entries: usize,
    /// Time-to-live for cached results, measured from insertion.
    #[serde(with = "humantime_serde")]
    pub expire_after: Duration,
    /// How often the background sweeper scans for expired entries.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            expire_after: DEFAULT_EXPIRE_AFTER,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl CacheConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of cached results.
    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Sets the time-to-live for cached results.
    pub fn expire_after(mut self, expire_after: Duration) -> Self {
        self.expire_after = expire_after;
        self
    }

    /// Sets the interval between expiry sweeps.
    pub fn sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    /// Validates the configuration.
    ///
    /// A capacity of zero would make every insertion evict itself, and a
    /// zero sweep interval would spin the background thread; both are
    /// rejected.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(CacheError::InvalidConfig(
                "max_entries must be at least 1".into(),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "sweep_interval must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
