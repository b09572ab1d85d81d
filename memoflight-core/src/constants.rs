//! Default tunables for the function cache.
//!
//! These match the defaults the cache ships with when no [`CacheConfig`]
//! is supplied. All of them can be overridden per cache instance.
//!
//! [`CacheConfig`]: crate::config::CacheConfig

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// CAPACITY
// ═══════════════════════════════════════════════════════════════════════════════

/// Default maximum number of cached results per cache instance.
/// When full, the entry with the oldest insertion time is evicted to
/// admit a new one.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

// ═══════════════════════════════════════════════════════════════════════════════
// EXPIRY
// ═══════════════════════════════════════════════════════════════════════════════

/// Default time-to-live for cached results, measured from insertion.
/// The TTL is uniform per cache; it is not refreshed by hits.
pub const DEFAULT_EXPIRE_AFTER: Duration = Duration::from_secs(5 * 60);

/// Default interval between background expiry sweeps.
/// Expired entries can survive up to one full interval past their TTL
/// before the sweeper removes them.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
