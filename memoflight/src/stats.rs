//! Cache statistics.

/// Point-in-time statistics for a [`FunctionCache`].
///
/// Counters are cumulative since the cache was created. Every settled call
/// lands in exactly one of `hits`, `misses`, or `unavailable`; `waits`
/// additionally counts the hits and unavailables that first waited on
/// another caller's computation.
///
/// [`FunctionCache`]: crate::FunctionCache
#[derive(Clone, Debug, Default)]
pub struct CacheStats {
    /// Calls served from the store, including after a wait.
    pub hits: u64,
    /// Calls that ran the underlying function.
    pub misses: u64,
    /// Entries evicted to admit new ones at capacity.
    pub evictions: u64,
    /// Entries removed by the expiry sweeper.
    pub expirations: u64,
    /// Calls that joined another caller's in-flight computation.
    pub waits: u64,
    /// Waited calls whose result was gone again on wake-up.
    pub unavailable: u64,
    /// Results currently in the store.
    pub entries: usize,
    /// Configured maximum number of results.
    pub capacity: usize,
}

impl CacheStats {
    /// Percentage of resolved calls served from the store.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64 * 100.0
    }
}
