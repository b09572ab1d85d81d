//! Memoizing function cache with single-flight deduplication.
//!
//! One exclusive lock guards the result store, the in-flight marker table,
//! and the counters together, so a call observes them atomically. The
//! wrapped function itself always runs outside the lock.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use memoflight_core::config::CacheConfig;
use memoflight_core::error::{CacheError, Result};
use memoflight_core::fingerprint::{CacheArgs, Fingerprint};

use crate::flight::Flight;
use crate::stats::CacheStats;
use crate::sweeper::{self, SweeperHandle};

/// A stored result. Values are type-erased so one store can serve wrapped
/// functions with different result types; the wrapper restores the concrete
/// type on the way out.
struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    inserted_at: Instant,
}

#[derive(Default)]
struct Counters {
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
    waits: u64,
    unavailable: u64,
}

/// Everything guarded by the store lock.
struct Shared {
    entries: HashMap<Fingerprint, Entry>,
    inflight: HashMap<Fingerprint, Arc<Flight>>,
    counters: Counters,
}

impl Shared {
    /// Admits a freshly computed result, evicting the oldest entry first
    /// when the store is at capacity.
    fn store(&mut self, key: Fingerprint, value: Arc<dyn Any + Send + Sync>, max_entries: usize) {
        if self.entries.len() >= max_entries {
            self.evict_oldest();
        }
        self.entries.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Removes the entry with the oldest insertion time.
    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.inserted_at)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
            self.counters.evictions += 1;
            debug!(key = %key, remaining = self.entries.len(), "evicted oldest entry");
        }
    }
}

/// Restores the concrete result type of a stored value.
fn downcast<R: Clone + 'static>(value: &Arc<dyn Any + Send + Sync>) -> Result<R> {
    value
        .downcast_ref::<R>()
        .cloned()
        .ok_or(CacheError::TypeMismatch)
}

/// Engine internals shared by the cache handle, its wrappers, and the
/// sweeper thread.
pub(crate) struct CacheInner {
    shared: Mutex<Shared>,
    pub(crate) config: CacheConfig,
    next_namespace: AtomicU64,
}

impl CacheInner {
    fn new(config: CacheConfig) -> Self {
        Self {
            shared: Mutex::new(Shared {
                entries: HashMap::with_capacity(config.max_entries),
                inflight: HashMap::new(),
                counters: Counters::default(),
            }),
            config,
            next_namespace: AtomicU64::new(0),
        }
    }

    /// Removes entries older than the configured TTL and reports how many
    /// were dropped. Called by the sweeper; never touches in-flight
    /// markers.
    pub(crate) fn sweep(&self) -> usize {
        let now = Instant::now();
        let expire_after = self.config.expire_after;
        let mut shared = self.shared.lock();
        let before = shared.entries.len();
        shared.entries.retain(|key, entry| {
            let expired = now.saturating_duration_since(entry.inserted_at) > expire_after;
            if expired {
                trace!(key = %key, "entry expired");
            }
            !expired
        });
        let removed = before - shared.entries.len();
        shared.counters.expirations += removed as u64;
        removed
    }

    fn delete(&self, key: &Fingerprint) -> bool {
        self.shared.lock().entries.remove(key).is_some()
    }

    /// Resolves one wrapped call: serve a hit, join an in-flight
    /// computation, or compute and publish.
    fn get_or_compute<A, R, F>(&self, key: Fingerprint, args: &A, func: &F) -> Result<R>
    where
        R: Clone + Send + Sync + 'static,
        F: Fn(&A) -> R,
    {
        let mut shared = self.shared.lock();

        if let Some(entry) = shared.entries.get(&key) {
            let value = downcast::<R>(&entry.value);
            shared.counters.hits += 1;
            trace!(key = %key, "cache hit");
            return value;
        }

        if let Some(flight) = shared.inflight.get(&key) {
            let flight = Arc::clone(flight);
            // The completion lock must be taken before the store lock is
            // released; a completion broadcast in between would otherwise
            // be missed forever.
            let done = flight.begin_wait();
            shared.counters.waits += 1;
            trace!(key = %key, waiting = flight.waiters(), "joining in-flight computation");
            drop(shared);

            flight.wait(done);

            let mut shared = self.shared.lock();
            return match shared.entries.get(&key) {
                Some(entry) => {
                    let value = downcast::<R>(&entry.value);
                    shared.counters.hits += 1;
                    trace!(key = %key, "cache hit after wait");
                    value
                }
                None => {
                    shared.counters.unavailable += 1;
                    debug!(key = %key, "result gone after wait");
                    Err(CacheError::Unavailable)
                }
            };
        }

        let flight = Arc::new(Flight::new());
        shared.inflight.insert(key.clone(), Arc::clone(&flight));
        shared.counters.misses += 1;
        trace!(key = %key, "cache miss, computing");
        drop(shared);

        // If func panics, the guard removes the marker and wakes the
        // waiters; they observe the missing result as Unavailable while
        // the panic propagates to this caller.
        let mut guard = FlightGuard {
            inner: self,
            key: &key,
            flight: &flight,
            armed: true,
        };
        let value = func(args);

        let mut shared = self.shared.lock();
        shared.store(key.clone(), Arc::new(value.clone()), self.config.max_entries);
        shared.inflight.remove(&key);
        guard.armed = false;
        let waiting = flight.waiters();
        drop(shared);
        flight.complete();
        trace!(key = %key, waiting, "stored computed result");

        Ok(value)
    }
}

/// Cleans up after a computation that never published a result.
///
/// Disarmed on the normal path once the result is stored and the marker
/// removed; on unwind it removes the marker and completes the flight so
/// waiters are not stranded.
struct FlightGuard<'a> {
    inner: &'a CacheInner,
    key: &'a Fingerprint,
    flight: &'a Flight,
    armed: bool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut shared = self.inner.shared.lock();
        shared.inflight.remove(self.key);
        drop(shared);
        self.flight.complete();
        warn!(key = %self.key, "computation panicked; waiters released without a result");
    }
}

/// Process-local memoizing function cache.
///
/// Owns the result store and the background expiry sweeper. Wrappers
/// created through [`FunctionCache::wrap`] share the store and stay usable
/// after the cache handle is closed or dropped; only expiry stops then.
pub struct FunctionCache {
    inner: Arc<CacheInner>,
    sweeper: SweeperHandle,
}

impl FunctionCache {
    /// Creates a cache with default configuration and starts its sweeper.
    pub fn new() -> Self {
        Self::start(CacheConfig::default())
    }

    /// Creates a cache with the given configuration.
    ///
    /// # Errors
    ///
    /// [`CacheError::InvalidConfig`] if the configuration fails
    /// [`CacheConfig::validate`].
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::start(config))
    }

    fn start(config: CacheConfig) -> Self {
        debug!(
            max_entries = config.max_entries,
            expire_after = ?config.expire_after,
            sweep_interval = ?config.sweep_interval,
            "function cache started"
        );
        let inner = Arc::new(CacheInner::new(config));
        let sweeper = sweeper::spawn(Arc::clone(&inner));
        Self { inner, sweeper }
    }

    /// Wraps a function into a memoized [`CachedFn`] backed by this cache.
    ///
    /// The function must be deterministic for memoization to make sense;
    /// the cache assumes equal arguments produce interchangeable results.
    /// Results must be `Clone`, since every hit clones the stored value
    /// out.
    ///
    /// Each wrapper gets its own key namespace, so two wrapped functions
    /// never share slots even when their argument tuples encode alike.
    pub fn wrap<A, R, F>(&self, func: F) -> CachedFn<A, R, F>
    where
        A: CacheArgs,
        R: Clone + Send + Sync + 'static,
        F: Fn(&A) -> R,
    {
        let namespace = self.inner.next_namespace.fetch_add(1, Ordering::SeqCst);
        debug!(namespace, "wrapped function");
        CachedFn {
            inner: Arc::clone(&self.inner),
            func: Arc::new(func),
            namespace,
            _marker: PhantomData,
        }
    }

    /// Current statistics snapshot.
    pub fn stats(&self) -> CacheStats {
        let shared = self.inner.shared.lock();
        CacheStats {
            hits: shared.counters.hits,
            misses: shared.counters.misses,
            evictions: shared.counters.evictions,
            expirations: shared.counters.expirations,
            waits: shared.counters.waits,
            unavailable: shared.counters.unavailable,
            entries: shared.entries.len(),
            capacity: self.inner.config.max_entries,
        }
    }

    /// Number of cached results.
    pub fn len(&self) -> usize {
        self.inner.shared.lock().entries.len()
    }

    /// Returns true if no results are cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if a result is stored under the given fingerprint.
    pub fn contains(&self, key: &Fingerprint) -> bool {
        self.inner.shared.lock().entries.contains_key(key)
    }

    /// Drops every cached result. In-flight computations are unaffected;
    /// a waiter whose result is cleared before it wakes observes it as
    /// unavailable.
    pub fn clear(&self) {
        self.inner.shared.lock().entries.clear();
        debug!("cache cleared");
    }

    /// Stops the background sweeper and waits for it to exit.
    ///
    /// Idempotent; also runs on drop. Existing wrappers keep serving and
    /// storing results afterwards, but nothing expires any more.
    pub fn close(&mut self) {
        self.sweeper.stop();
    }
}

impl Default for FunctionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FunctionCache {
    fn drop(&mut self) {
        self.sweeper.stop();
    }
}

impl fmt::Debug for FunctionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // never block in Debug
        let entries = self
            .inner
            .shared
            .try_lock()
            .map(|shared| shared.entries.len());
        f.debug_struct("FunctionCache")
            .field("entries", &entries)
            .field("capacity", &self.inner.config.max_entries)
            .finish()
    }
}

/// A memoized function bound to a [`FunctionCache`].
///
/// Cheap to clone; clones share the same cache slots. The wrapper is
/// `Send + Sync` whenever the wrapped function is, so one instance can
/// serve many threads.
pub struct CachedFn<A, R, F> {
    inner: Arc<CacheInner>,
    func: Arc<F>,
    namespace: u64,
    _marker: PhantomData<fn(&A) -> R>,
}

impl<A, R, F> CachedFn<A, R, F>
where
    A: CacheArgs,
    R: Clone + Send + Sync + 'static,
    F: Fn(&A) -> R,
{
    /// Calls the function through the cache.
    ///
    /// Returns the stored result when one exists, joins a concurrent
    /// identical call when one is in flight, and otherwise computes and
    /// publishes the result for later callers.
    ///
    /// # Errors
    ///
    /// [`CacheError::Unavailable`] when this call waited on another
    /// caller's computation and the result was gone again by the time it
    /// woke (evicted, expired, cleared, or the computation panicked).
    /// Retrying the call recomputes.
    ///
    /// # Panics
    ///
    /// Panics from the wrapped function propagate to the caller that ran
    /// it; concurrent waiters get [`CacheError::Unavailable`] instead.
    pub fn call(&self, args: A) -> Result<R> {
        let key = self.fingerprint(&args);
        self.inner.get_or_compute(key, &args, self.func.as_ref())
    }

    /// The cache key this wrapper uses for the given arguments.
    pub fn fingerprint(&self, args: &A) -> Fingerprint {
        Fingerprint::scoped(self.namespace, args)
    }

    /// Removes the stored result for the given arguments, if any, so the
    /// next call recomputes. Returns true if a result was removed.
    pub fn invalidate(&self, args: &A) -> bool {
        let key = self.fingerprint(args);
        let removed = self.inner.delete(&key);
        if removed {
            trace!(key = %key, "invalidated");
        }
        removed
    }
}

impl<A, R, F> Clone for CachedFn<A, R, F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            func: Arc::clone(&self.func),
            namespace: self.namespace,
            _marker: PhantomData,
        }
    }
}

impl<A, R, F> fmt::Debug for CachedFn<A, R, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedFn")
            .field("namespace", &self.namespace)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    /// Opt-in log output for debugging: RUST_LOG=trace cargo test
    fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn counting_square(calls: &Arc<AtomicUsize>) -> impl Fn(&(u64,)) -> u64 {
        let calls = Arc::clone(calls);
        move |&(n,): &(u64,)| {
            calls.fetch_add(1, Ordering::SeqCst);
            n * n
        }
    }

    /// Polls `cond` until it holds or two seconds pass.
    fn wait_until(cond: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn test_call_memoizes() {
        let cache = FunctionCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let square = cache.wrap(counting_square(&calls));

        assert_eq!(square.call((4,)).unwrap(), 16);
        assert_eq!(square.call((4,)).unwrap(), 16);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(square.call((5,)).unwrap(), 25);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_distinct_arguments_get_distinct_slots() {
        let cache = FunctionCache::new();
        let concat = cache.wrap(|(a, b): &(String, String)| format!("{a}{b}"));

        assert_eq!(concat.call(("ab".into(), "c".into())).unwrap(), "abc");
        assert_eq!(concat.call(("a".into(), "bc".into())).unwrap(), "abc");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_wrappers_do_not_share_slots() {
        let cache = FunctionCache::new();
        let double = cache.wrap(|&(n,): &(u32,)| u64::from(n) * 2);
        let label = cache.wrap(|&(n,): &(u32,)| format!("n={n}"));

        assert_eq!(double.call((7,)).unwrap(), 14);
        assert_eq!(label.call((7,)).unwrap(), "n=7");
        assert_eq!(cache.len(), 2);
        assert_ne!(double.fingerprint(&(7,)), label.fingerprint(&(7,)));
    }

    #[test]
    fn test_hits_clone_the_stored_result() {
        let cache = FunctionCache::new();
        let split = cache.wrap(|(s,): &(String,)| {
            s.split(' ').map(str::to_owned).collect::<Vec<String>>()
        });

        let first = split.call(("a b c".into(),)).unwrap();
        let second = split.call(("a b c".into(),)).unwrap();
        assert_eq!(first, vec!["a", "b", "c"]);
        assert_eq!(first, second);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache =
            FunctionCache::with_config(CacheConfig::new().max_entries(2)).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let add = cache.wrap({
            let calls = Arc::clone(&calls);
            move |&(a, b): &(u64, u64)| {
                calls.fetch_add(1, Ordering::SeqCst);
                a + b
            }
        });

        // Space the insertions out so their timestamps are distinct.
        add.call((1, 2)).unwrap();
        thread::sleep(Duration::from_millis(5));
        add.call((3, 4)).unwrap();
        thread::sleep(Duration::from_millis(5));
        add.call((5, 6)).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&add.fingerprint(&(1, 2))));
        assert!(cache.contains(&add.fingerprint(&(3, 4))));
        assert!(cache.contains(&add.fingerprint(&(5, 6))));
        assert_eq!(cache.stats().evictions, 1);

        // The evicted pair recomputes; the newest survivor still serves.
        assert_eq!(add.call((1, 2)).unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        add.call((5, 6)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_hits_do_not_trigger_eviction() {
        let cache =
            FunctionCache::with_config(CacheConfig::new().max_entries(2)).unwrap();
        let square = cache.wrap(|&(n,): &(u64,)| n * n);

        square.call((1,)).unwrap();
        square.call((2,)).unwrap();
        for _ in 0..10 {
            square.call((1,)).unwrap();
            square.call((2,)).unwrap();
        }
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_expired_entries_are_swept_and_recomputed() {
        let cache = FunctionCache::with_config(
            CacheConfig::new()
                .max_entries(16)
                .expire_after(Duration::from_millis(50))
                .sweep_interval(Duration::from_millis(10)),
        )
        .unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let square = cache.wrap(counting_square(&calls));

        square.call((6,)).unwrap();
        assert_eq!(cache.len(), 1);

        assert!(wait_until(|| cache.is_empty()));
        assert_eq!(cache.stats().expirations, 1);

        assert_eq!(square.call((6,)).unwrap(), 36);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_sweeper_leaves_inflight_markers_alone() {
        let cache = FunctionCache::with_config(
            CacheConfig::new()
                .max_entries(4)
                .expire_after(Duration::from_millis(30))
                .sweep_interval(Duration::from_millis(10)),
        )
        .unwrap();
        let release = Arc::new(Barrier::new(2));
        let slow = cache.wrap({
            let release = Arc::clone(&release);
            move |&(n,): &(u32,)| {
                release.wait();
                n * 2
            }
        });
        let key = slow.fingerprint(&(5,));

        let computer = thread::spawn({
            let slow = slow.clone();
            move || slow.call((5,))
        });

        assert!(wait_until(|| {
            cache.inner.shared.lock().inflight.contains_key(&key)
        }));
        // Several sweep intervals pass while the computation is stuck.
        thread::sleep(Duration::from_millis(60));
        assert!(cache.inner.shared.lock().inflight.contains_key(&key));

        release.wait();
        assert_eq!(computer.join().unwrap().unwrap(), 10);
        assert!(cache.inner.shared.lock().inflight.is_empty());
    }

    #[test]
    fn test_concurrent_identical_calls_share_one_execution() {
        init_logging();
        let cache = FunctionCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let release = Arc::new(Barrier::new(2));
        let add = cache.wrap({
            let calls = Arc::clone(&calls);
            let release = Arc::clone(&release);
            move |&(a, b): &(u32, u32)| {
                calls.fetch_add(1, Ordering::SeqCst);
                release.wait();
                a + b
            }
        });

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let add = add.clone();
                thread::spawn(move || add.call((1, 2)))
            })
            .collect();

        // One thread computes; the other seven must all be registered as
        // waiters before the computation is allowed to finish.
        assert!(wait_until(|| cache.stats().waits == 7));
        release.wait();

        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), 3);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 7);
        assert_eq!(stats.waits, 7);
        assert_eq!(stats.unavailable, 0);
    }

    #[test]
    fn test_waiter_gets_unavailable_when_result_vanishes() {
        let cache = FunctionCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let square = cache.wrap(counting_square(&calls));
        let key = square.fingerprint(&(7,));

        // Plant a marker as if another caller were computing this key.
        let flight = Arc::new(Flight::new());
        cache
            .inner
            .shared
            .lock()
            .inflight
            .insert(key.clone(), Arc::clone(&flight));

        let waiter = thread::spawn({
            let square = square.clone();
            move || square.call((7,))
        });
        assert!(wait_until(|| flight.waiters() == 1));

        // Complete the flight without ever storing a result, as if the
        // entry had been evicted between store and wake-up.
        cache.inner.shared.lock().inflight.remove(&key);
        flight.complete();

        let result = waiter.join().unwrap();
        let err = result.unwrap_err();
        assert!(matches!(err, CacheError::Unavailable));
        assert!(err.is_retryable());
        // The waiter never fell back to computing on its own.
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(cache.stats().unavailable, 1);
    }

    #[test]
    fn test_panicking_computation_releases_waiters() {
        init_logging();
        let cache = FunctionCache::new();
        let release = Arc::new(Barrier::new(2));
        let faulty = cache.wrap({
            let release = Arc::clone(&release);
            move |&(n,): &(u32,)| -> u32 {
                release.wait();
                panic!("computation failed for {n}");
            }
        });

        let first = thread::spawn({
            let faulty = faulty.clone();
            move || faulty.call((1,))
        });
        let second = thread::spawn({
            let faulty = faulty.clone();
            move || faulty.call((1,))
        });

        // Whichever thread lost the race is parked as a waiter; only then
        // let the computation run into its panic.
        assert!(wait_until(|| cache.stats().waits == 1));
        release.wait();

        let results = [first.join(), second.join()];
        let mut panicked = 0;
        let mut unavailable = 0;
        for result in results {
            match result {
                Err(_) => panicked += 1,
                Ok(Err(CacheError::Unavailable)) => unavailable += 1,
                Ok(other) => panic!("unexpected call outcome: {other:?}"),
            }
        }
        assert_eq!(panicked, 1);
        assert_eq!(unavailable, 1);
        // The marker is gone, so the key is not poisoned.
        assert!(cache.inner.shared.lock().inflight.is_empty());
    }

    #[test]
    fn test_invalidate_forces_recompute() {
        let cache = FunctionCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let square = cache.wrap(counting_square(&calls));

        square.call((3,)).unwrap();
        assert!(square.invalidate(&(3,)));
        assert!(!square.invalidate(&(3,)));

        square.call((3,)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_clear_empties_store() {
        let cache = FunctionCache::new();
        let square = cache.wrap(|&(n,): &(u64,)| n * n);

        square.call((1,)).unwrap();
        square.call((2,)).unwrap();
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_close_stops_expiry_and_is_idempotent() {
        let mut cache = FunctionCache::with_config(
            CacheConfig::new()
                .max_entries(4)
                .expire_after(Duration::from_millis(30))
                .sweep_interval(Duration::from_millis(10)),
        )
        .unwrap();
        let square = cache.wrap(|&(n,): &(u64,)| n * n);

        square.call((2,)).unwrap();
        cache.close();
        cache.close();

        // Well past the TTL, but the sweeper is gone.
        thread::sleep(Duration::from_millis(80));
        assert_eq!(cache.len(), 1);

        // Wrappers keep working against the closed cache.
        assert_eq!(square.call((2,)).unwrap(), 4);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_drop_joins_sweeper() {
        let cache = FunctionCache::with_config(
            CacheConfig::new().sweep_interval(Duration::from_millis(5)),
        )
        .unwrap();
        let square = cache.wrap(|&(n,): &(u64,)| n * n);
        square.call((1,)).unwrap();
        drop(cache);
        // Returning at all is the assertion: drop joined the thread.
    }

    #[test]
    fn test_wrapper_outlives_cache_handle() {
        let triple = {
            let cache = FunctionCache::new();
            cache.wrap(|&(n,): &(u32,)| n * 3)
        };
        assert_eq!(triple.call((3,)).unwrap(), 9);
        assert_eq!(triple.call((3,)).unwrap(), 9);
    }

    #[test]
    fn test_zero_arity_function() {
        let cache = FunctionCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let answer = cache.wrap({
            let calls = Arc::clone(&calls);
            move |_: &()| {
                calls.fetch_add(1, Ordering::SeqCst);
                42u32
            }
        });

        assert_eq!(answer.call(()).unwrap(), 42);
        assert_eq!(answer.call(()).unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_many_threads_many_keys() {
        let cache = FunctionCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let square = cache.wrap(counting_square(&calls));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let square = square.clone();
                thread::spawn(move || {
                    for k in 0..100u64 {
                        assert_eq!(square.call((k,)).unwrap(), k * k);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // No expiry and no eviction here, so every key computed exactly
        // once no matter how the threads interleaved.
        assert_eq!(calls.load(Ordering::SeqCst), 100);
        assert_eq!(cache.len(), 100);
    }

    #[test]
    fn test_type_mismatch_is_an_error_not_a_panic() {
        let cache = FunctionCache::new();
        let square = cache.wrap(|&(n,): &(u32,)| n);
        let key = square.fingerprint(&(1,));

        // Plant a value of the wrong type directly in the store.
        cache.inner.shared.lock().entries.insert(
            key,
            Entry {
                value: Arc::new(String::from("oops")),
                inserted_at: Instant::now(),
            },
        );

        assert!(matches!(square.call((1,)), Err(CacheError::TypeMismatch)));
    }

    #[test]
    fn test_with_config_rejects_invalid() {
        let err = FunctionCache::with_config(CacheConfig::new().max_entries(0)).unwrap_err();
        assert!(matches!(err, CacheError::InvalidConfig(_)));
    }

    #[test]
    fn test_stats_identity() {
        let cache = FunctionCache::new();
        let square = cache.wrap(|&(n,): &(u64,)| n * n);

        square.call((1,)).unwrap();
        square.call((2,)).unwrap();
        square.call((1,)).unwrap();
        square.call((1,)).unwrap();
        square.call((2,)).unwrap();

        let stats = cache.stats();
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.capacity, crate::CacheConfig::default().max_entries);
        assert!((stats.hit_rate() - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_debug_does_not_block() {
        let cache = FunctionCache::new();
        let square = cache.wrap(|&(n,): &(u64,)| n * n);
        square.call((1,)).unwrap();

        let shown = format!("{cache:?}");
        assert!(shown.contains("FunctionCache"));
        assert!(format!("{square:?}").contains("CachedFn"));
    }
}
