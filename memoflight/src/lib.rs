//! # Memoflight
//!
//! Process-local memoizing cache for pure functions, with single-flight
//! deduplication, TTL expiry, and bounded capacity.
//!
//! A [`FunctionCache`] owns a store of computed results and a background
//! expiry sweeper. [`FunctionCache::wrap`] turns a function into a
//! [`CachedFn`] that memoizes results keyed by argument fingerprint:
//!
//! - **Memoization**: repeated calls with equal arguments return the stored
//!   result without re-running the function
//! - **Single flight**: concurrent calls with equal arguments share one
//!   execution; late callers block until the first caller's result lands
//! - **Expiry**: results live for a fixed TTL after insertion, then the
//!   sweeper removes them
//! - **Bounded capacity**: when full, the entry with the oldest insertion
//!   time is evicted to admit a new one
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use memoflight::{CacheConfig, FunctionCache};
//!
//! let cache = FunctionCache::with_config(
//!     CacheConfig::new()
//!         .max_entries(64)
//!         .expire_after(Duration::from_secs(30))
//!         .sweep_interval(Duration::from_secs(5)),
//! )
//! .unwrap();
//!
//! let add = cache.wrap(|&(a, b): &(u32, u32)| a + b);
//! assert_eq!(add.call((1, 2)).unwrap(), 3);
//! assert_eq!(add.call((1, 2)).unwrap(), 3); // served from the cache
//! ```
//!
//! The cache only memoizes; it never inspects results. Wrap functions that
//! are deterministic and whose results stay valid for the configured TTL.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

mod cache;
mod flight;
mod stats;
mod sweeper;

pub use cache::{CachedFn, FunctionCache};
pub use stats::CacheStats;

// Re-export the core vocabulary so `use memoflight::*` is enough.
pub use memoflight_core::{CacheArgs, CacheConfig, CacheError, Fingerprint, FingerprintArg, Result};
