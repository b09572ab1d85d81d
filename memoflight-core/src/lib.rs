//! # Memoflight Core
//!
//! Core types for the memoflight function cache.
//!
//! This crate provides the building blocks the cache engine is assembled from:
//!
//! - **Errors**: the [`CacheError`] hierarchy with retryability classification
//! - **Constants**: default capacity, expiry, and sweep timings
//! - **Config**: [`CacheConfig`] with serde support and builder methods
//! - **Fingerprints**: stable, type-tagged keys derived from argument tuples
//!
//! ## Example
//!
//! ```rust
//! use memoflight_core::{CacheArgs, CacheConfig};
//!
//! // Equal argument tuples always produce equal fingerprints
//! let a = (42u64, "query").fingerprint();
//! let b = (42u64, "query").fingerprint();
//! assert_eq!(a, b);
//!
//! // Configs are serializable with human-readable durations
//! let json = serde_json::to_string(&CacheConfig::default()).unwrap();
//! assert!(json.contains("max_entries"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod config;
pub mod constants;
pub mod error;
pub mod fingerprint;

// Re-export commonly used items at crate root
pub use config::CacheConfig;
pub use constants::*;
pub use error::{CacheError, Result};
pub use fingerprint::{CacheArgs, Fingerprint, FingerprintArg};
