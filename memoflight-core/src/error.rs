//! Error types for memoflight.
//!
//! The cache has a deliberately small failure surface: a wrapped call either
//! produces a value or one of the errors below. Failures of the wrapped
//! function itself are not modelled here; the cache only memoizes functions
//! that return plain values.

use thiserror::Error;

/// Result type alias using `CacheError`.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Main error type for all cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A caller waited on another caller's in-flight computation, but the
    /// result was no longer in the cache by the time it was woken (evicted,
    /// expired, or the computation panicked). Retrying the call recomputes.
    #[error("result unavailable after waiting for in-flight computation")]
    Unavailable,

    /// A cached value did not have the result type the caller requested.
    /// Unreachable through the wrapper API, which scopes every fingerprint
    /// to the function it was created for; surfaced as an error rather than
    /// a panic all the same.
    #[error("cached value does not match the requested result type")]
    TypeMismatch,

    /// A configuration value failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CacheError {
    /// Returns true if retrying the failed call can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CacheError::Unavailable)
    }

    /// Returns true if this error indicates a misconfigured cache.
    pub fn is_config_error(&self) -> bool {
        matches!(self, CacheError::InvalidConfig(_))
    }
}
