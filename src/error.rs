//! Error types for policykit.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: a cache was configured with parameters it cannot honor
//!   (zero capacity for a policy that needs room).
//! - [`InvariantError`]: internal bookkeeping disagrees with itself. This is
//!   a bug in the crate, not something a caller can recover from.
//! - [`CacheError`]: everything a write-propagation controller can report,
//!   generic over the backing store's own error type.
//! - [`FlushError`]: a write-back flush that could not persist every dirty
//!   entry.
//!
//! A lookup miss is never an error; it is `Ok(None)` / `None`.
//!
//! ## Example Usage
//!
//! ```
//! use policykit::cache::BoundedCache;
//! use policykit::error::ConfigError;
//! use policykit::policy::EvictionPolicy;
//!
//! let err = BoundedCache::<&str, i32>::new(0, EvictionPolicy::Lru).unwrap_err();
//! assert!(matches!(err, ConfigError::InvalidCapacity { capacity: 0, .. }));
//!
//! // LFU accepts capacity 0 as a cache that stores nothing.
//! assert!(BoundedCache::<&str, i32>::new(0, EvictionPolicy::Lfu).is_ok());
//! ```

use thiserror::Error;

use crate::policy::EvictionPolicy;

/// Error returned when cache configuration parameters are invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Capacity must be positive for every policy except LFU.
    #[error("capacity must be > 0 for {policy} eviction, got {capacity}")]
    InvalidCapacity {
        policy: EvictionPolicy,
        capacity: usize,
    },
}

/// Error returned when internal cache invariants are violated.
///
/// Carries a description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("internal invariant violated: {0}")]
pub struct InvariantError(String);

impl InvariantError {
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Error returned by write-propagation controllers.
///
/// `E` is the backing store's error type; store failures are passed through
/// unchanged.
#[derive(Debug, Error)]
pub enum CacheError<E> {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The backing store rejected a read or write.
    #[error("backing store operation failed")]
    Store(#[source] E),

    #[error(transparent)]
    Invariant(#[from] InvariantError),
}

impl<E> CacheError<E> {
    /// Returns the store error, if this is one.
    pub fn as_store(&self) -> Option<&E> {
        match self {
            CacheError::Store(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_store(&self) -> bool {
        matches!(self, CacheError::Store(_))
    }
}

/// A write-back flush that left some entries dirty.
///
/// Every dirty entry was attempted. Entries listed in `failures` are still
/// dirty in the cache and will be retried by the next flush.
#[derive(Debug, Error)]
#[error("flush wrote {written} entries, {} failed", .failures.len())]
pub struct FlushError<K, E> {
    /// Entries successfully written and marked clean.
    pub written: usize,
    /// Keys whose write failed, with the store error for each.
    pub failures: Vec<(K, E)>,
}

impl<K, E> FlushError<K, E> {
    /// Keys that are still dirty because their write failed.
    pub fn failed_keys(&self) -> impl Iterator<Item = &K> {
        self.failures.iter().map(|(key, _)| key)
    }
}
