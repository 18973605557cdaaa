//! Counters maintained by the write-propagation controller.
//!
//! [`CacheMetrics`] is a plain `Copy` struct; `WriteCache::metrics` hands
//! out a snapshot, so reading counters never borrows the controller.
//!
//! | Counter            | Incremented when                                     |
//! |--------------------|------------------------------------------------------|
//! | `hits`             | `get` is served from the cache                       |
//! | `misses`           | `get` has to consult the store                       |
//! | `store_reads`      | the store's `read` is called                         |
//! | `store_writes`     | the store's `write` succeeds                         |
//! | `store_failures`   | the store's `read` or `write` fails                  |
//! | `evictions`        | an entry leaves the cache to make room               |
//! | `write_backs`      | a dirty victim is persisted before eviction          |
//! | `flushes`          | `flush` runs                                         |
//! | `flushed_entries`  | `flush` persists a dirty entry                       |

/// Snapshot of controller counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub store_reads: u64,
    pub store_writes: u64,
    pub store_failures: u64,
    pub evictions: u64,
    pub write_backs: u64,
    pub flushes: u64,
    pub flushed_entries: u64,
}

impl CacheMetrics {
    /// Fraction of `get` calls served from the cache; `0.0` before any.
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            return 0.0;
        }
        self.hits as f64 / lookups as f64
    }

    #[inline]
    pub(crate) fn record_hit(&mut self) {
        self.hits += 1;
    }

    #[inline]
    pub(crate) fn record_miss(&mut self) {
        self.misses += 1;
    }

    #[inline]
    pub(crate) fn record_store_read(&mut self) {
        self.store_reads += 1;
    }

    #[inline]
    pub(crate) fn record_store_write(&mut self) {
        self.store_writes += 1;
    }

    #[inline]
    pub(crate) fn record_store_failure(&mut self) {
        self.store_failures += 1;
    }

    #[inline]
    pub(crate) fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    #[inline]
    pub(crate) fn record_write_back(&mut self) {
        self.write_backs += 1;
    }

    pub(crate) fn record_flush(&mut self, written: usize) {
        self.flushes += 1;
        self.flushed_entries += written as u64;
    }
}
