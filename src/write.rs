//! Write-propagation controller.
//!
//! [`WriteCache`] puts a [`BoundedCache`] in front of a [`BackingStore`] and
//! decides, per [`WritePolicy`], when writes reach the store.
//!
//! ## Disciplines
//!
//! ```text
//!   Through                 Around                  Back
//!   put(k, v)               put(k, v)               put(k, v)
//!     │                       │                       │
//!     ├─► store.write  ✗→Err  ├─► store.write  ✗→Err  ├─► make room (write back
//!     │                       │                       │    dirty victim) ✗→Err
//!     └─► cache.put (clean)   └─► cache.remove(k)     └─► cache.put_dirty
//!
//!                                                     flush()
//!                                                       └─► store.write every
//!                                                           dirty entry, mark clean
//! ```
//!
//! A failed store write under Through or Around changes nothing: the cache
//! is only touched after the store accepted the value.
//!
//! Every discipline reads the same way: a hit is served from the cache; a
//! miss reads the store and, if the store has the key, caches the value
//! clean. A key absent from both is `Ok(None)`.
//!
//! ## Dirty Victims
//!
//! Under Back, the cache may be the only holder of a value. When such an
//! entry is picked for eviction it is written to the store first. If that
//! write fails, the victim is put back (dirty) and the store error is
//! returned to the caller whose operation needed the room.
//!
//! ## Example Usage
//!
//! ```
//! use policykit::cache::BoundedCache;
//! use policykit::policy::EvictionPolicy;
//! use policykit::store::MemoryStore;
//! use policykit::write::{WriteCache, WritePolicy};
//!
//! let cache = BoundedCache::new(2, EvictionPolicy::Lru).unwrap();
//! let mut wc = WriteCache::new(cache, MemoryStore::new(), WritePolicy::Back);
//!
//! wc.put("a", 1).unwrap();
//! assert_eq!(wc.store().get(&"a"), None);
//! assert_eq!(wc.flush().unwrap(), 1);
//! assert_eq!(wc.store().get(&"a"), Some(&1));
//! ```
//!
//! ## Thread Safety
//!
//! [`WriteCache`] is single-threaded. [`SharedWriteCache`] puts the cache,
//! its tracker and the store behind one `parking_lot::Mutex`.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, trace, warn};

use crate::cache::{BoundedCache, CacheEntry};
use crate::error::{CacheError, FlushError};
use crate::metrics::CacheMetrics;
use crate::store::traits::BackingStore;

/// How writes reach the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WritePolicy {
    /// Store first, then cache.
    #[default]
    Through,
    /// Store only; any cached copy is invalidated.
    Around,
    /// Cache only, marked dirty until flushed or evicted.
    Back,
}

impl WritePolicy {
    pub const ALL: [WritePolicy; 3] = [
        WritePolicy::Through,
        WritePolicy::Around,
        WritePolicy::Back,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WritePolicy::Through => "write-through",
            WritePolicy::Around => "write-around",
            WritePolicy::Back => "write-back",
        }
    }
}

impl fmt::Display for WritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bounded cache in front of a backing store.
///
/// To keep ownership of the store, pass `&mut store` as `S`.
pub struct WriteCache<K, V, S> {
    cache: BoundedCache<K, V>,
    store: S,
    policy: WritePolicy,
    metrics: CacheMetrics,
}

impl<K, V, S> WriteCache<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BackingStore<K, V>,
{
    /// Wraps `cache` and `store`. Entries already in `cache` are kept as-is.
    pub fn new(cache: BoundedCache<K, V>, store: S, policy: WritePolicy) -> Self {
        Self {
            cache,
            store,
            policy,
            metrics: CacheMetrics::default(),
        }
    }

    /// Writes `value` under `key` according to the write policy.
    ///
    /// # Errors
    ///
    /// [`CacheError::Store`] if the store rejected the write (Through,
    /// Around) or rejected the write-back of a dirty victim (Back). In
    /// both cases the cache is left as it was. A zero-capacity cache under
    /// Back writes straight to the store.
    ///
    /// [`CacheError::Invariant`] if the cache's tracker and map disagree
    /// while making room.
    pub fn put(&mut self, key: K, value: V) -> Result<(), CacheError<S::Error>> {
        match self.policy {
            WritePolicy::Through => {
                self.write_store(&key, &value)?;
                self.make_room(&key)?;
                self.cache.put(key, value)?;
            },
            WritePolicy::Around => {
                self.write_store(&key, &value)?;
                if self.cache.remove(&key).is_some() {
                    trace!(policy = %self.policy, "invalidated cached copy");
                }
            },
            WritePolicy::Back if self.cache.capacity() == 0 => {
                // Nothing can be held dirty, so the store takes the write now.
                self.write_store(&key, &value)?;
            },
            WritePolicy::Back => {
                self.make_room(&key)?;
                self.cache.put_dirty(key, value)?;
            },
        }
        Ok(())
    }

    /// Writes every dirty entry to the store and marks it clean.
    ///
    /// Entries are attempted independently: a failure is recorded and the
    /// rest are still written. Returns the number of entries written.
    /// Through and Around never mark entries dirty, but a cache handed to
    /// [`WriteCache::new`] may already hold some; those are flushed too.
    ///
    /// # Errors
    ///
    /// [`FlushError`] listing the keys that are still dirty.
    pub fn flush(&mut self) -> Result<usize, FlushError<K, S::Error>> {
        let keys: Vec<K> = self.cache.dirty_keys().cloned().collect();
        let mut written = 0;
        let mut failures = Vec::new();

        for key in keys {
            let Some(entry) = self.cache.peek_entry(&key) else {
                continue;
            };
            match self.store.write(&key, &entry.value) {
                Ok(()) => {
                    self.metrics.record_store_write();
                    self.cache.mark_clean(&key);
                    written += 1;
                },
                Err(err) => {
                    self.metrics.record_store_failure();
                    warn!(error = %err, "flush write failed, entry stays dirty");
                    failures.push((key, err));
                },
            }
        }

        self.metrics.record_flush(written);
        debug!(written, failed = failures.len(), "flush complete");

        if failures.is_empty() {
            Ok(written)
        } else {
            Err(FlushError { written, failures })
        }
    }

    /// Drops the cached copy of `key` without touching the store.
    ///
    /// Under Back the returned entry may be dirty; discarding it loses a
    /// write the store never saw.
    pub fn remove(&mut self, key: &K) -> Option<CacheEntry<K, V>> {
        let entry = self.cache.remove(key)?;
        if entry.dirty {
            debug!(policy = %self.policy, "removed dirty entry before flush");
        }
        Some(entry)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.cache.contains(key)
    }

    pub fn is_dirty(&self, key: &K) -> bool {
        self.cache.is_dirty(key)
    }

    pub fn dirty_count(&self) -> usize {
        self.cache.dirty_count()
    }

    pub fn policy(&self) -> WritePolicy {
        self.policy
    }

    pub fn cache(&self) -> &BoundedCache<K, V> {
        &self.cache
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.metrics
    }

    /// Splits the controller without flushing; dirty entries stay in the
    /// returned cache.
    pub fn into_parts(self) -> (BoundedCache<K, V>, S) {
        (self.cache, self.store)
    }

    fn write_store(&mut self, key: &K, value: &V) -> Result<(), CacheError<S::Error>> {
        match self.store.write(key, value) {
            Ok(()) => {
                self.metrics.record_store_write();
                Ok(())
            },
            Err(err) => {
                self.metrics.record_store_failure();
                warn!(policy = %self.policy, error = %err, "store write failed");
                Err(CacheError::Store(err))
            },
        }
    }

    fn read_store(&mut self, key: &K) -> Result<Option<V>, CacheError<S::Error>> {
        self.metrics.record_store_read();
        self.store.read(key).map_err(|err| {
            self.metrics.record_store_failure();
            warn!(policy = %self.policy, error = %err, "store read failed");
            CacheError::Store(err)
        })
    }

    /// Evicts one entry if inserting `key` would exceed capacity, writing
    /// it back first if it is dirty.
    fn make_room(&mut self, key: &K) -> Result<(), CacheError<S::Error>> {
        if self.cache.capacity() == 0 || !self.cache.is_full() || self.cache.contains(key) {
            return Ok(());
        }
        let Some(victim) = self.cache.evict()? else {
            return Ok(());
        };

        if victim.dirty {
            if let Err(err) = self.store.write(&victim.key, &victim.value) {
                self.metrics.record_store_failure();
                warn!(error = %err, "write-back of dirty victim failed, keeping it cached");
                self.cache.put_dirty(victim.key, victim.value)?;
                return Err(CacheError::Store(err));
            }
            self.metrics.record_store_write();
            self.metrics.record_write_back();
            debug!(policy = %self.cache.policy(), "wrote back dirty victim");
        } else {
            trace!(policy = %self.cache.policy(), "evicted clean victim");
        }
        self.metrics.record_eviction();
        Ok(())
    }
}

impl<K, V, S> WriteCache<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BackingStore<K, V>,
{
    /// Returns the value for `key`, reading through to the store on a miss.
    ///
    /// A value fetched from the store is cached clean.
    ///
    /// # Errors
    ///
    /// [`CacheError::Store`] if the store read failed, or if caching the
    /// fetched value required writing back a dirty victim and that failed.
    pub fn get(&mut self, key: &K) -> Result<Option<V>, CacheError<S::Error>> {
        if let Some(value) = self.cache.get(key) {
            let value = value.clone();
            self.metrics.record_hit();
            trace!(policy = %self.policy, "cache hit");
            return Ok(Some(value));
        }

        self.metrics.record_miss();
        trace!(policy = %self.policy, "cache miss, reading store");
        let Some(value) = self.read_store(key)? else {
            return Ok(None);
        };
        self.make_room(key)?;
        self.cache.put(key.clone(), value.clone())?;
        Ok(Some(value))
    }
}

impl<K, V, S> fmt::Debug for WriteCache<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteCache")
            .field("policy", &self.policy)
            .field("cache", &self.cache)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

/// A [`WriteCache`] behind one mutex, shareable across threads by cloning.
pub struct SharedWriteCache<K, V, S> {
    inner: Arc<Mutex<WriteCache<K, V, S>>>,
}

impl<K, V, S> SharedWriteCache<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BackingStore<K, V>,
{
    pub fn new(inner: WriteCache<K, V, S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    pub fn put(&self, key: K, value: V) -> Result<(), CacheError<S::Error>> {
        self.inner.lock().put(key, value)
    }

    pub fn flush(&self) -> Result<usize, FlushError<K, S::Error>> {
        self.inner.lock().flush()
    }

    pub fn remove(&self, key: &K) -> Option<CacheEntry<K, V>> {
        self.inner.lock().remove(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().cache().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().cache().is_empty()
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.inner.lock().metrics()
    }

    /// Locks the controller for a sequence of operations.
    pub fn lock(&self) -> MutexGuard<'_, WriteCache<K, V, S>> {
        self.inner.lock()
    }

    /// Returns the controller if this is the last handle.
    pub fn try_unwrap(self) -> Result<WriteCache<K, V, S>, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}

impl<K, V, S> SharedWriteCache<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BackingStore<K, V>,
{
    pub fn get(&self, key: &K) -> Result<Option<V>, CacheError<S::Error>> {
        self.inner.lock().get(key)
    }
}

impl<K, V, S> Clone for SharedWriteCache<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V, S> fmt::Debug for SharedWriteCache<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedWriteCache")
            .field("handles", &Arc::strong_count(&self.inner))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::EvictionPolicy;
    use crate::traits::EvictionTracker;
    use crate::store::{MemoryStore, MemoryStoreError};

    type Wc = WriteCache<&'static str, i32, MemoryStore<&'static str, i32>>;

    fn controller(capacity: usize, eviction: EvictionPolicy, policy: WritePolicy) -> Wc {
        let cache = BoundedCache::with_seed(capacity, eviction, Some(1)).unwrap();
        WriteCache::new(cache, MemoryStore::new(), policy)
    }

    #[test]
    fn through_writes_store_before_cache() {
        let mut wc = controller(2, EvictionPolicy::Lru, WritePolicy::Through);
        wc.put("a", 1).unwrap();
        assert_eq!(wc.store().get(&"a"), Some(&1));
        assert_eq!(wc.cache().peek(&"a"), Some(&1));
        assert!(!wc.is_dirty(&"a"));
        assert_eq!(wc.get(&"a").unwrap(), Some(1));
        assert_eq!(wc.store().read_count(), 0);
    }

    #[test]
    fn through_failure_leaves_both_untouched() {
        let mut wc = controller(2, EvictionPolicy::Lru, WritePolicy::Through);
        wc.put("a", 1).unwrap();
        wc.store_mut().fail_writes_for("a");

        let err = wc.put("a", 2).unwrap_err();
        assert!(matches!(err.as_store(), Some(MemoryStoreError::WriteRejected(_))));
        assert_eq!(wc.cache().peek(&"a"), Some(&1));
        assert_eq!(wc.store().get(&"a"), Some(&1));

        wc.store_mut().fail_writes_for("b");
        assert!(wc.put("b", 1).is_err());
        assert!(!wc.contains(&"b"));
        assert_eq!(wc.metrics().store_failures, 2);
    }

    #[test]
    fn through_miss_fills_from_store() {
        let cache = BoundedCache::new(1, EvictionPolicy::Fifo).unwrap();
        let mut wc = WriteCache::new(cache, MemoryStore::new(), WritePolicy::Through);
        wc.put("a", 1).unwrap();
        wc.put("b", 2).unwrap();
        assert!(!wc.contains(&"a"));

        assert_eq!(wc.get(&"a").unwrap(), Some(1));
        assert!(wc.contains(&"a"));
        let metrics = wc.metrics();
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.store_reads, 1);
        assert_eq!(metrics.evictions, 2);
    }

    #[test]
    fn around_invalidates_stale_copy() {
        let mut wc = controller(2, EvictionPolicy::Lru, WritePolicy::Around);
        wc.put("a", 1).unwrap();
        assert!(!wc.contains(&"a"));
        assert_eq!(wc.get(&"a").unwrap(), Some(1));
        assert!(wc.contains(&"a"));

        wc.put("a", 2).unwrap();
        assert!(!wc.contains(&"a"));
        assert_eq!(wc.get(&"a").unwrap(), Some(2));
    }

    #[test]
    fn around_failure_keeps_cached_copy() {
        let mut wc = controller(2, EvictionPolicy::Lru, WritePolicy::Around);
        wc.put("a", 1).unwrap();
        wc.get(&"a").unwrap();
        wc.store_mut().fail_writes_for("a");
        assert!(wc.put("a", 2).is_err());
        assert_eq!(wc.cache().peek(&"a"), Some(&1));
        assert_eq!(wc.store().get(&"a"), Some(&1));
    }

    #[test]
    fn back_defers_until_flush() {
        let mut wc = controller(4, EvictionPolicy::Lru, WritePolicy::Back);
        wc.put("a", 1).unwrap();
        wc.put("b", 2).unwrap();
        assert!(wc.store().is_empty());
        assert_eq!(wc.dirty_count(), 2);
        assert_eq!(wc.get(&"a").unwrap(), Some(1));

        assert_eq!(wc.flush().unwrap(), 2);
        assert_eq!(wc.store().get(&"a"), Some(&1));
        assert_eq!(wc.store().get(&"b"), Some(&2));
        assert_eq!(wc.dirty_count(), 0);

        let writes = wc.store().write_count();
        assert_eq!(wc.flush().unwrap(), 0);
        assert_eq!(wc.store().write_count(), writes);
    }

    #[test]
    fn flush_continues_past_failure() {
        let mut wc = controller(4, EvictionPolicy::Fifo, WritePolicy::Back);
        wc.put("a", 1).unwrap();
        wc.put("bad", 2).unwrap();
        wc.put("c", 3).unwrap();
        wc.store_mut().fail_writes_for("bad");

        let err = wc.flush().unwrap_err();
        assert_eq!(err.written, 2);
        assert_eq!(err.failed_keys().collect::<Vec<_>>(), vec![&"bad"]);
        assert!(wc.is_dirty(&"bad"));
        assert!(!wc.is_dirty(&"a"));
        assert_eq!(wc.store().get(&"c"), Some(&3));

        wc.store_mut().allow_writes_for(&"bad");
        assert_eq!(wc.flush().unwrap(), 1);
        assert_eq!(wc.store().get(&"bad"), Some(&2));
    }

    #[test]
    fn dirty_victim_is_written_back() {
        let mut wc = controller(1, EvictionPolicy::Fifo, WritePolicy::Back);
        wc.put("a", 1).unwrap();
        wc.put("b", 2).unwrap();
        assert_eq!(wc.store().get(&"a"), Some(&1));
        assert_eq!(wc.store().get(&"b"), None);
        assert_eq!(wc.metrics().write_backs, 1);
    }

    #[test]
    fn failed_write_back_restores_victim() {
        let mut wc = controller(1, EvictionPolicy::Fifo, WritePolicy::Back);
        wc.put("a", 1).unwrap();
        wc.store_mut().fail_writes_for("a");

        assert!(wc.put("b", 2).unwrap_err().is_store());
        assert!(wc.is_dirty(&"a"));
        assert!(!wc.contains(&"b"));
        assert_eq!(wc.cache().peek(&"a"), Some(&1));
        wc.cache().check_invariants().unwrap();
    }

    #[test]
    fn non_back_flush_is_noop() {
        for policy in [WritePolicy::Through, WritePolicy::Around] {
            let mut wc = controller(2, EvictionPolicy::Lru, policy);
            wc.put("a", 1).unwrap();
            assert_eq!(wc.flush().unwrap(), 0);
        }
    }

    #[test]
    fn dirty_entries_flush_under_any_policy() {
        for policy in [WritePolicy::Through, WritePolicy::Around] {
            let mut cache = BoundedCache::new(2, EvictionPolicy::Lru).unwrap();
            cache.put_dirty("a", 1).unwrap();
            let mut wc = WriteCache::new(cache, MemoryStore::new(), policy);

            assert_eq!(wc.flush().unwrap(), 1, "{policy}");
            assert_eq!(wc.store().get(&"a"), Some(&1));
            assert!(!wc.is_dirty(&"a"));
        }
    }

    #[test]
    fn back_zero_capacity_writes_through() {
        let mut wc = controller(0, EvictionPolicy::Lfu, WritePolicy::Back);
        wc.put("a", 42).unwrap();
        assert_eq!(wc.store().get(&"a"), Some(&42));
        assert_eq!(wc.dirty_count(), 0);
        assert_eq!(wc.flush().unwrap(), 0);
        assert_eq!(wc.get(&"a").unwrap(), Some(42));
        assert!(wc.cache().is_empty());
    }

    #[test]
    fn back_zero_capacity_reports_store_failure() {
        let mut wc = controller(0, EvictionPolicy::Lfu, WritePolicy::Back);
        wc.store_mut().fail_writes_for("a");
        assert!(wc.put("a", 1).unwrap_err().is_store());
        assert_eq!(wc.get(&"a").unwrap(), None);
        assert_eq!(wc.metrics().store_failures, 1);
    }

    #[test]
    fn tracker_drift_surfaces_as_invariant_error() {
        let mut cache = BoundedCache::new(2, EvictionPolicy::Lru).unwrap();
        cache.put("a", 1).unwrap();
        cache.put("b", 2).unwrap();
        cache.tracker_mut().clear();
        let mut wc = WriteCache::new(cache, MemoryStore::new(), WritePolicy::Back);

        let err = wc.put("c", 3).unwrap_err();
        assert!(matches!(err, CacheError::Invariant(_)), "{err}");
        assert!(err.as_store().is_none());
        assert!(!wc.contains(&"c"));
    }

    #[test]
    fn miss_everywhere_is_none() {
        let mut wc = controller(2, EvictionPolicy::Lfu, WritePolicy::Back);
        assert_eq!(wc.get(&"nope").unwrap(), None);
        assert!(wc.cache().is_empty());
    }

    #[test]
    fn read_failure_is_store_error() {
        let mut wc = controller(2, EvictionPolicy::Lru, WritePolicy::Through);
        wc.store_mut().fail_reads(true);
        let err = wc.get(&"a").unwrap_err();
        assert_eq!(err.as_store(), Some(&MemoryStoreError::ReadUnavailable));
    }

    #[test]
    fn remove_returns_dirty_entry() {
        let mut wc = controller(2, EvictionPolicy::Lru, WritePolicy::Back);
        wc.put("a", 1).unwrap();
        let entry = wc.remove(&"a").unwrap();
        assert!(entry.dirty);
        assert_eq!(wc.flush().unwrap(), 0);
        assert!(wc.store().is_empty());
    }

    #[test]
    fn borrowed_store_stays_with_caller() {
        let mut store: MemoryStore<&str, i32> = MemoryStore::new();
        {
            let cache = BoundedCache::new(2, EvictionPolicy::Lru).unwrap();
            let mut wc = WriteCache::new(cache, &mut store, WritePolicy::Through);
            wc.put("a", 1).unwrap();
        }
        assert_eq!(store.get(&"a"), Some(&1));
    }

    #[test]
    fn shared_cache_across_threads() {
        let cache = BoundedCache::new(64, EvictionPolicy::Lru).unwrap();
        let shared = SharedWriteCache::new(WriteCache::new(
            cache,
            MemoryStore::<u32, u32>::new(),
            WritePolicy::Back,
        ));

        let handles: Vec<_> = (0..4u32)
            .map(|t| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    for i in 0..16 {
                        shared.put(t * 16 + i, i).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.len(), 64);
        assert_eq!(shared.flush().unwrap(), 64);
        let wc = shared.try_unwrap().unwrap();
        assert_eq!(wc.store().len(), 64);
    }
}
