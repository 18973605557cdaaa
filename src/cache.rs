//! Bounded key→value map driven by one eviction tracker.
//!
//! ## Architecture
//!
//! ```text
//!   BoundedCache<K, V>
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │  map: FxHashMap<K, CacheEntry<K, V>>     tracker: Tracker<K> │
//!   │  ┌──────┬──────────────────────┐         ┌─────────────────┐ │
//!   │  │ "a"  │ { value, dirty }     │         │ Arrival         │ │
//!   │  │ "b"  │ { value, dirty }     │◄──────► │ Recency         │ │
//!   │  │ "c"  │ { value, dirty }     │ same    │ Frequency       │ │
//!   │  └──────┴──────────────────────┘ key set │ Random          │ │
//!   │                                          └─────────────────┘ │
//!   │  capacity: usize                                             │
//!   └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The map holds values; the tracker holds only keys. Every public
//! operation leaves both with exactly the same key set and
//! `len() <= capacity()`.
//!
//! ## Operations
//!
//! | Operation    | Tracker effect                 | Time  |
//! |--------------|--------------------------------|-------|
//! | `get`        | `on_touch` on hit              | O(1)  |
//! | `peek`       | none                           | O(1)  |
//! | `put`        | `on_touch` or `on_insert`      | O(1)* |
//! | `evict`      | `on_evict`                     | O(1)  |
//! | `remove`     | `on_remove`                    | O(1)  |
//!
//! `*` may evict one victim first.
//!
//! ## Example Usage
//!
//! ```
//! use policykit::cache::BoundedCache;
//! use policykit::policy::EvictionPolicy;
//!
//! let mut cache = BoundedCache::new(2, EvictionPolicy::Lru).unwrap();
//! cache.put("a", 1).unwrap();
//! cache.put("b", 2).unwrap();
//! cache.get(&"a");
//!
//! let evicted = cache.put("c", 3).unwrap().unwrap();
//! assert_eq!(evicted.key, "b");
//! assert!(cache.contains(&"a") && cache.contains(&"c"));
//! ```
//!
//! ## Dirty Entries
//!
//! [`put_dirty`](BoundedCache::put_dirty) stores a value that has not yet
//! reached its backing store. The map only records the flag; deciding when
//! to persist is the job of [`WriteCache`](crate::write::WriteCache).

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::error::{ConfigError, InvariantError};
use crate::policy::{EvictionPolicy, Tracker, MAX_PREALLOC};
use crate::traits::EvictionTracker;

/// A stored entry, also returned when an entry leaves the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<K, V> {
    pub key: K,
    pub value: V,
    /// Written to the cache but not yet to the backing store.
    pub dirty: bool,
}

/// Fixed-capacity map that evicts according to its [`Tracker`].
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    map: FxHashMap<K, CacheEntry<K, V>>,
    tracker: Tracker<K>,
    capacity: usize,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a cache whose random tracker (if any) seeds from the OS.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidCapacity`] when `capacity == 0`, unless
    /// `policy` is [`EvictionPolicy::Lfu`].
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Result<Self, ConfigError> {
        Self::with_seed(capacity, policy, None)
    }

    /// Like [`new`](Self::new), with a fixed seed for the random tracker.
    pub fn with_seed(
        capacity: usize,
        policy: EvictionPolicy,
        seed: Option<u64>,
    ) -> Result<Self, ConfigError> {
        validate_capacity(policy, capacity)?;
        Ok(Self::from_parts(capacity, Tracker::for_policy(policy, capacity, seed)))
    }

    /// Creates a cache around an already-built tracker.
    ///
    /// Anything the tracker currently holds is discarded.
    pub fn with_tracker(capacity: usize, mut tracker: Tracker<K>) -> Result<Self, ConfigError> {
        validate_capacity(tracker.policy(), capacity)?;
        tracker.clear();
        Ok(Self::from_parts(capacity, tracker))
    }

    fn from_parts(capacity: usize, tracker: Tracker<K>) -> Self {
        Self {
            map: FxHashMap::with_capacity_and_hasher(
                capacity.min(MAX_PREALLOC),
                Default::default(),
            ),
            tracker,
            capacity,
        }
    }

    #[cfg(test)]
    pub(crate) fn tracker_mut(&mut self) -> &mut Tracker<K> {
        &mut self.tracker
    }

    /// Returns the value for `key` and records the access.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if !self.map.contains_key(key) {
            return None;
        }
        self.tracker.on_touch(key);
        self.map.get(key).map(|entry| &entry.value)
    }

    /// Returns the value for `key` without touching the tracker.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.map.get(key).map(|entry| &entry.value)
    }

    /// Returns the whole entry for `key` without touching the tracker.
    pub fn peek_entry(&self, key: &K) -> Option<&CacheEntry<K, V>> {
        self.map.get(key)
    }

    /// Inserts or updates `key` as a clean entry.
    ///
    /// Returns the entry evicted to make room, if any. Updating an existing
    /// key never evicts.
    pub fn put(&mut self, key: K, value: V) -> Result<Option<CacheEntry<K, V>>, InvariantError> {
        self.store(key, value, false)
    }

    /// Inserts or updates `key` and marks it dirty.
    pub fn put_dirty(
        &mut self,
        key: K,
        value: V,
    ) -> Result<Option<CacheEntry<K, V>>, InvariantError> {
        self.store(key, value, true)
    }

    fn store(
        &mut self,
        key: K,
        value: V,
        dirty: bool,
    ) -> Result<Option<CacheEntry<K, V>>, InvariantError> {
        if self.capacity == 0 {
            return Ok(None);
        }

        if let Some(entry) = self.map.get_mut(&key) {
            entry.value = value;
            entry.dirty = dirty;
            self.tracker.on_touch(&key);
            return Ok(None);
        }

        let evicted = if self.map.len() >= self.capacity {
            self.evict()?
        } else {
            None
        };

        self.map.insert(
            key.clone(),
            CacheEntry {
                key: key.clone(),
                value,
                dirty,
            },
        );
        self.tracker.on_insert(key);
        Ok(evicted)
    }

    /// Removes the tracker's next victim.
    ///
    /// Returns `Ok(None)` when the cache is empty.
    ///
    /// # Errors
    ///
    /// [`InvariantError`] if the tracker has no victim while the map still
    /// holds entries, or names a key the map does not hold.
    pub fn evict(&mut self) -> Result<Option<CacheEntry<K, V>>, InvariantError> {
        if self.map.is_empty() {
            return Ok(None);
        }
        let victim = self.tracker.on_evict().ok_or_else(|| {
            InvariantError::new(format!(
                "{} tracker is empty while the cache holds {} entries",
                self.tracker.policy(),
                self.map.len()
            ))
        })?;
        match self.map.remove(&victim) {
            Some(entry) => Ok(Some(entry)),
            None => Err(InvariantError::new(format!(
                "{} tracker chose a victim that is not cached",
                self.tracker.policy()
            ))),
        }
    }

    /// Removes `key` without counting it as an eviction.
    pub fn remove(&mut self, key: &K) -> Option<CacheEntry<K, V>> {
        let entry = self.map.remove(key)?;
        self.tracker.on_remove(key);
        Some(entry)
    }

    /// Clears the dirty flag. Returns `false` if `key` is not cached or
    /// was already clean.
    pub fn mark_clean(&mut self, key: &K) -> bool {
        match self.map.get_mut(key) {
            Some(entry) if entry.dirty => {
                entry.dirty = false;
                true
            },
            _ => false,
        }
    }

    pub fn is_dirty(&self, key: &K) -> bool {
        self.map.get(key).is_some_and(|entry| entry.dirty)
    }

    /// Keys of every dirty entry, in no particular order.
    pub fn dirty_keys(&self) -> impl Iterator<Item = &K> {
        self.map
            .values()
            .filter(|entry| entry.dirty)
            .map(|entry| &entry.key)
    }

    pub fn dirty_count(&self) -> usize {
        self.map.values().filter(|entry| entry.dirty).count()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// `true` when the next new key will evict.
    pub fn is_full(&self) -> bool {
        self.map.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.tracker.policy()
    }

    /// Access count of `key`; `None` unless the policy is LFU and the key
    /// is cached.
    pub fn frequency(&self, key: &K) -> Option<u64> {
        self.tracker.frequency(key)
    }

    /// The entry `evict` would remove next, if the policy can tell.
    pub fn peek_victim(&self) -> Option<&CacheEntry<K, V>> {
        self.tracker.peek_victim().and_then(|key| self.map.get(key))
    }

    /// Cached pairs in no particular order. Does not touch the tracker.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.map.iter().map(|(key, entry)| (key, &entry.value))
    }

    /// Drops every entry, dirty ones included.
    pub fn clear(&mut self) {
        self.map.clear();
        self.tracker.clear();
    }

    /// Checks capacity, tracker consistency and map/tracker key-set parity.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.tracker.check_invariants()?;
        if self.map.len() > self.capacity {
            return Err(InvariantError::new(format!(
                "cache holds {} entries over capacity {}",
                self.map.len(),
                self.capacity
            )));
        }
        if self.map.len() != self.tracker.len() {
            return Err(InvariantError::new(format!(
                "map holds {} keys but tracker holds {}",
                self.map.len(),
                self.tracker.len()
            )));
        }
        for (key, entry) in &self.map {
            if !self.tracker.contains(key) {
                return Err(InvariantError::new("cached key missing from tracker"));
            }
            if entry.key != *key {
                return Err(InvariantError::new("entry key differs from its map key"));
            }
        }
        Ok(())
    }
}

fn validate_capacity(policy: EvictionPolicy, capacity: usize) -> Result<(), ConfigError> {
    if capacity == 0 && !policy.allows_zero_capacity() {
        return Err(ConfigError::InvalidCapacity { policy, capacity });
    }
    Ok(())
}
