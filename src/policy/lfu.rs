//! Frequency-bucketed (LFU) tracking.
//!
//! Thin adapter from [`FrequencyBuckets`] to the tracker contract. A new key
//! starts at frequency 1 and every touch adds one. The victim is taken from
//! the lowest non-empty bucket; among keys sharing that frequency, the one
//! that reached it first is evicted.
//!
//! ```text
//!   put a, put b, get a, get a         put c (full)
//!
//!   freq=1: [b]                        victim = b (freq 1)
//!   freq=3: [a]
//! ```

use std::hash::Hash;

use crate::ds::FrequencyBuckets;
use crate::error::InvariantError;
use crate::traits::EvictionTracker;

/// Evicts the least frequently used key.
#[derive(Debug)]
pub struct FrequencyTracker<K> {
    buckets: FrequencyBuckets<K>,
}

impl<K> FrequencyTracker<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buckets: FrequencyBuckets::with_capacity(capacity),
        }
    }

    /// Lowest frequency currently tracked.
    pub fn min_frequency(&self) -> Option<u64> {
        self.buckets.min_freq()
    }
}

impl<K> Default for FrequencyTracker<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> EvictionTracker<K> for FrequencyTracker<K>
where
    K: Eq + Hash + Clone,
{
    fn on_insert(&mut self, key: K) {
        self.buckets.insert(key);
    }

    #[inline]
    fn on_touch(&mut self, key: &K) {
        self.buckets.touch(key);
    }

    fn on_evict(&mut self) -> Option<K> {
        self.buckets.pop_min().map(|(key, _)| key)
    }

    fn on_remove(&mut self, key: &K) -> bool {
        self.buckets.remove(key).is_some()
    }

    fn peek_victim(&self) -> Option<&K> {
        self.buckets.peek_min().map(|(key, _)| key)
    }

    fn contains(&self, key: &K) -> bool {
        self.buckets.contains(key)
    }

    fn len(&self) -> usize {
        self.buckets.len()
    }

    fn clear(&mut self) {
        self.buckets.clear();
    }

    fn frequency(&self, key: &K) -> Option<u64> {
        self.buckets.frequency(key)
    }

    fn check_invariants(&self) -> Result<(), InvariantError> {
        self.buckets.check_invariants()
    }
}
