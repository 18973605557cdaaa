//! Arrival-order (FIFO) tracking.
//!
//! Keys queue up in the order they were inserted; the oldest goes first.
//! Reads and updates never change a key's place in line.
//!
//! ```text
//!   insert a, b, c        evict            remove(&b)
//!   [a] ─ [b] ─ [c]  ──►  [b] ─ [c]   ──►  [c]
//!    ▲ oldest              a returned
//! ```
//!
//! Explicit removal unlinks the key's node through the handle index, so no
//! stale entries are left behind for the eviction path to skip.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::ds::{IntrusiveList, SlotId};
use crate::error::InvariantError;
use crate::traits::EvictionTracker;

/// Evicts keys in insertion order.
#[derive(Debug)]
pub struct ArrivalTracker<K> {
    queue: IntrusiveList<K>,
    index: FxHashMap<K, SlotId>,
}

impl<K> ArrivalTracker<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: IntrusiveList::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Tracked keys, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.queue.iter()
    }
}

impl<K> Default for ArrivalTracker<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> EvictionTracker<K> for ArrivalTracker<K>
where
    K: Eq + Hash + Clone,
{
    fn on_insert(&mut self, key: K) {
        if self.index.contains_key(&key) {
            return;
        }
        let id = self.queue.push_back(key.clone());
        self.index.insert(key, id);
    }

    #[inline]
    fn on_touch(&mut self, _key: &K) {}

    fn on_evict(&mut self) -> Option<K> {
        let key = self.queue.pop_front()?;
        self.index.remove(&key);
        Some(key)
    }

    fn on_remove(&mut self, key: &K) -> bool {
        match self.index.remove(key) {
            Some(id) => self.queue.remove(id).is_some(),
            None => false,
        }
    }

    fn peek_victim(&self) -> Option<&K> {
        self.queue.front()
    }

    fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn clear(&mut self) {
        self.queue.clear();
        self.index.clear();
    }

    fn check_invariants(&self) -> Result<(), InvariantError> {
        self.queue.check_invariants()?;
        if self.queue.len() != self.index.len() {
            return Err(InvariantError::new(format!(
                "arrival queue holds {} keys but index holds {}",
                self.queue.len(),
                self.index.len()
            )));
        }
        for (key, &id) in &self.index {
            if self.queue.get(id) != Some(key) {
                return Err(InvariantError::new("arrival index points at the wrong node"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_in_insertion_order() {
        let mut tracker = ArrivalTracker::new();
        tracker.on_insert("a");
        tracker.on_insert("b");
        tracker.on_insert("c");

        assert_eq!(tracker.peek_victim(), Some(&"a"));
        assert_eq!(tracker.on_evict(), Some("a"));
        assert_eq!(tracker.on_evict(), Some("b"));
        assert_eq!(tracker.on_evict(), Some("c"));
        assert_eq!(tracker.on_evict(), None);
    }

    #[test]
    fn touch_does_not_reorder() {
        let mut tracker = ArrivalTracker::new();
        tracker.on_insert("a");
        tracker.on_insert("b");
        tracker.on_touch(&"a");
        tracker.on_touch(&"a");
        assert_eq!(tracker.on_evict(), Some("a"));
    }

    #[test]
    fn remove_unlinks_without_stale_entries() {
        let mut tracker = ArrivalTracker::new();
        tracker.on_insert("a");
        tracker.on_insert("b");
        tracker.on_insert("c");

        assert!(tracker.on_remove(&"b"));
        assert!(!tracker.on_remove(&"b"));
        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.iter().copied().collect::<Vec<_>>(), vec!["a", "c"]);
        tracker.check_invariants().unwrap();
    }

    #[test]
    fn reinserted_key_goes_to_the_back() {
        let mut tracker = ArrivalTracker::new();
        tracker.on_insert("a");
        tracker.on_insert("b");
        tracker.on_remove(&"a");
        tracker.on_insert("a");
        assert_eq!(tracker.on_evict(), Some("b"));
        assert_eq!(tracker.on_evict(), Some("a"));
    }

    #[test]
    fn duplicate_insert_is_ignored() {
        let mut tracker = ArrivalTracker::new();
        tracker.on_insert(1);
        tracker.on_insert(1);
        assert_eq!(tracker.len(), 1);
        tracker.check_invariants().unwrap();
    }
}
