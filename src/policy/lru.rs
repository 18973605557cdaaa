//! Recency-order (LRU) tracking.
//!
//! Same shape as arrival order, except that every touch moves the key to
//! the back of the list. The front is therefore always the key that has
//! gone longest without being read or written.
//!
//! ## Architecture
//!
//! ```text
//!   index: FxHashMap<K, SlotId>         order: IntrusiveList<K>
//!   ┌──────┬────────┐
//!   │ "a"  │  id_0  │───┐         front                       back
//!   │ "b"  │  id_1  │───┼───►      [id_1] ◄──► [id_2] ◄──► [id_0]
//!   │ "c"  │  id_2  │───┘          LRU                         MRU
//!   └──────┴────────┘
//!
//!   on_touch("a"):  index lookup → move_to_back(id_0)       O(1)
//!   on_evict():     pop_front    → "b"                      O(1)
//! ```
//!
//! The handle index means a touch never scans the list, which keeps
//! recency maintenance constant-time regardless of cache size.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::ds::{IntrusiveList, SlotId};
use crate::error::InvariantError;
use crate::traits::EvictionTracker;

/// Evicts the least recently touched key.
///
/// ```
/// use policykit::policy::lru::RecencyTracker;
/// use policykit::traits::EvictionTracker;
///
/// let mut tracker = RecencyTracker::new();
/// tracker.on_insert("a");
/// tracker.on_insert("b");
/// tracker.on_touch(&"a");
/// assert_eq!(tracker.on_evict(), Some("b"));
/// ```
#[derive(Debug)]
pub struct RecencyTracker<K> {
    order: IntrusiveList<K>,
    index: FxHashMap<K, SlotId>,
}

impl<K> RecencyTracker<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            order: IntrusiveList::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Tracked keys from least to most recently touched.
    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.order.iter()
    }

    /// Most recently touched key.
    pub fn most_recent(&self) -> Option<&K> {
        self.order.back()
    }
}

impl<K> Default for RecencyTracker<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> EvictionTracker<K> for RecencyTracker<K>
where
    K: Eq + Hash + Clone,
{
    fn on_insert(&mut self, key: K) {
        if let Some(&id) = self.index.get(&key) {
            self.order.move_to_back(id);
            return;
        }
        let id = self.order.push_back(key.clone());
        self.index.insert(key, id);
    }

    #[inline]
    fn on_touch(&mut self, key: &K) {
        if let Some(&id) = self.index.get(key) {
            self.order.move_to_back(id);
        }
    }

    fn on_evict(&mut self) -> Option<K> {
        let key = self.order.pop_front()?;
        self.index.remove(&key);
        Some(key)
    }

    fn on_remove(&mut self, key: &K) -> bool {
        match self.index.remove(key) {
            Some(id) => self.order.remove(id).is_some(),
            None => false,
        }
    }

    fn peek_victim(&self) -> Option<&K> {
        self.order.front()
    }

    fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn clear(&mut self) {
        self.order.clear();
        self.index.clear();
    }

    fn check_invariants(&self) -> Result<(), InvariantError> {
        self.order.check_invariants()?;
        if self.order.len() != self.index.len() {
            return Err(InvariantError::new(format!(
                "recency list holds {} keys but index holds {}",
                self.order.len(),
                self.index.len()
            )));
        }
        for (key, &id) in &self.index {
            if self.order.get(id) != Some(key) {
                return Err(InvariantError::new("recency index points at the wrong node"));
            }
        }
        Ok(())
    }
}
