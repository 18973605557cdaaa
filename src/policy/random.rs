//! Uniform-random eviction tracking.
//!
//! ## Architecture
//!
//! ```text
//!   index: FxHashMap<K, usize>          keys: Vec<K>
//!   ┌──────────┬─────┐                  ┌─────┬─────┬─────┬─────┐
//!   │  "p1"    │  0  │─────────────────►│ p1  │ p2  │ p3  │ p4  │
//!   │  "p2"    │  1  │                  └─────┴─────┴─────┴─────┘
//!   │  "p3"    │  2  │
//!   │  "p4"    │  3  │
//!   └──────────┴─────┘
//!
//!   on_evict():  i = rng.random_range(0..len)       picks p2
//!                keys.swap_remove(i)               [p1, p4, p3]
//!                index["p4"] = i
//! ```
//!
//! Removal of an arbitrary key uses the same swap-remove, so every
//! operation is O(1) and the key vector never contains holes.
//!
//! The generator is a [`SmallRng`]. [`RandomTracker::with_seed`] makes the
//! victim sequence reproducible, which the tests rely on; otherwise the
//! tracker seeds itself from the operating system.

use std::fmt;
use std::hash::Hash;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;

use crate::error::InvariantError;
use crate::traits::EvictionTracker;

/// Evicts a uniformly random tracked key.
pub struct RandomTracker<K> {
    keys: Vec<K>,
    index: FxHashMap<K, usize>,
    rng: SmallRng,
}

impl<K> RandomTracker<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates a tracker seeded from OS entropy.
    pub fn new() -> Self {
        Self::with_rng(0, SmallRng::from_os_rng())
    }

    /// Creates a tracker with a fixed seed; the same sequence of calls
    /// yields the same victims.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(0, SmallRng::seed_from_u64(seed))
    }

    pub fn with_capacity(capacity: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        Self::with_rng(capacity, rng)
    }

    fn with_rng(capacity: usize, rng: SmallRng) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            rng,
        }
    }

    /// Tracked keys in storage order (not meaningful for eviction).
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    fn swap_remove_at(&mut self, idx: usize) -> K {
        let key = self.keys.swap_remove(idx);
        self.index.remove(&key);
        if let Some(moved) = self.keys.get(idx) {
            if let Some(slot) = self.index.get_mut(moved) {
                *slot = idx;
            }
        }
        key
    }
}

impl<K> Default for RandomTracker<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> fmt::Debug for RandomTracker<K>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomTracker")
            .field("len", &self.keys.len())
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl<K> EvictionTracker<K> for RandomTracker<K>
where
    K: Eq + Hash + Clone,
{
    fn on_insert(&mut self, key: K) {
        if self.index.contains_key(&key) {
            return;
        }
        self.index.insert(key.clone(), self.keys.len());
        self.keys.push(key);
    }

    #[inline]
    fn on_touch(&mut self, _key: &K) {}

    fn on_evict(&mut self) -> Option<K> {
        if self.keys.is_empty() {
            return None;
        }
        let idx = self.rng.random_range(0..self.keys.len());
        Some(self.swap_remove_at(idx))
    }

    fn on_remove(&mut self, key: &K) -> bool {
        match self.index.get(key).copied() {
            Some(idx) => {
                self.swap_remove_at(idx);
                true
            },
            None => false,
        }
    }

    /// Always `None`: the victim is drawn at eviction time.
    fn peek_victim(&self) -> Option<&K> {
        None
    }

    fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    fn len(&self) -> usize {
        self.keys.len()
    }

    fn clear(&mut self) {
        self.keys.clear();
        self.index.clear();
    }

    fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.keys.len() != self.index.len() {
            return Err(InvariantError::new(format!(
                "random key vector holds {} keys but index holds {}",
                self.keys.len(),
                self.index.len()
            )));
        }
        for (pos, key) in self.keys.iter().enumerate() {
            if self.index.get(key) != Some(&pos) {
                return Err(InvariantError::new(format!(
                    "random index disagrees with key position {pos}"
                )));
            }
        }
        Ok(())
    }
}
