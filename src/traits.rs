//! # Eviction Tracker Contract
//!
//! A [`BoundedCache`](crate::cache::BoundedCache) owns its values; the
//! tracker owns only the bookkeeping needed to pick a victim. The cache
//! calls into the tracker on every mutation so that, after each operation
//! completes, the tracker knows exactly the cache's key set.
//!
//! ```text
//!   BoundedCache::put(new key, full)     BoundedCache::get(hit)
//!     │                                    │
//!     ├── on_evict() ──► victim            └── on_touch(&key)
//!     ├── map.remove(victim)
//!     ├── map.insert(key)
//!     └── on_insert(key)
//!
//!   BoundedCache::remove(&key) ──► on_remove(&key)
//! ```
//!
//! ## Policy Comparison
//!
//! | Tracker            | `on_touch`            | `on_evict`                          |
//! |--------------------|-----------------------|-------------------------------------|
//! | `ArrivalTracker`   | no-op                 | oldest insert                       |
//! | `RecencyTracker`   | move to back, O(1)    | least recently touched              |
//! | `FrequencyTracker` | freq += 1, O(1)       | lowest freq, earliest in its bucket |
//! | `RandomTracker`    | no-op                 | uniform over tracked keys           |

use crate::error::InvariantError;

/// Victim-selection bookkeeping for a bounded cache.
///
/// Implementations never see values; they track keys only.
pub trait EvictionTracker<K> {
    /// Starts tracking a key that was just added to the cache.
    fn on_insert(&mut self, key: K);

    /// Records a read or in-place update of a tracked key.
    ///
    /// Policies that ignore access history treat this as a no-op.
    fn on_touch(&mut self, key: &K);

    /// Removes and returns the key that should be evicted next.
    ///
    /// Returns `None` only when nothing is tracked.
    fn on_evict(&mut self) -> Option<K>;

    /// Stops tracking `key` without treating it as an eviction.
    fn on_remove(&mut self, key: &K) -> bool;

    /// The key `on_evict` would return, if the policy can tell ahead of time.
    fn peek_victim(&self) -> Option<&K>;

    fn contains(&self, key: &K) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);

    /// Access count of `key` for frequency-based policies; `None` otherwise.
    fn frequency(&self, _key: &K) -> Option<u64> {
        None
    }

    /// Checks the tracker's internal structures against each other.
    fn check_invariants(&self) -> Result<(), InvariantError>;
}
