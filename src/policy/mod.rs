//! Eviction policies.
//!
//! Each policy is a key-only tracker implementing
//! [`EvictionTracker`](crate::traits::EvictionTracker). [`Tracker`] is the
//! closed set of built-in trackers behind one type, selected at runtime
//! from an [`EvictionPolicy`].
//!
//! | Policy                     | Tracker            | Module     |
//! |----------------------------|--------------------|------------|
//! | [`EvictionPolicy::Fifo`]   | [`ArrivalTracker`]   | [`fifo`]   |
//! | [`EvictionPolicy::Lru`]    | [`RecencyTracker`]   | [`lru`]    |
//! | [`EvictionPolicy::Lfu`]    | [`FrequencyTracker`] | [`lfu`]    |
//! | [`EvictionPolicy::Random`] | [`RandomTracker`]    | [`random`] |

use std::fmt;
use std::hash::Hash;

use crate::error::InvariantError;
use crate::traits::EvictionTracker;

pub mod fifo;
pub mod lfu;
pub mod lru;
pub mod random;

pub use fifo::ArrivalTracker;
pub use lfu::FrequencyTracker;
pub use lru::RecencyTracker;
pub use random::RandomTracker;

/// Upper bound on slots reserved up front; larger caches grow on demand.
pub(crate) const MAX_PREALLOC: usize = 4096;

/// Which victim-selection strategy a cache uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EvictionPolicy {
    /// Oldest insert goes first; reads do not matter.
    Fifo,
    /// Least recently read or written goes first.
    #[default]
    Lru,
    /// Lowest access count goes first.
    Lfu,
    /// Any key, chosen uniformly.
    Random,
}

impl EvictionPolicy {
    pub const ALL: [EvictionPolicy; 4] = [
        EvictionPolicy::Fifo,
        EvictionPolicy::Lru,
        EvictionPolicy::Lfu,
        EvictionPolicy::Random,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EvictionPolicy::Fifo => "fifo",
            EvictionPolicy::Lru => "lru",
            EvictionPolicy::Lfu => "lfu",
            EvictionPolicy::Random => "random",
        }
    }

    /// Whether a cache of capacity 0 is meaningful for this policy.
    ///
    /// Only LFU accepts it, as a cache that never stores anything.
    pub fn allows_zero_capacity(self) -> bool {
        matches!(self, EvictionPolicy::Lfu)
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the built-in trackers.
#[derive(Debug)]
pub enum Tracker<K> {
    Arrival(ArrivalTracker<K>),
    Recency(RecencyTracker<K>),
    Frequency(FrequencyTracker<K>),
    Random(RandomTracker<K>),
}

impl<K> Tracker<K>
where
    K: Eq + Hash + Clone,
{
    /// Builds the tracker for `policy`, preallocated for up to `capacity`
    /// keys.
    ///
    /// `seed` only affects [`EvictionPolicy::Random`]; `None` seeds from the
    /// operating system.
    pub fn for_policy(policy: EvictionPolicy, capacity: usize, seed: Option<u64>) -> Self {
        let capacity = capacity.min(MAX_PREALLOC);
        match policy {
            EvictionPolicy::Fifo => Tracker::Arrival(ArrivalTracker::with_capacity(capacity)),
            EvictionPolicy::Lru => Tracker::Recency(RecencyTracker::with_capacity(capacity)),
            EvictionPolicy::Lfu => Tracker::Frequency(FrequencyTracker::with_capacity(capacity)),
            EvictionPolicy::Random => {
                Tracker::Random(RandomTracker::with_capacity(capacity, seed))
            },
        }
    }

    pub fn policy(&self) -> EvictionPolicy {
        match self {
            Tracker::Arrival(_) => EvictionPolicy::Fifo,
            Tracker::Recency(_) => EvictionPolicy::Lru,
            Tracker::Frequency(_) => EvictionPolicy::Lfu,
            Tracker::Random(_) => EvictionPolicy::Random,
        }
    }
}

macro_rules! dispatch {
    ($self:expr, $t:ident => $body:expr) => {
        match $self {
            Tracker::Arrival($t) => $body,
            Tracker::Recency($t) => $body,
            Tracker::Frequency($t) => $body,
            Tracker::Random($t) => $body,
        }
    };
}

impl<K> EvictionTracker<K> for Tracker<K>
where
    K: Eq + Hash + Clone,
{
    #[inline]
    fn on_insert(&mut self, key: K) {
        dispatch!(self, t => t.on_insert(key))
    }

    #[inline]
    fn on_touch(&mut self, key: &K) {
        dispatch!(self, t => t.on_touch(key))
    }

    #[inline]
    fn on_evict(&mut self) -> Option<K> {
        dispatch!(self, t => t.on_evict())
    }

    #[inline]
    fn on_remove(&mut self, key: &K) -> bool {
        dispatch!(self, t => t.on_remove(key))
    }

    fn peek_victim(&self) -> Option<&K> {
        dispatch!(self, t => t.peek_victim())
    }

    fn contains(&self, key: &K) -> bool {
        dispatch!(self, t => t.contains(key))
    }

    fn len(&self) -> usize {
        dispatch!(self, t => t.len())
    }

    fn clear(&mut self) {
        dispatch!(self, t => t.clear())
    }

    fn frequency(&self, key: &K) -> Option<u64> {
        dispatch!(self, t => t.frequency(key))
    }

    fn check_invariants(&self) -> Result<(), InvariantError> {
        dispatch!(self, t => t.check_invariants())
    }
}
