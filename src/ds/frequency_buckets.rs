//! Frequency buckets for O(1) LFU tracking.
//!
//! Every tracked key lives in exactly one bucket, the one matching its
//! access count. Buckets are doubly linked in ascending frequency order and
//! `min_freq` points at the lowest non-empty one, so insert, touch, remove
//! and eviction never scan.
//!
//! ## Architecture
//!
//! ```text
//!   index: FxHashMap<K, SlotId>        entries: SlotArena<Entry<K>>
//!   ┌──────────┬────────┐              ┌──────┬──────────────────────┐
//!   │ "page_a" │  id_0  │─────────────►│ id_0 │ freq:2, prev/next    │
//!   │ "page_b" │  id_1  │─────────────►│ id_1 │ freq:1, prev/next    │
//!   │ "page_c" │  id_2  │─────────────►│ id_2 │ freq:1, prev/next    │
//!   └──────────┴────────┘              └──────┴──────────────────────┘
//!
//!   buckets: FxHashMap<u64, Bucket>
//!
//!   min_freq = 1
//!      │
//!      ▼
//!   freq=1: head ──► [id_2] ◄──► [id_1] ◄── tail   (tail evicted first)
//!   freq=2: head ──► [id_0] ◄── tail
//! ```
//!
//! ## Tie-breaking
//!
//! Keys enter a bucket at its head. Eviction takes the tail of the
//! `min_freq` bucket, so among keys with equal frequency the one that
//! reached that frequency earliest goes first.
//!
//! ## Operations
//!
//! | Operation   | Time | Notes                                   |
//! |-------------|------|-----------------------------------------|
//! | `insert`    | O(1) | New key starts at freq=1                |
//! | `touch`     | O(1) | Moves key to bucket `f + 1`             |
//! | `remove`    | O(1) | Drops the bucket if it becomes empty    |
//! | `pop_min`   | O(1) | Tail of the lowest bucket               |
//! | `frequency` | O(1) | Current access count                    |

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::ds::slot_arena::{SlotArena, SlotId};
use crate::error::InvariantError;

#[derive(Debug)]
struct Entry<K> {
    prev: Option<SlotId>,
    next: Option<SlotId>,
    freq: u64,
    key: K,
}

#[derive(Debug, Default)]
struct Bucket {
    head: Option<SlotId>,
    tail: Option<SlotId>,
    prev: Option<u64>,
    next: Option<u64>,
}

/// Neighbours of a bucket captured before an entry left it.
#[derive(Debug, Clone, Copy)]
struct Departure {
    prev: Option<u64>,
    next: Option<u64>,
    emptied: bool,
}

/// O(1) LFU metadata tracker with FIFO tie-breaking inside a frequency.
///
/// ```
/// use policykit::ds::FrequencyBuckets;
///
/// let mut freq = FrequencyBuckets::new();
/// freq.insert("a");
/// freq.insert("b");
/// freq.touch(&"a");
///
/// assert_eq!(freq.frequency(&"a"), Some(2));
/// assert_eq!(freq.min_freq(), Some(1));
/// assert_eq!(freq.pop_min(), Some(("b", 1)));
/// ```
#[derive(Debug)]
pub struct FrequencyBuckets<K> {
    entries: SlotArena<Entry<K>>,
    index: FxHashMap<K, SlotId>,
    buckets: FxHashMap<u64, Bucket>,
    min_freq: u64,
}

impl<K> FrequencyBuckets<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty tracker sized for `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: SlotArena::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            buckets: FxHashMap::default(),
            min_freq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Current frequency of `key`, or `None` if it is not tracked.
    pub fn frequency(&self, key: &K) -> Option<u64> {
        let id = *self.index.get(key)?;
        self.entries.get(id).map(|entry| entry.freq)
    }

    /// Lowest frequency currently present.
    pub fn min_freq(&self) -> Option<u64> {
        (self.min_freq != 0).then_some(self.min_freq)
    }

    /// Number of non-empty buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Next eviction candidate without removing it.
    pub fn peek_min(&self) -> Option<(&K, u64)> {
        let id = self.buckets.get(&self.min_freq)?.tail?;
        self.entries.get(id).map(|entry| (&entry.key, entry.freq))
    }

    /// Keys at frequency `freq`, in eviction order (tail first).
    pub fn bucket_keys(&self, freq: u64) -> BucketKeys<'_, K> {
        BucketKeys {
            buckets: self,
            current: self.buckets.get(&freq).and_then(|bucket| bucket.tail),
        }
    }

    /// Starts tracking `key` at frequency 1.
    ///
    /// Returns `false` (and changes nothing) if the key is already tracked.
    pub fn insert(&mut self, key: K) -> bool {
        if self.index.contains_key(&key) {
            return false;
        }

        let id = self.entries.insert(Entry {
            prev: None,
            next: None,
            freq: 1,
            key: key.clone(),
        });
        self.index.insert(key, id);

        if !self.buckets.contains_key(&1) {
            let next = self.min_freq();
            self.insert_bucket(1, None, next);
        }
        self.list_push_front(1, id);
        self.min_freq = 1;
        true
    }

    /// Moves `key` from bucket `f` to bucket `f + 1` and returns the new frequency.
    ///
    /// A key already at `u64::MAX` keeps its frequency and is only refreshed
    /// within its bucket.
    pub fn touch(&mut self, key: &K) -> Option<u64> {
        let id = *self.index.get(key)?;
        let freq = self.entries.get(id)?.freq;
        if freq == u64::MAX {
            self.list_remove(freq, id)?;
            self.list_push_front(freq, id);
            return Some(freq);
        }

        let next_freq = freq + 1;
        let departure = self.depart(freq, id)?;
        if !self.buckets.contains_key(&next_freq) {
            let prev = if departure.emptied {
                departure.prev
            } else {
                Some(freq)
            };
            self.insert_bucket(next_freq, prev, departure.next);
        }

        if let Some(entry) = self.entries.get_mut(id) {
            entry.freq = next_freq;
        }
        self.list_push_front(next_freq, id);
        if self.min_freq == 0 || next_freq < self.min_freq {
            self.min_freq = next_freq;
        }
        Some(next_freq)
    }

    /// Stops tracking `key`, returning the frequency it had.
    pub fn remove(&mut self, key: &K) -> Option<u64> {
        let id = *self.index.get(key)?;
        let freq = self.entries.get(id)?.freq;
        self.depart(freq, id)?;
        self.index.remove(key);
        self.entries.remove(id).map(|entry| entry.freq)
    }

    /// Removes and returns the eviction candidate `(key, freq)`.
    pub fn pop_min(&mut self) -> Option<(K, u64)> {
        let freq = self.min_freq;
        let id = self.buckets.get(&freq)?.tail?;
        self.depart(freq, id)?;
        let entry = self.entries.remove(id)?;
        self.index.remove(&entry.key);
        Some((entry.key, entry.freq))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.buckets.clear();
        self.min_freq = 0;
    }

    /// Verifies bucket chains, entry frequencies and the `min_freq` pointer.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.len() != self.index.len() {
            return Err(InvariantError::new(format!(
                "frequency index holds {} keys but arena holds {}",
                self.index.len(),
                self.len()
            )));
        }

        if self.is_empty() {
            if !self.buckets.is_empty() || self.min_freq != 0 {
                return Err(InvariantError::new(
                    "empty frequency tracker still has buckets",
                ));
            }
            return Ok(());
        }

        let lowest = self.buckets.keys().copied().min();
        if lowest != self.min_freq() {
            return Err(InvariantError::new(format!(
                "min_freq is {} but lowest bucket is {:?}",
                self.min_freq, lowest
            )));
        }

        let mut reached = 0usize;
        for (&freq, bucket) in &self.buckets {
            match bucket.prev {
                Some(prev) if self.buckets.get(&prev).and_then(|b| b.next) != Some(freq) => {
                    return Err(InvariantError::new(format!(
                        "bucket {prev} does not link forward to {freq}"
                    )));
                },
                None if freq != self.min_freq => {
                    return Err(InvariantError::new(format!(
                        "bucket {freq} has no predecessor but is not the minimum"
                    )));
                },
                _ => {},
            }
            if let Some(next) = bucket.next {
                if next <= freq || self.buckets.get(&next).and_then(|b| b.prev) != Some(freq) {
                    return Err(InvariantError::new(format!(
                        "bucket {next} does not link back to {freq}"
                    )));
                }
            }

            let mut current = bucket.head;
            let mut last = None;
            let mut count = 0usize;
            while let Some(id) = current {
                let entry = self.entries.get(id).ok_or_else(|| {
                    InvariantError::new(format!("bucket {freq} links a freed slot"))
                })?;
                if entry.freq != freq {
                    return Err(InvariantError::new(format!(
                        "entry with freq {} sits in bucket {freq}",
                        entry.freq
                    )));
                }
                if entry.prev != last || self.index.get(&entry.key) != Some(&id) {
                    return Err(InvariantError::new(format!(
                        "bucket {freq} chain is inconsistent"
                    )));
                }
                count += 1;
                if count > self.len() {
                    return Err(InvariantError::new(format!("bucket {freq} has a cycle")));
                }
                last = Some(id);
                current = entry.next;
            }
            if count == 0 || bucket.tail != last {
                return Err(InvariantError::new(format!(
                    "bucket {freq} is empty or has a stale tail"
                )));
            }
            reached += count;
        }

        if reached != self.len() {
            return Err(InvariantError::new(format!(
                "buckets reach {reached} entries but {} are tracked",
                self.len()
            )));
        }
        Ok(())
    }

    /// Unlinks `id` from bucket `freq`, dropping the bucket if it empties.
    fn depart(&mut self, freq: u64, id: SlotId) -> Option<Departure> {
        self.list_remove(freq, id)?;
        let bucket = self.buckets.get(&freq)?;
        let departure = Departure {
            prev: bucket.prev,
            next: bucket.next,
            emptied: bucket.head.is_none(),
        };
        if departure.emptied {
            self.remove_bucket(freq, departure.prev, departure.next);
            if self.min_freq == freq {
                self.min_freq = departure.next.unwrap_or(0);
            }
        }
        Some(departure)
    }

    fn insert_bucket(&mut self, freq: u64, prev: Option<u64>, next: Option<u64>) {
        self.buckets.insert(
            freq,
            Bucket {
                head: None,
                tail: None,
                prev,
                next,
            },
        );
        if let Some(bucket) = prev.and_then(|p| self.buckets.get_mut(&p)) {
            bucket.next = Some(freq);
        }
        if let Some(bucket) = next.and_then(|n| self.buckets.get_mut(&n)) {
            bucket.prev = Some(freq);
        }
    }

    fn remove_bucket(&mut self, freq: u64, prev: Option<u64>, next: Option<u64>) {
        if let Some(bucket) = prev.and_then(|p| self.buckets.get_mut(&p)) {
            bucket.next = next;
        }
        if let Some(bucket) = next.and_then(|n| self.buckets.get_mut(&n)) {
            bucket.prev = prev;
        }
        self.buckets.remove(&freq);
    }

    fn list_push_front(&mut self, freq: u64, id: SlotId) {
        let Some(bucket) = self.buckets.get_mut(&freq) else {
            return;
        };
        let old_head = bucket.head;
        match old_head {
            Some(head) => {
                if let Some(entry) = self.entries.get_mut(head) {
                    entry.prev = Some(id);
                }
            },
            None => bucket.tail = Some(id),
        }
        bucket.head = Some(id);
        if let Some(entry) = self.entries.get_mut(id) {
            entry.prev = None;
            entry.next = old_head;
        }
    }

    fn list_remove(&mut self, freq: u64, id: SlotId) -> Option<()> {
        let (prev, next) = {
            let entry = self.entries.get(id)?;
            (entry.prev, entry.next)
        };

        let bucket = self.buckets.get_mut(&freq)?;
        match prev {
            Some(prev) => {
                if let Some(entry) = self.entries.get_mut(prev) {
                    entry.next = next;
                }
            },
            None => bucket.head = next,
        }
        match next {
            Some(next) => {
                if let Some(entry) = self.entries.get_mut(next) {
                    entry.prev = prev;
                }
            },
            None => bucket.tail = prev,
        }

        let entry = self.entries.get_mut(id)?;
        entry.prev = None;
        entry.next = None;
        Some(())
    }
}

impl<K> Default for FrequencyBuckets<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Keys of one bucket from tail (next victim) to head.
pub struct BucketKeys<'a, K> {
    buckets: &'a FrequencyBuckets<K>,
    current: Option<SlotId>,
}

impl<'a, K> Iterator for BucketKeys<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let entry = self.buckets.entries.get(id)?;
        self.current = entry.prev;
        Some(&entry.key)
    }
}
