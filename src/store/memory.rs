//! In-memory reference backing store.
//!
//! ## Key Components
//! - [`MemoryStore`]: `FxHashMap`-backed [`BackingStore`] with traffic
//!   counters and failure switches.
//! - [`MemoryStoreError`]: the errors those switches produce.
//!
//! ## Failure Injection
//! - [`fail_writes_for`](MemoryStore::fail_writes_for): writes of that key
//!   return [`MemoryStoreError::WriteRejected`] until
//!   [`allow_writes_for`](MemoryStore::allow_writes_for) is called.
//! - [`fail_reads`](MemoryStore::fail_reads): every read returns
//!   [`MemoryStoreError::ReadUnavailable`] while enabled.
//!
//! Failed operations still count toward `read_count`/`write_count`, so tests
//! can assert that an attempt was made.
//!
//! ## Example Usage
//! ```rust
//! use policykit::store::memory::MemoryStore;
//! use policykit::store::traits::BackingStore;
//!
//! let mut store: MemoryStore<&str, i32> = MemoryStore::new();
//! store.write(&"a", &1).unwrap();
//! assert_eq!(store.read(&"a").unwrap(), Some(1));
//! assert_eq!(store.write_count(), 1);
//! ```

use std::fmt::Debug;
use std::hash::Hash;

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::store::traits::BackingStore;

/// Errors injected by [`MemoryStore`]'s failure switches.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryStoreError {
    #[error("write rejected for key {0}")]
    WriteRejected(String),
    #[error("store unavailable for reads")]
    ReadUnavailable,
}

/// Single-threaded in-memory store.
#[derive(Debug, Clone)]
pub struct MemoryStore<K, V> {
    data: FxHashMap<K, V>,
    failing_writes: FxHashSet<K>,
    fail_reads: bool,
    reads: u64,
    writes: u64,
}

impl<K, V> MemoryStore<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            data: FxHashMap::default(),
            failing_writes: FxHashSet::default(),
            fail_reads: false,
            reads: 0,
            writes: 0,
        }
    }

    /// Seeds the store with `pairs` without counting them as writes.
    pub fn with_data(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        let mut store = Self::new();
        store.data.extend(pairs);
        store
    }

    /// Direct lookup that bypasses counters and failure switches.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.data.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.data.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Makes every later write of `key` fail.
    pub fn fail_writes_for(&mut self, key: K) {
        self.failing_writes.insert(key);
    }

    pub fn allow_writes_for(&mut self, key: &K) {
        self.failing_writes.remove(key);
    }

    /// Turns read failures on or off.
    pub fn fail_reads(&mut self, enabled: bool) {
        self.fail_reads = enabled;
    }

    /// Number of `read` calls, failed ones included.
    pub fn read_count(&self) -> u64 {
        self.reads
    }

    /// Number of `write` calls, failed ones included.
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    pub fn reset_counts(&mut self) {
        self.reads = 0;
        self.writes = 0;
    }
}

impl<K, V> Default for MemoryStore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> BackingStore<K, V> for MemoryStore<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    type Error = MemoryStoreError;

    fn read(&mut self, key: &K) -> Result<Option<V>, Self::Error> {
        self.reads += 1;
        if self.fail_reads {
            return Err(MemoryStoreError::ReadUnavailable);
        }
        Ok(self.data.get(key).cloned())
    }

    fn write(&mut self, key: &K, value: &V) -> Result<(), Self::Error> {
        self.writes += 1;
        if self.failing_writes.contains(key) {
            return Err(MemoryStoreError::WriteRejected(format!("{key:?}")));
        }
        self.data.insert(key.clone(), value.clone());
        Ok(())
    }
}
