//! Configuration and builder for caches and write controllers.
//!
//! [`CacheConfig`] gathers every knob in one plain struct; [`CacheBuilder`]
//! is the fluent way to fill it in. Both validate on build, so an invalid
//! capacity is reported once, as a [`ConfigError`].
//!
//! ## Example
//!
//! ```rust
//! use policykit::builder::CacheBuilder;
//! use policykit::policy::EvictionPolicy;
//! use policykit::store::MemoryStore;
//! use policykit::write::WritePolicy;
//!
//! let mut wc = CacheBuilder::new(100)
//!     .eviction(EvictionPolicy::Lfu)
//!     .write_policy(WritePolicy::Back)
//!     .build::<u64, String, _>(MemoryStore::new())
//!     .unwrap();
//! wc.put(1, "hello".to_string()).unwrap();
//! assert_eq!(wc.get(&1).unwrap(), Some("hello".to_string()));
//! ```

use std::hash::Hash;

use crate::cache::BoundedCache;
use crate::error::ConfigError;
use crate::policy::EvictionPolicy;
use crate::store::traits::BackingStore;
use crate::write::{SharedWriteCache, WriteCache, WritePolicy};

/// Everything needed to build a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries. 0 is only valid for LFU.
    pub capacity: usize,
    pub eviction: EvictionPolicy,
    pub write_policy: WritePolicy,
    /// Seed for random eviction; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            eviction: EvictionPolicy::default(),
            write_policy: WritePolicy::default(),
            seed: None,
        }
    }
}

impl CacheConfig {
    /// Checks the configuration without building anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 && !self.eviction.allows_zero_capacity() {
            return Err(ConfigError::InvalidCapacity {
                policy: self.eviction,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Builds a bare bounded cache; `write_policy` is ignored.
    pub fn build_map<K, V>(&self) -> Result<BoundedCache<K, V>, ConfigError>
    where
        K: Eq + Hash + Clone,
    {
        BoundedCache::with_seed(self.capacity, self.eviction, self.seed)
    }

    /// Builds a write controller in front of `store`.
    pub fn build<K, V, S>(&self, store: S) -> Result<WriteCache<K, V, S>, ConfigError>
    where
        K: Eq + Hash + Clone,
        S: BackingStore<K, V>,
    {
        let cache = self.build_map()?;
        Ok(WriteCache::new(cache, store, self.write_policy))
    }
}

/// Fluent builder over [`CacheConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheBuilder {
    config: CacheConfig,
}

impl CacheBuilder {
    /// Starts from the default configuration with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            config: CacheConfig {
                capacity,
                ..CacheConfig::default()
            },
        }
    }

    pub fn from_config(config: CacheConfig) -> Self {
        Self { config }
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    pub fn eviction(mut self, policy: EvictionPolicy) -> Self {
        self.config.eviction = policy;
        self
    }

    pub fn write_policy(mut self, policy: WritePolicy) -> Self {
        self.config.write_policy = policy;
        self
    }

    /// Fixes the random-eviction seed so runs are reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn build_map<K, V>(self) -> Result<BoundedCache<K, V>, ConfigError>
    where
        K: Eq + Hash + Clone,
    {
        self.config.build_map()
    }

    pub fn build<K, V, S>(self, store: S) -> Result<WriteCache<K, V, S>, ConfigError>
    where
        K: Eq + Hash + Clone,
        S: BackingStore<K, V>,
    {
        self.config.build(store)
    }

    /// Like [`build`](Self::build), wrapped for sharing between threads.
    pub fn build_shared<K, V, S>(self, store: S) -> Result<SharedWriteCache<K, V, S>, ConfigError>
    where
        K: Eq + Hash + Clone,
        S: BackingStore<K, V>,
    {
        self.config.build(store).map(SharedWriteCache::new)
    }
}
