pub use crate::builder::{CacheBuilder, CacheConfig};
pub use crate::cache::{BoundedCache, CacheEntry};
pub use crate::ds::{FrequencyBuckets, IntrusiveList, SlotArena, SlotId};
pub use crate::error::{CacheError, ConfigError, FlushError, InvariantError};
pub use crate::metrics::CacheMetrics;
pub use crate::policy::{
    ArrivalTracker, EvictionPolicy, FrequencyTracker, RandomTracker, RecencyTracker, Tracker,
};
pub use crate::store::{BackingStore, MemoryStore, MemoryStoreError};
pub use crate::traits::EvictionTracker;
pub use crate::write::{SharedWriteCache, WriteCache, WritePolicy};
