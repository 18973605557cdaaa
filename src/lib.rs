//! policykit: a bounded cache with pluggable eviction and write propagation.
//!
//! Layers, leaves first:
//!
//! - [`ds`]: slot arena, intrusive list and frequency buckets.
//! - [`policy`]: FIFO, LRU, LFU and random eviction trackers behind
//!   [`traits::EvictionTracker`].
//! - [`cache`]: [`BoundedCache`](cache::BoundedCache), a capacity-bounded map
//!   kept in lockstep with one tracker.
//! - [`write`]: write-through, write-around and write-back controllers over a
//!   [`store::BackingStore`].
//! - [`builder`]: one place to pick capacity, eviction, write policy and seed.

pub mod builder;
pub mod cache;
pub mod ds;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod prelude;
pub mod store;
pub mod traits;
pub mod write;
