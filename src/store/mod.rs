//! Backing stores consulted by the write-propagation controller.

pub mod memory;
pub mod traits;

pub use memory::{MemoryStore, MemoryStoreError};
pub use traits::BackingStore;
