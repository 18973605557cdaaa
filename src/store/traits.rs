//! Backing-store contract.
//!
//! A backing store is the slower, authoritative tier behind a
//! [`WriteCache`](crate::write::WriteCache). The controller only ever reads
//! a key or writes a key; how the store persists data is its own business.
//!
//! Both operations take `&mut self` so that a store may keep connection
//! state, counters or buffers without interior mutability. To lend a store
//! to a controller without giving it away, pass `&mut store`: the blanket
//! impl below forwards every call.

/// Storage tier consulted on cache misses and written on cache writes.
pub trait BackingStore<K, V> {
    /// Error produced by the store. Passed through the controller unchanged.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reads the value for `key`. An absent key is `Ok(None)`.
    fn read(&mut self, key: &K) -> Result<Option<V>, Self::Error>;

    /// Persists `value` under `key`, replacing any previous value.
    fn write(&mut self, key: &K, value: &V) -> Result<(), Self::Error>;
}

impl<K, V, S> BackingStore<K, V> for &mut S
where
    S: BackingStore<K, V> + ?Sized,
{
    type Error = S::Error;

    #[inline]
    fn read(&mut self, key: &K) -> Result<Option<V>, Self::Error> {
        (**self).read(key)
    }

    #[inline]
    fn write(&mut self, key: &K, value: &V) -> Result<(), Self::Error> {
        (**self).write(key, value)
    }
}
