//! The Storage Engine Capability
//!
//! Everything above the storage layer (the dispatcher, the server) talks to
//! the store through [`StorageEngine`]. The production implementation is
//! [`ShardedMap`](crate::storage::ShardedMap); tests are free to plug in a
//! simpler map.
//!
//! Absence of a key is a value (`None`), not an error: none of the operations
//! can fail once the engine is constructed.

use bytes::Bytes;

/// Basic key/value operations over a binary-safe namespace.
///
/// Implementations are shared across connection tasks, so every method takes
/// `&self` and handles its own synchronization.
pub trait StorageEngine: Send + Sync + 'static {
    /// Returns a copy of the value stored under `key`, or `None` if absent.
    fn get(&self, key: &[u8]) -> Option<Bytes>;

    /// Stores `value` under `key`, overwriting any previous value.
    fn set(&self, key: Bytes, value: Bytes);

    /// Removes `key` if present. Removing an absent key is a no-op.
    fn remove(&self, key: &[u8]);
}
