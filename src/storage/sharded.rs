//! Sharded, Thread-Safe Key-Value Map
//!
//! This module implements the production storage engine for memrydb.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Instead of one big lock, the keyspace is split across
//!    a fixed number of shards, each with its own `RwLock`.
//! 2. **Stable Routing**: A key always lives in `shards[fnv1a(key) % n]`. The
//!    shard array is a boxed slice, so `n` cannot change after construction.
//! 3. **RwLock**: Readers of a shard run concurrently; writers are exclusive.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ShardedMap                            │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐            │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │            │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │            │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │            │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! An operation only ever touches the lock of the shard that owns its key, so
//! operations on keys in different shards never wait on each other.

use crate::hasher::hash32;
use crate::storage::StorageEngine;
use bytes::Bytes;
use std::collections::HashMap;
use std::num::NonZeroU8;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shard count used when the configuration asks for `0`.
pub const DEFAULT_SHARD_COUNT: u8 = 32;

type Entries = HashMap<Bytes, Bytes>;

/// A single shard containing a portion of the key-value pairs.
#[derive(Debug, Default)]
struct Shard {
    entries: RwLock<Entries>,
}

impl Shard {
    // A writer that panicked mid-insert cannot leave a HashMap in a torn
    // state, so a poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Counters describing the map's contents and traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of shards
    pub shards: usize,
    /// Number of keys currently stored
    pub keys: usize,
    /// Total GET operations
    pub gets: u64,
    /// Total SET operations
    pub sets: u64,
    /// Total REMOVE operations
    pub removes: u64,
}

/// The sharded storage engine.
///
/// Created once at startup and shared (behind an `Arc`) by every connection
/// task for the lifetime of the process.
///
/// # Example
///
/// ```
/// use memrydb::storage::{ShardedMap, StorageEngine};
/// use bytes::Bytes;
///
/// let map = ShardedMap::new(8);
///
/// map.set(Bytes::from("name"), Bytes::from("cedric"));
/// assert_eq!(map.get(b"name"), Some(Bytes::from("cedric")));
///
/// map.remove(b"name");
/// assert_eq!(map.get(b"name"), None);
/// ```
pub struct ShardedMap {
    /// Fixed-size shard array
    shards: Box<[Shard]>,

    /// Statistics: total GET operations
    get_count: AtomicU64,

    /// Statistics: total SET operations
    set_count: AtomicU64,

    /// Statistics: total REMOVE operations
    remove_count: AtomicU64,
}

impl std::fmt::Debug for ShardedMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedMap")
            .field("shards", &self.shards.len())
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .field("set_count", &self.set_count.load(Ordering::Relaxed))
            .field("remove_count", &self.remove_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for ShardedMap {
    fn default() -> Self {
        Self::new(DEFAULT_SHARD_COUNT)
    }
}

impl ShardedMap {
    /// Creates a map with `shard_count` empty shards.
    ///
    /// A `shard_count` of `0` means "use the default" ([`DEFAULT_SHARD_COUNT`]).
    pub fn new(shard_count: u8) -> Self {
        let count = NonZeroU8::new(shard_count)
            .map_or(DEFAULT_SHARD_COUNT, NonZeroU8::get);
        let shards = (0..count).map(|_| Shard::default()).collect();

        Self {
            shards,
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            remove_count: AtomicU64::new(0),
        }
    }

    /// Number of shards. Never zero, never changes.
    #[inline]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Determines which shard owns a key.
    #[inline]
    pub fn shard_index(&self, key: &[u8]) -> usize {
        // `shards.len()` is in 1..=255, so the cast is lossless.
        (hash32(key) % self.shards.len() as u32) as usize
    }

    #[inline]
    fn shard(&self, key: &[u8]) -> &Shard {
        &self.shards[self.shard_index(key)]
    }

    /// Returns the total number of keys across all shards.
    ///
    /// Shards are visited one at a time, so under concurrent writes the
    /// result is a snapshot of each shard, not of the whole map.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    /// Returns true if no shard holds a key.
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().is_empty())
    }

    /// Returns storage statistics.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            shards: self.shard_count(),
            keys: self.len(),
            gets: self.get_count.load(Ordering::Relaxed),
            sets: self.set_count.load(Ordering::Relaxed),
            removes: self.remove_count.load(Ordering::Relaxed),
        }
    }
}

impl StorageEngine for ShardedMap {
    fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        self.shard(key).read().get(key).cloned()
    }

    fn set(&self, key: Bytes, value: Bytes) {
        self.set_count.fetch_add(1, Ordering::Relaxed);
        self.shard(&key).write().insert(key, value);
    }

    fn remove(&self, key: &[u8]) {
        self.remove_count.fetch_add(1, Ordering::Relaxed);
        self.shard(key).write().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    const KEY: &[u8] = b"user:1000";

    /// Finds a key that is routed to a different shard than `other`.
    fn key_in_other_shard(map: &ShardedMap, other: &[u8]) -> Bytes {
        let taken = map.shard_index(other);
        (0..)
            .map(|i| Bytes::from(format!("key:{}", i)))
            .find(|candidate| map.shard_index(candidate) != taken)
            .unwrap()
    }

    #[test]
    fn test_set_and_get() {
        let map = ShardedMap::new(8);
        let value = Bytes::from(r#"{"name": "cedric", "surname": "michael"}"#);

        map.set(Bytes::from_static(KEY), value.clone());
        assert_eq!(map.get(KEY), Some(value));
    }

    #[test]
    fn test_get_nonexistent() {
        let map = ShardedMap::new(8);
        assert_eq!(map.get(KEY), None);
    }

    #[test]
    fn test_overwrite() {
        let map = ShardedMap::new(8);

        map.set(Bytes::from_static(KEY), Bytes::from("first"));
        map.set(Bytes::from_static(KEY), Bytes::from("second"));

        assert_eq!(map.get(KEY), Some(Bytes::from("second")));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_remove() {
        let map = ShardedMap::new(8);

        map.set(Bytes::from_static(KEY), Bytes::from(r#"{"name": "Lekene Cedric"}"#));
        map.remove(KEY);

        assert_eq!(map.get(KEY), None);
        assert!(map.is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let map = ShardedMap::new(8);
        map.set(Bytes::from("other"), Bytes::from("value"));

        map.remove(b"never-set");
        map.remove(b"never-set");

        assert_eq!(map.len(), 1);
        assert_eq!(map.get(b"other"), Some(Bytes::from("value")));
    }

    #[test]
    fn test_zero_uses_default_shard_count() {
        assert_eq!(ShardedMap::new(0).shard_count(), DEFAULT_SHARD_COUNT as usize);
        assert_eq!(ShardedMap::default().shard_count(), 32);
        assert_eq!(ShardedMap::new(1).shard_count(), 1);
        assert_eq!(ShardedMap::new(255).shard_count(), 255);
    }

    #[test]
    fn test_shard_index_in_range() {
        for n in 1..=u8::MAX {
            let map = ShardedMap::new(n);
            for i in 0..64 {
                let key = format!("user:{}", i);
                assert!(map.shard_index(key.as_bytes()) < n as usize);
            }
        }
    }

    #[test]
    fn test_routing_is_stable() {
        let a = ShardedMap::new(16);
        let b = ShardedMap::new(16);

        for i in 0..100 {
            let key = format!("session:{}", i);
            let expected = (hash32(key.as_bytes()) % 16) as usize;
            assert_eq!(a.shard_index(key.as_bytes()), expected);
            assert_eq!(a.shard_index(key.as_bytes()), b.shard_index(key.as_bytes()));
        }
    }

    #[test]
    fn test_binary_keys() {
        let map = ShardedMap::new(4);
        let key = Bytes::from_static(b"with space\x00\xff");

        map.set(key.clone(), Bytes::from_static(b"\x01\x02"));
        assert_eq!(map.get(&key), Some(Bytes::from_static(b"\x01\x02")));
    }

    #[test]
    fn test_stats() {
        let map = ShardedMap::new(4);

        map.set(Bytes::from("a"), Bytes::from("1"));
        map.set(Bytes::from("b"), Bytes::from("2"));
        map.get(b"a");
        map.get(b"missing");
        map.remove(b"a");

        assert_eq!(
            map.stats(),
            StorageStats {
                shards: 4,
                keys: 1,
                gets: 2,
                sets: 2,
                removes: 1,
            }
        );
    }

    #[test]
    fn test_concurrent_access() {
        let map = Arc::new(ShardedMap::new(16));
        let mut handles = vec![];

        // Spawn multiple writers
        for i in 0..10 {
            let map = Arc::clone(&map);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let key = Bytes::from(format!("key-{}-{}", i, j));
                    map.set(key.clone(), Bytes::from("value"));
                    assert_eq!(map.get(&key), Some(Bytes::from("value")));
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(map.len(), 1000);
    }

    #[test]
    fn test_other_shard_not_blocked_by_writer() {
        let map = Arc::new(ShardedMap::new(8));
        let held_key: &[u8] = b"held";
        let free_key = key_in_other_shard(&map, held_key);

        // Hold the write lock of one shard for the whole test
        let guard = map.shards[map.shard_index(held_key)].write();

        let (tx, rx) = mpsc::channel();
        let worker = {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                map.set(free_key.clone(), Bytes::from("value"));
                tx.send(map.get(&free_key)).unwrap();
            })
        };

        let result = rx.recv_timeout(Duration::from_secs(5));
        drop(guard);
        worker.join().unwrap();

        assert_eq!(result, Ok(Some(Bytes::from("value"))));
    }

    #[test]
    fn test_same_shard_writer_waits() {
        let map = Arc::new(ShardedMap::new(1));
        let guard = map.shards[0].write();

        let (tx, rx) = mpsc::channel();
        let worker = {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                map.set(Bytes::from("k"), Bytes::from("v"));
                tx.send(()).unwrap();
            })
        };

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        drop(guard);
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        worker.join().unwrap();
    }

    #[test]
    fn test_no_torn_values() {
        let map = Arc::new(ShardedMap::new(4));
        let a = Bytes::from(vec![b'a'; 4096]);
        let b = Bytes::from(vec![b'b'; 4096]);
        map.set(Bytes::from_static(KEY), a.clone());

        let writers: Vec<_> = [a, b]
            .into_iter()
            .map(|value| {
                let map = Arc::clone(&map);
                thread::spawn(move || {
                    for _ in 0..500 {
                        map.set(Bytes::from_static(KEY), value.clone());
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let map = Arc::clone(&map);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let value = map.get(KEY).unwrap();
                        assert_eq!(value.len(), 4096);
                        assert!(value.iter().all(|&byte| byte == value[0]));
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }
    }
}
