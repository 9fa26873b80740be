//! Storage Engine Module
//!
//! This module provides the storage layer for memrydb: the
//! [`StorageEngine`] capability and its sharded, thread-safe implementation.
//!
//! ## Architecture
//!
//! ```text
//!                 key
//!                  │
//!                  ▼
//!          fnv1a(key) % n
//!                  │
//! ┌────────────────┼────────────────────────────────────────────┐
//! │                ▼         ShardedMap                         │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐            │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...n     │            │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │            │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use memrydb::storage::{ShardedMap, StorageEngine};
//! use bytes::Bytes;
//! use std::sync::Arc;
//!
//! let engine = Arc::new(ShardedMap::new(0)); // 0 = default shard count
//! assert_eq!(engine.shard_count(), 32);
//!
//! engine.set(Bytes::from("name"), Bytes::from("cedric"));
//! assert_eq!(engine.get(b"name"), Some(Bytes::from("cedric")));
//! ```

pub mod engine;
pub mod sharded;

// Re-export commonly used types
pub use engine::StorageEngine;
pub use sharded::{ShardedMap, StorageStats, DEFAULT_SHARD_COUNT};
