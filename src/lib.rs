//! # memrydb - An In-Memory, Sharded Key-Value Store
//!
//! memrydb keeps byte values in memory and serves them over a bare TCP
//! socket with a small, length-prefixed text protocol.
//!
//! ## Features
//!
//! - **Binary-Safe Protocol**: Keys and values are length-prefixed, not delimited
//! - **Precise Errors**: Every malformed request maps to one stable error kind
//! - **Sharded Storage**: Independent RwLock per shard, FNV-1a routing
//! - **Async I/O**: Built on Tokio, one task per connection
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              memrydb                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                            ▼                  ▼                         │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐    │
//! │  │  Request    │    │               ShardedMap                     │    │
//! │  │  Decoder    │    │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │    │
//! │  │             │    │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...N    │ │    │
//! │  └─────────────┘    │  │RwLock  │ │RwLock  │ │RwLock  │ │shards  │ │    │
//! │                     │  └────────┘ └────────┘ └────────┘ └────────┘ │    │
//! │                     └──────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use memrydb::{Config, Server};
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let server = Server::from_config(&config);
//!
//!     let listener = TcpListener::bind(config.server.bind_address()).await.unwrap();
//!     server.run(listener, std::future::pending()).await;
//! }
//! ```
//!
//! ## Protocol
//!
//! ```text
//! GET <keySize> <key>
//! DEL <keySize> <key>
//! SET <keySize> <valueSize> <key> <value>
//! ```
//!
//! GET answers with the raw value (nothing if absent), SET and DEL with `ok`,
//! and any malformed request with the error's message.
//!
//! ## Module Overview
//!
//! - [`hasher`]: FNV-1a key hashing used for shard routing
//! - [`storage`]: The storage engine trait and the sharded map
//! - [`protocol`]: Request decoder, request/response types
//! - [`commands`]: Dispatch from requests to the storage engine
//! - [`connection`]: Per-client connection handling
//! - [`server`]: Accept loop and connection limit
//! - [`config`], [`cli`]: Startup configuration

pub mod cli;
pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod hasher;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use config::Config;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{decode, DecodeError, Method, Request, Response};
pub use server::Server;
pub use storage::{ShardedMap, StorageEngine};

/// The default port memrydb listens on
pub const DEFAULT_PORT: u16 = 8000;

/// The default host memrydb binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of memrydb
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
