//! Command Handler Module
//!
//! This module implements the dispatch layer for memrydb. It receives
//! decoded requests, executes them against the storage engine, and returns
//! the response to write back.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │ Request Decoder │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ StorageEngine   │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `GET key` - Get a key's value
//! - `SET key value` - Set a key
//! - `DEL key` - Delete a key

pub mod handler;

// Re-export the main command handler
pub use handler::CommandHandler;
