//! Request Dispatcher
//!
//! Maps a decoded [`Request`] onto the [`StorageEngine`] and turns the outcome
//! into a [`Response`].
//!
//! | Method | Engine call         | Response               |
//! |--------|---------------------|------------------------|
//! | GET    | `get(key)`          | value bytes, or empty  |
//! | SET    | `set(key, value)`   | `ok`                   |
//! | DEL    | `remove(key)`       | `ok`                   |
//!
//! Decoding failures become `Response::Error` carrying the error's message.

use crate::protocol::{decode, Method, Request, Response};
use crate::storage::{ShardedMap, StorageEngine};
use std::sync::Arc;
use tracing::{debug, trace};

/// Dispatches requests to a storage engine.
///
/// Cheap to clone: every connection task gets its own handle to the same
/// shared engine.
pub struct CommandHandler<E = ShardedMap> {
    storage: Arc<E>,
}

impl<E> Clone for CommandHandler<E> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<E: StorageEngine> CommandHandler<E> {
    /// Creates a new command handler over the given storage engine.
    pub fn new(storage: Arc<E>) -> Self {
        Self { storage }
    }

    /// The engine this handler dispatches to.
    pub fn storage(&self) -> &Arc<E> {
        &self.storage
    }

    /// Decodes a raw request buffer and executes it.
    pub fn handle(&self, raw: &[u8]) -> Response {
        match decode(raw) {
            Ok(request) => self.execute(request),
            Err(e) => {
                debug!(error = %e, bytes = raw.len(), "Rejected request");
                Response::error(e.to_string())
            }
        }
    }

    /// Executes a decoded request and returns the response.
    pub fn execute(&self, request: Request) -> Response {
        trace!(request = %request, "Executing request");

        let (method, key, value) = request.into_parts();
        match method {
            Method::Get => Response::Value(self.storage.get(&key)),
            Method::Set => {
                self.storage.set(key, value);
                Response::Ok
            }
            Method::Del => {
                self.storage.remove(&key);
                Response::Ok
            }
        }
    }
}
