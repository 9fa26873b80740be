//! memrydb Wire Protocol
//!
//! This module implements the length-prefixed text protocol spoken by memrydb.
//!
//! ## Overview
//!
//! A client opens a connection, writes exactly one request and reads exactly
//! one response. Sizes are explicit, so keys and values are binary-safe.
//!
//! ## Modules
//!
//! - `types`: `Method`, `Request`, `Response` and the request encoder
//! - `parser`: the request decoder and its error kinds
//!
//! ## Example
//!
//! ```
//! use memrydb::protocol::{decode, encode, Method, Response};
//!
//! // What a client sends
//! let raw = encode(Method::Set, b"name", b"cedric");
//!
//! // What the server decodes
//! let request = decode(&raw).unwrap();
//! assert_eq!(request.method(), Method::Set);
//!
//! // What the server sends back
//! assert_eq!(&Response::Ok.serialize()[..], b"ok");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{decode, DecodeError, DecodeResult};
pub use types::{encode, Method, Request, Response, ACK, DELIMITER};
