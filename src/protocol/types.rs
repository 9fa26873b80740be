//! memrydb Protocol Data Types
//!
//! This module defines the requests and responses exchanged over the wire.
//!
//! ## Request Format
//!
//! Requests are ASCII, space-delimited and length-prefixed. There is no
//! terminator: one connection carries exactly one request.
//!
//! ```text
//! GET <keySize> <key>
//! DEL <keySize> <key>
//! SET <keySize> <valueSize> <key> <value>
//! ```
//!
//! `<key>` and `<value>` are raw bytes of the declared length and may contain
//! spaces.
//!
//! ## Response Format
//!
//! Responses carry no framing at all:
//! - GET: the raw value bytes, or nothing if the key is absent
//! - SET / DEL: `ok`
//! - any failure: the error message text

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// The byte separating fields of a request.
pub const DELIMITER: u8 = b' ';

/// Acknowledgement sent for a successful SET or DEL.
pub const ACK: &[u8] = b"ok";

/// A request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Set,
    Del,
}

impl Method {
    /// Matches a command token exactly (commands are case-sensitive).
    pub fn from_bytes(token: &[u8]) -> Option<Self> {
        match token {
            b"GET" => Some(Method::Get),
            b"SET" => Some(Method::Set),
            b"DEL" => Some(Method::Del),
            _ => None,
        }
    }

    /// The wire name of this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Set => "SET",
            Method::Del => "DEL",
        }
    }

    /// Returns true if the request carries a value (only SET does).
    pub fn has_value(&self) -> bool {
        matches!(self, Method::Set)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded client request.
///
/// Requests are only built by the decoder and are immutable afterwards.
/// `value` is empty for GET and DEL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    key: Bytes,
    value: Bytes,
}

impl Request {
    pub(crate) fn new(method: Method, key: Bytes, value: Bytes) -> Self {
        Self { method, key, value }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// Consumes the request, returning its parts.
    pub fn into_parts(self) -> (Method, Bytes, Bytes) {
        (self.method, self.key, self.value)
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, String::from_utf8_lossy(&self.key))?;
        if self.method.has_value() {
            write!(f, " ({} bytes)", self.value.len())?;
        }
        Ok(())
    }
}

/// Encodes a request in wire format.
///
/// `value` is ignored for GET and DEL. This is what a client sends; the
/// server side only ever decodes.
///
/// # Example
/// ```
/// use memrydb::protocol::{encode, Method};
///
/// assert_eq!(&encode(Method::Get, b"name", b"")[..], b"GET 4 name");
/// assert_eq!(&encode(Method::Set, b"name", b"cedric")[..], b"SET 4 6 name cedric");
/// ```
pub fn encode(method: Method, key: &[u8], value: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(32 + key.len() + value.len());
    buf.put_slice(method.as_str().as_bytes());
    buf.put_u8(DELIMITER);
    buf.put_slice(key.len().to_string().as_bytes());
    buf.put_u8(DELIMITER);

    if method.has_value() {
        buf.put_slice(value.len().to_string().as_bytes());
        buf.put_u8(DELIMITER);
        buf.put_slice(key);
        buf.put_u8(DELIMITER);
        buf.put_slice(value);
    } else {
        buf.put_slice(key);
    }

    buf.freeze()
}

/// A response to send back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Result of a GET; `None` if the key is absent
    Value(Option<Bytes>),

    /// Acknowledgement of a SET or DEL
    Ok,

    /// Human-readable failure description
    Error(String),
}

impl Response {
    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error(message.into())
    }

    /// Returns true if this response reports a failure.
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }

    /// Serializes the response to its wire representation.
    pub fn serialize(&self) -> Bytes {
        match self {
            Response::Value(Some(value)) => value.clone(),
            Response::Value(None) => Bytes::new(),
            Response::Ok => Bytes::from_static(ACK),
            Response::Error(message) => Bytes::copy_from_slice(message.as_bytes()),
        }
    }
}
