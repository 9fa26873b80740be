//! Length-Prefixed Request Decoder
//!
//! This module turns one raw request buffer into a [`Request`].
//!
//! ## Design Philosophy
//!
//! 1. **Untrusted Input**: Every declared size is checked against the bytes
//!    actually present before anything is sliced.
//! 2. **Length, Not Delimiters**: Once a key or value starts, it is read by its
//!    declared length and never re-scanned for spaces, so both may contain
//!    arbitrary bytes.
//! 3. **All Or Nothing**: The first violated rule ends decoding with one
//!    [`DecodeError`]; no partial request is ever returned.
//!
//! ## Decoding Steps
//!
//! ```text
//! SET 4 6 name cedric
//! ─┬─ ┬ ┬ ─┬── ──┬───
//!  │  │ │  │     └── remainder, must be exactly valueSize bytes
//!  │  │ │  └──────── keySize bytes, then one space (or the end)
//!  │  │ └─────────── valueSize (SET only, <= u32::MAX)
//!  │  └───────────── keySize (<= u16::MAX)
//!  └──────────────── command, up to the first space
//! ```
//!
//! For GET and DEL the remainder after `keySize` is the key itself.

use crate::protocol::types::{Method, Request, DELIMITER};
use bytes::Bytes;
use std::num::{IntErrorKind, ParseIntError};
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while decoding a request.
///
/// Each variant is a stable kind callers can match on; the message is what
/// the server sends back to the client.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The input buffer is empty
    #[error("empty request")]
    EmptyRequest,

    /// The command is not one of GET, SET, DEL
    #[error("invalid command: expected one of GET, SET, DEL")]
    InvalidCommand,

    /// The declared key size does not fit in 2 bytes
    #[error("key size should not exceed {} (2 bytes)", u16::MAX)]
    KeySizeLimitExceeded,

    /// The declared value size does not fit in 4 bytes
    #[error("value size should not exceed {} (4 bytes)", u32::MAX)]
    ValueSizeLimitExceeded,

    /// The key size field is not a decimal number
    #[error("key size is not a number")]
    KeySizeNotANumber,

    /// The value size field is not a decimal number
    #[error("value size is not a number")]
    ValueSizeNotANumber,

    /// The key does not have the declared size
    #[error("key does not match the declared key size")]
    InvalidKeySize,

    /// The value does not have the declared size
    #[error("value does not match the declared value size")]
    InvalidValueSize,

    /// A field delimiter is missing
    #[error("failed to parse request: missing field delimiter")]
    FailedToParseRequest,

    /// The declared value size runs past the end of the buffer
    #[error("declared value size is out of range of the request")]
    SliceOutOfRange,
}

/// Result type for decoding operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Which size field is being parsed; selects the error kinds to report.
#[derive(Debug, Clone, Copy)]
enum SizeField {
    Key,
    Value,
}

impl SizeField {
    fn limit_exceeded(self) -> DecodeError {
        match self {
            SizeField::Key => DecodeError::KeySizeLimitExceeded,
            SizeField::Value => DecodeError::ValueSizeLimitExceeded,
        }
    }

    fn not_a_number(self) -> DecodeError {
        match self {
            SizeField::Key => DecodeError::KeySizeNotANumber,
            SizeField::Value => DecodeError::ValueSizeNotANumber,
        }
    }

    /// Parses a size token into the field's width (`T`).
    ///
    /// Overflow is classified before anything else: a token that overflows
    /// `T` is reported as over the limit even if it would also fail later.
    fn parse<T>(self, token: &[u8]) -> DecodeResult<usize>
    where
        T: FromStr<Err = ParseIntError> + TryInto<usize>,
    {
        let text = std::str::from_utf8(token).map_err(|_| self.not_a_number())?;
        let size: T = text.parse().map_err(|e: ParseIntError| match e.kind() {
            IntErrorKind::PosOverflow => self.limit_exceeded(),
            _ => self.not_a_number(),
        })?;
        size.try_into().map_err(|_| self.limit_exceeded())
    }
}

/// Read position over the request buffer.
struct Cursor<'a> {
    rest: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { rest: buf }
    }

    /// Returns the bytes up to the next delimiter and skips past it.
    fn next_token(&mut self) -> DecodeResult<&'a [u8]> {
        let pos = self
            .rest
            .iter()
            .position(|&b| b == DELIMITER)
            .ok_or(DecodeError::FailedToParseRequest)?;

        let token = &self.rest[..pos];
        self.rest = &self.rest[pos + 1..];
        Ok(token)
    }

    /// Takes exactly `size` bytes, which must be followed by a delimiter or
    /// end the buffer.
    fn next_sized(&mut self, size: usize) -> DecodeResult<&'a [u8]> {
        if self.rest.len() < size {
            return Err(DecodeError::InvalidKeySize);
        }
        let (field, rest) = self.rest.split_at(size);
        self.rest = match rest.split_first() {
            None => rest,
            Some((&DELIMITER, rest)) => rest,
            Some(_) => return Err(DecodeError::InvalidKeySize),
        };
        Ok(field)
    }

    fn remainder(self) -> &'a [u8] {
        self.rest
    }
}

/// Decodes one request from `buf`.
///
/// # Example
///
/// ```
/// use memrydb::protocol::{decode, DecodeError, Method};
///
/// let request = decode(b"GET 4 name").unwrap();
/// assert_eq!(request.method(), Method::Get);
/// assert_eq!(&request.key()[..], b"name");
///
/// assert_eq!(decode(b"PUT 4 name"), Err(DecodeError::InvalidCommand));
/// ```
pub fn decode(buf: &[u8]) -> DecodeResult<Request> {
    if buf.is_empty() {
        return Err(DecodeError::EmptyRequest);
    }

    let mut cursor = Cursor::new(buf);

    let method = Method::from_bytes(cursor.next_token()?).ok_or(DecodeError::InvalidCommand)?;
    let key_size = SizeField::Key.parse::<u16>(cursor.next_token()?)?;

    if !method.has_value() {
        let key = cursor.remainder();
        if key.len() != key_size {
            return Err(DecodeError::InvalidKeySize);
        }
        return Ok(Request::new(method, Bytes::copy_from_slice(key), Bytes::new()));
    }

    let value_size = SizeField::Value.parse::<u32>(cursor.next_token()?)?;
    let key = cursor.next_sized(key_size)?;
    let value = cursor.remainder();

    if value.len() < value_size {
        return Err(DecodeError::SliceOutOfRange);
    }
    if value.len() != value_size {
        return Err(DecodeError::InvalidValueSize);
    }

    Ok(Request::new(
        method,
        Bytes::copy_from_slice(key),
        Bytes::copy_from_slice(value),
    ))
}
