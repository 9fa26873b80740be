//! Key Hashing
//!
//! Shard routing needs a hash that is stable across processes and builds,
//! which rules out `std::hash::DefaultHasher` (randomly seeded per process).
//! We use 32-bit FNV-1a: tiny, fast on short keys, and well known enough that
//! any client can compute the same routing.
//!
//! ```text
//! hash = 2166136261
//! for byte in key:
//!     hash = (hash ^ byte) * 16777619   (mod 2^32)
//! ```

/// FNV-1a 32-bit offset basis.
pub const FNV_OFFSET_BASIS: u32 = 2_166_136_261;

/// FNV-1a 32-bit prime.
pub const FNV_PRIME: u32 = 16_777_619;

/// Hashes `key` with 32-bit FNV-1a.
///
/// # Example
///
/// ```
/// use memrydb::hasher::hash32;
///
/// assert_eq!(hash32(b"a"), 0xe40c_292c);
/// assert_eq!(hash32(b"user:100"), hash32(b"user:100"));
/// ```
#[inline]
pub fn hash32(key: &[u8]) -> u32 {
    key.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}
