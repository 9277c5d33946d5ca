//! Content hashing of values.

use crate::encoder::CanonicalEncoder;
use crate::error::CodecResult;
use crate::value::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 digest of a value's canonical encoding.
///
/// Structurally equal values always produce the same hash, regardless of
/// how or when they were built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Wrap raw digest bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0[..8] {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Hash a value by streaming its canonical encoding through SHA-256.
///
/// # Errors
///
/// Fails only when the value exceeds the encoder's nesting limit.
pub fn content_hash(value: &Value) -> CodecResult<ContentHash> {
    let mut encoder = CanonicalEncoder::new(Sha256::new());
    encoder.encode(value)?;
    Ok(ContentHash(encoder.into_inner().finalize().into()))
}
