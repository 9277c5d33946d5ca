//! Canonical CBOR encoder.
//!
//! Output follows the deterministic encoding rules of RFC 8949 §4.2:
//! shortest-form heads, definite lengths only, map entries ordered by their
//! encoded keys (length first, then bytewise).

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use sha2::{Digest, Sha256};

/// Maximum nesting depth accepted by the encoder.
pub const MAX_DEPTH: usize = 128;

const MAJOR_UNSIGNED: u8 = 0;
const MAJOR_NEGATIVE: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;

const SIMPLE_FALSE: u8 = 0xf4;
const SIMPLE_TRUE: u8 = 0xf5;
const SIMPLE_NULL: u8 = 0xf6;
const SIMPLE_UNDEFINED: u8 = 0xf7;

/// Destination for encoded bytes.
pub trait Sink {
    /// Append bytes to the output.
    fn put(&mut self, bytes: &[u8]);
}

impl Sink for Vec<u8> {
    fn put(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

impl Sink for Sha256 {
    fn put(&mut self, bytes: &[u8]) {
        self.update(bytes);
    }
}

/// Encode a value to canonical CBOR bytes.
///
/// # Errors
///
/// Returns [`CodecError::NestingTooDeep`] if the value nests deeper than
/// [`MAX_DEPTH`].
pub fn to_canonical_cbor(value: &Value) -> CodecResult<Vec<u8>> {
    let mut encoder = CanonicalEncoder::new(Vec::new());
    encoder.encode(value)?;
    Ok(encoder.into_inner())
}

/// A canonical CBOR encoder writing into any [`Sink`].
pub struct CanonicalEncoder<S: Sink> {
    sink: S,
}

impl<S: Sink> CanonicalEncoder<S> {
    /// Create an encoder over the given sink.
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Encode one value.
    pub fn encode(&mut self, value: &Value) -> CodecResult<()> {
        self.encode_at(value, 0)
    }

    /// Consume the encoder and return its sink.
    pub fn into_inner(self) -> S {
        self.sink
    }

    fn encode_at(&mut self, value: &Value, depth: usize) -> CodecResult<()> {
        if depth > MAX_DEPTH {
            return Err(CodecError::NestingTooDeep { limit: MAX_DEPTH });
        }
        match value {
            Value::Undefined => self.sink.put(&[SIMPLE_UNDEFINED]),
            Value::Null => self.sink.put(&[SIMPLE_NULL]),
            Value::Bool(b) => self.sink.put(&[if *b { SIMPLE_TRUE } else { SIMPLE_FALSE }]),
            Value::Integer(n) => self.write_integer(*n),
            Value::Bytes(bytes) => {
                self.write_head(MAJOR_BYTES, bytes.len() as u64);
                self.sink.put(bytes);
            }
            Value::Text(text) => {
                self.write_head(MAJOR_TEXT, text.len() as u64);
                self.sink.put(text.as_bytes());
            }
            Value::Array(items) => {
                self.write_head(MAJOR_ARRAY, items.len() as u64);
                for item in items {
                    self.encode_at(item, depth + 1)?;
                }
            }
            Value::Map(pairs) => self.write_map(pairs, depth)?,
        }
        Ok(())
    }

    #[allow(clippy::cast_sign_loss)]
    fn write_integer(&mut self, n: i64) {
        if n >= 0 {
            self.write_head(MAJOR_UNSIGNED, n as u64);
        } else {
            // -1 - n is non-negative for every negative i64.
            self.write_head(MAJOR_NEGATIVE, (-1 - n) as u64);
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn write_head(&mut self, major: u8, arg: u64) {
        let mt = major << 5;
        if arg < 24 {
            self.sink.put(&[mt | arg as u8]);
        } else if arg <= u64::from(u8::MAX) {
            self.sink.put(&[mt | 24, arg as u8]);
        } else if arg <= u64::from(u16::MAX) {
            self.sink.put(&[mt | 25]);
            self.sink.put(&(arg as u16).to_be_bytes());
        } else if arg <= u64::from(u32::MAX) {
            self.sink.put(&[mt | 26]);
            self.sink.put(&(arg as u32).to_be_bytes());
        } else {
            self.sink.put(&[mt | 27]);
            self.sink.put(&arg.to_be_bytes());
        }
    }

    fn write_map(&mut self, pairs: &[(Value, Value)], depth: usize) -> CodecResult<()> {
        // Entry order depends on the encoded keys, so keys are encoded up front.
        let mut entries = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let mut key_encoder = CanonicalEncoder::new(Vec::new());
            key_encoder.encode_at(key, depth + 1)?;
            entries.push((key_encoder.into_inner(), value));
        }
        entries.sort_by(|a, b| a.0.len().cmp(&b.0.len()).then_with(|| a.0.cmp(&b.0)));

        self.write_head(MAJOR_MAP, entries.len() as u64);
        for (key, value) in entries {
            self.sink.put(&key);
            self.encode_at(value, depth + 1)?;
        }
        Ok(())
    }
}
