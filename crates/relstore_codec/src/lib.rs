//! # RelStore Codec
//!
//! The dynamic [`Value`] type used for entity properties, together with its
//! canonical CBOR encoding and content hash.
//!
//! Canonical encoding guarantees that structurally equal values produce
//! identical bytes, which makes [`content_hash`] usable as a lookup key for
//! composite values:
//!
//! - Map entries are ordered by encoded key (length first, then bytewise)
//! - Integers use the shortest head
//! - No floats, no indefinite lengths
//!
//! ## Usage
//!
//! ```
//! use relstore_codec::{content_hash, to_canonical_cbor, Value};
//!
//! let a = Value::map(vec![(Value::text("x"), Value::Integer(1))]);
//! let b = a.clone();
//!
//! assert_eq!(to_canonical_cbor(&a).unwrap(), vec![0xa1, 0x61, b'x', 0x01]);
//! assert_eq!(content_hash(&a).unwrap(), content_hash(&b).unwrap());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod encoder;
mod error;
mod hash;
mod serde_impl;
mod value;

pub use encoder::{to_canonical_cbor, CanonicalEncoder, Sink, MAX_DEPTH};
pub use error::{CodecError, CodecResult};
pub use hash::{content_hash, ContentHash};
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Integer),
            "[a-z]{0,8}".prop_map(Value::Text),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::vec(("[a-z]{1,4}", inner), 0..4).prop_map(|pairs| {
                    Value::map(pairs.into_iter().map(|(k, v)| (Value::Text(k), v)).collect())
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn encoding_is_deterministic(value in arb_value()) {
            prop_assert_eq!(to_canonical_cbor(&value)?, to_canonical_cbor(&value.clone())?);
        }

        #[test]
        fn equal_values_share_a_hash(value in arb_value()) {
            let copy = value.clone();
            prop_assert_eq!(content_hash(&value)?, content_hash(&copy)?);
        }
    }
}
