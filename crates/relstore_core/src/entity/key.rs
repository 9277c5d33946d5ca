//! Primary key validation.

use relstore_codec::Value;

/// Returns true if `value` can identify an entity.
///
/// Undefined, null, empty text and empty byte strings are rejected.
/// Zero and `false` are valid keys.
pub fn is_valid_key(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => false,
        Value::Text(s) => !s.is_empty(),
        Value::Bytes(b) => !b.is_empty(),
        _ => true,
    }
}
