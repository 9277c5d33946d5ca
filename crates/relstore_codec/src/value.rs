//! Dynamic property value.

use crate::encoder::to_canonical_cbor;
use std::cmp::Ordering;
use std::fmt;

/// A dynamic property value.
///
/// `Undefined` stands for a property that is absent from an entity, while
/// `Null` is an explicit null. Floats are not representable so that every
/// value has exactly one canonical encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Value {
    /// Absent property.
    #[default]
    Undefined,
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Byte string.
    Bytes(Vec<u8>),
    /// UTF-8 text.
    Text(String),
    /// Ordered list of values.
    Array(Vec<Value>),
    /// Key-value pairs, kept sorted by [`Value::cmp_canonical`] when built
    /// through [`Value::map`].
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Create a map value with canonically sorted keys.
    pub fn map(mut pairs: Vec<(Value, Value)>) -> Self {
        pairs.sort_by(|a, b| a.0.cmp_canonical(&b.0));
        Value::Map(pairs)
    }

    /// Rebuilds this value with every map, at any depth, sorted into
    /// canonical key order.
    ///
    /// Values that differ only in map entry order become equal.
    pub fn into_canonical(self) -> Self {
        match self {
            Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::into_canonical).collect())
            }
            Value::Map(pairs) => Value::map(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.into_canonical(), v.into_canonical()))
                    .collect(),
            ),
            other => other,
        }
    }

    /// Create a text value.
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Compare two values by their canonical encodings.
    ///
    /// Shorter encodings sort first, equal lengths compare bytewise.
    pub fn cmp_canonical(&self, other: &Self) -> Ordering {
        match (to_canonical_cbor(self), to_canonical_cbor(other)) {
            (Ok(a), Ok(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(&b)),
            // Only values nested past the encoder limit fail; order them last.
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => Ordering::Equal,
        }
    }

    /// Short name of this value's type, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Bytes(_) => "bytes",
            Value::Text(_) => "text",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    /// Returns true for scalar values that can act as their own index key.
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Value::Array(_) | Value::Map(_))
    }

    /// Check if this value is undefined.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as bytes, if it is a byte string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get this value as a string slice, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as an array, if it is one.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get this value as a map, if it is one.
    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Look up a text key in this map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_text() == Some(key))
            .map(|(_, v)| v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Bytes(bytes) => {
                f.write_str("h'")?;
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                f.write_str("'")
            }
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(pairs) => {
                f.write_str("{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Text(s.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_keys_are_sorted() {
        let map = Value::map(vec![
            (Value::text("zz"), Value::Integer(1)),
            (Value::text("a"), Value::Integer(2)),
            (Value::text("m"), Value::Integer(3)),
        ]);

        let keys: Vec<_> = map
            .as_map()
            .unwrap()
            .iter()
            .map(|(k, _)| k.clone())
            .collect();
        assert_eq!(
            keys,
            vec![Value::text("a"), Value::text("m"), Value::text("zz")]
        );
    }

    #[test]
    fn structurally_equal_maps_compare_equal() {
        let a = Value::map(vec![
            (Value::text("x"), Value::Integer(1)),
            (Value::text("y"), Value::Integer(2)),
        ]);
        let b = Value::map(vec![
            (Value::text("y"), Value::Integer(2)),
            (Value::text("x"), Value::Integer(1)),
        ]);
        assert_eq!(a, b);
        assert_eq!(a.cmp_canonical(&b), Ordering::Equal);
    }

    #[test]
    fn into_canonical_sorts_nested_maps() {
        let unsorted = Value::Array(vec![Value::Map(vec![
            (Value::text("b"), Value::Map(vec![
                (Value::text("y"), Value::Integer(2)),
                (Value::text("x"), Value::Integer(1)),
            ])),
            (Value::text("a"), Value::Integer(0)),
        ])]);
        let sorted = Value::Array(vec![Value::Map(vec![
            (Value::text("a"), Value::Integer(0)),
            (Value::text("b"), Value::Map(vec![
                (Value::text("x"), Value::Integer(1)),
                (Value::text("y"), Value::Integer(2)),
            ])),
        ])]);
        assert_ne!(unsorted, sorted);
        assert_eq!(unsorted.into_canonical(), sorted);
        assert_eq!(Value::Integer(4).into_canonical(), Value::Integer(4));
    }

    #[test]
    fn canonical_integer_ordering() {
        let mut values = vec![
            Value::Integer(-1),
            Value::Integer(300),
            Value::Integer(1),
            Value::Integer(0),
        ];
        values.sort_by(Value::cmp_canonical);
        assert_eq!(
            values,
            vec![
                Value::Integer(0),
                Value::Integer(1),
                Value::Integer(-1),
                Value::Integer(300),
            ]
        );
    }

    #[test]
    fn undefined_is_distinct_from_null() {
        assert_ne!(Value::Undefined, Value::Null);
        assert!(Value::Undefined.is_undefined());
        assert!(!Value::Null.is_undefined());
        assert_eq!(Value::default(), Value::Undefined);
    }

    #[test]
    fn primitives() {
        assert!(Value::Integer(3).is_primitive());
        assert!(Value::Bytes(vec![1]).is_primitive());
        assert!(Value::Undefined.is_primitive());
        assert!(!Value::Array(vec![]).is_primitive());
        assert!(!Value::map(vec![]).is_primitive());
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Integer(-5).to_string(), "-5");
        assert_eq!(Value::text("x").to_string(), "\"x\"");
        assert_eq!(Value::Bytes(vec![0x0a, 0xff]).to_string(), "h'0aff'");
        assert_eq!(
            Value::Array(vec![Value::Null, Value::Undefined]).to_string(),
            "[null, undefined]"
        );
        assert_eq!(
            Value::map(vec![(Value::text("a"), Value::Bool(true))]).to_string(),
            "{\"a\": true}"
        );
    }

    #[test]
    fn map_get() {
        let map = Value::map(vec![
            (Value::text("name"), Value::text("Alice")),
            (Value::text("age"), Value::Integer(30)),
        ]);

        assert_eq!(map.get("name"), Some(&Value::text("Alice")));
        assert_eq!(map.get("age"), Some(&Value::Integer(30)));
        assert_eq!(map.get("missing"), None);
        assert_eq!(Value::Integer(1).get("name"), None);
    }

    #[test]
    fn from_impls() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42i32), Value::Integer(42));
        assert_eq!(Value::from("hello"), Value::text("hello"));
        assert_eq!(Value::from(vec![1u8, 2]), Value::Bytes(vec![1, 2]));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(7i64)), Value::Integer(7));
    }
}
