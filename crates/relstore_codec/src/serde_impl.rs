//! Serde support for [`Value`].
//!
//! Deserialization rejects floating-point numbers and unsigned integers
//! beyond `i64::MAX`; objects become canonically sorted maps.

use crate::error::CodecError;
use crate::value::Value;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Undefined | Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(n) => serializer.serialize_i64(*n),
            Value::Bytes(bytes) => serializer.serialize_bytes(bytes),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(pairs) => {
                let mut map = serializer.serialize_map(Some(pairs.len()))?;
                for (k, v) in pairs {
                    match k {
                        Value::Text(_) | Value::Integer(_) => map.serialize_entry(k, v)?,
                        other => {
                            return Err(serde::ser::Error::custom(
                                CodecError::unsupported_key(other.type_name()),
                            ))
                        }
                    }
                }
                map.end()
            }
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a null, bool, integer, string, bytes, sequence or map")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Integer(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        i64::try_from(v)
            .map(Value::Integer)
            .map_err(|_| E::custom(CodecError::IntegerOverflow { value: v }))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Err(E::custom(CodecError::float_forbidden(v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::Text(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Value, E> {
        Ok(Value::Bytes(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Value, E> {
        Ok(Value::Bytes(v))
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(entry) = access.next_entry()? {
            pairs.push(entry);
        }
        Ok(Value::map(pairs))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_object_becomes_sorted_map() {
        let value: Value = serde_json::from_str(r#"{"b": 2, "a": [true, null, "x"]}"#).unwrap();
        assert_eq!(
            value,
            Value::map(vec![
                (
                    Value::text("a"),
                    Value::Array(vec![Value::Bool(true), Value::Null, Value::text("x")])
                ),
                (Value::text("b"), Value::Integer(2)),
            ])
        );
    }

    #[test]
    fn floats_are_rejected() {
        let err = serde_json::from_str::<Value>("1.5").unwrap_err();
        assert!(err.to_string().contains("float values are not supported"));
    }

    #[test]
    fn oversized_unsigned_is_rejected() {
        let err = serde_json::from_str::<Value>("18446744073709551615").unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn serializes_to_json() {
        let value = Value::map(vec![
            (Value::text("id"), Value::Integer(-3)),
            (Value::text("gone"), Value::Undefined),
            (Value::text("raw"), Value::Bytes(vec![1, 2])),
        ]);
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json, serde_json::json!({"id": -3, "gone": null, "raw": [1, 2]}));
    }

    #[test]
    fn non_text_map_keys_do_not_serialize() {
        let value = Value::Map(vec![(Value::Bool(true), Value::Null)]);
        assert!(serde_json::to_string(&value).is_err());
    }
}
