//! Index keys and property-set canonicalization.

use crate::error::{CoreError, CoreResult};
use relstore_codec::{content_hash, CodecResult, ContentHash, Value};

/// Key of one index bucket.
///
/// Primitive values are their own key. Arrays, maps and every composite
/// projection are reduced to the content hash of their canonical encoding,
/// so structurally equal values land in the same bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    /// A primitive value used directly.
    Value(Value),
    /// Content hash of a composite value.
    Hash(ContentHash),
}

impl IndexKey {
    /// Computes the key of a single value.
    pub fn of(value: &Value) -> CodecResult<Self> {
        if value.is_primitive() {
            Ok(Self::Value(value.clone()))
        } else {
            Ok(Self::Hash(content_hash(value)?))
        }
    }

    /// Computes the key of a projection taken in canonical property order.
    pub fn of_projection(mut values: Vec<Value>) -> CodecResult<Self> {
        if values.len() == 1 {
            let value = values.remove(0);
            if value.is_primitive() {
                return Ok(Self::Value(value));
            }
            return Ok(Self::Hash(content_hash(&value)?));
        }
        Ok(Self::Hash(content_hash(&Value::Array(values))?))
    }
}

/// Sorts a property list into canonical order.
///
/// Fails on an empty list or a repeated property.
pub fn canonical_properties<S: AsRef<str>>(properties: &[S]) -> CoreResult<Vec<String>> {
    if properties.is_empty() {
        return Err(CoreError::invalid_operation("property list is empty"));
    }
    let mut sorted: Vec<String> = properties.iter().map(|p| p.as_ref().to_string()).collect();
    sorted.sort();
    if let Some(pair) = sorted.windows(2).find(|w| w[0] == w[1]) {
        return Err(CoreError::invalid_operation(format!(
            "property {} listed twice",
            pair[0]
        )));
    }
    Ok(sorted)
}

/// Returns the canonical name of a property set.
pub fn canonical_name<S: AsRef<str>>(properties: &[S]) -> String {
    let mut names: Vec<&str> = properties.iter().map(AsRef::as_ref).collect();
    names.sort_unstable();
    names.join(",")
}

/// Pairs query properties with their values and sorts both into canonical
/// property order.
pub fn normalize_query<S: AsRef<str>>(
    properties: &[S],
    values: &[Value],
) -> CoreResult<(Vec<String>, Vec<Value>)> {
    if properties.len() != values.len() {
        return Err(CoreError::invalid_operation(format!(
            "{} properties but {} values",
            properties.len(),
            values.len()
        )));
    }
    canonical_properties(properties)?;
    let mut pairs: Vec<(String, Value)> = properties
        .iter()
        .map(|p| p.as_ref().to_string())
        .zip(values.iter().cloned())
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(pairs.into_iter().unzip())
}
