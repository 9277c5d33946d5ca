//! Entities: named property records belonging to one collection.

mod key;

pub use key::is_valid_key;

use crate::error::{CoreError, CoreResult};
use relstore_codec::Value;
use serde::Serialize;
use std::collections::BTreeMap;

static UNDEFINED: Value = Value::Undefined;

/// A record in a collection.
///
/// Entities are plain values: the store hands out clones, and changing a
/// stored entity means adding a modified copy under the same primary key.
///
/// ```
/// use relstore_core::Entity;
///
/// let foo = Entity::new("Foo").with("id", "1").with("number", 5);
/// assert_eq!(foo.get("number").as_integer(), Some(5));
/// assert!(foo.get("missing").is_undefined());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    collection: String,
    properties: BTreeMap<String, Value>,
}

impl Entity {
    /// Creates an empty entity for the given collection.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Builds an entity from a map value with text keys.
    pub fn from_value(collection: impl Into<String>, value: Value) -> CoreResult<Self> {
        let Value::Map(pairs) = value else {
            return Err(CoreError::invalid_format(format!(
                "expected a map, found {}",
                value.type_name()
            )));
        };
        let mut entity = Self::new(collection);
        for (key, value) in pairs {
            match key {
                Value::Text(name) => {
                    entity.set(name, value);
                }
                other => {
                    return Err(CoreError::invalid_format(format!(
                        "property names must be text, found {}",
                        other.type_name()
                    )))
                }
            }
        }
        Ok(entity)
    }

    /// Sets a property, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Sets a property and returns its previous value.
    ///
    /// Setting [`Value::Undefined`] removes the property.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        match value.into() {
            Value::Undefined => self.properties.remove(&name),
            value => self.properties.insert(name, value),
        }
    }

    /// Removes a property.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.properties.remove(name)
    }

    /// Returns a property value, or [`Value::Undefined`] if it is absent.
    pub fn get(&self, name: &str) -> &Value {
        self.properties.get(name).unwrap_or(&UNDEFINED)
    }

    /// Returns the collection this entity belongs to.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Iterates over properties in name order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Projects the named properties, in the order given.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Vec<Value> {
        names.iter().map(|n| self.get(n.as_ref()).clone()).collect()
    }

    /// Returns the properties as a map value.
    pub fn to_value(&self) -> Value {
        Value::map(
            self.properties
                .iter()
                .map(|(k, v)| (Value::Text(k.clone()), v.clone()))
                .collect(),
        )
    }

    /// Returns a text property or an invalid format error.
    pub fn text(&self, name: &str) -> CoreResult<&str> {
        self.get(name)
            .as_text()
            .ok_or_else(|| self.wrong_type(name, "text"))
    }

    /// Returns an integer property or an invalid format error.
    pub fn integer(&self, name: &str) -> CoreResult<i64> {
        self.get(name)
            .as_integer()
            .ok_or_else(|| self.wrong_type(name, "integer"))
    }

    /// Returns a boolean property or an invalid format error.
    pub fn boolean(&self, name: &str) -> CoreResult<bool> {
        self.get(name)
            .as_bool()
            .ok_or_else(|| self.wrong_type(name, "bool"))
    }

    fn wrong_type(&self, name: &str, expected: &str) -> CoreError {
        CoreError::invalid_format(format!(
            "{}.{name}: expected {expected}, found {}",
            self.collection,
            self.get(name).type_name()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_accessors() {
        let entity = Entity::new("Foo").with("id", "1").with("n", 3);
        assert_eq!(entity.collection(), "Foo");
        assert_eq!(entity.text("id").unwrap(), "1");
        assert_eq!(entity.integer("n").unwrap(), 3);
        assert!(entity.get("other").is_undefined());
    }

    #[test]
    fn setting_undefined_removes_property() {
        let mut entity = Entity::new("Foo").with("a", 1);
        assert_eq!(entity.set("a", Value::Undefined), Some(Value::Integer(1)));
        assert_eq!(entity.properties().count(), 0);
    }

    #[test]
    fn projection_keeps_requested_order() {
        let entity = Entity::new("Foo").with("a", 1).with("b", 2);
        assert_eq!(
            entity.project(&["b", "a", "c"]),
            vec![Value::Integer(2), Value::Integer(1), Value::Undefined]
        );
    }

    #[test]
    fn value_conversion() {
        let entity = Entity::new("Foo").with("id", "1").with("flag", true);
        let value = entity.to_value();
        assert_eq!(value.get("flag"), Some(&Value::Bool(true)));

        let back = Entity::from_value("Foo", value).unwrap();
        assert_eq!(back, entity);
    }

    #[test]
    fn from_value_rejects_non_maps() {
        let err = Entity::from_value("Foo", Value::Integer(1)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidFormat { .. }));

        let bad_key = Value::Map(vec![(Value::Integer(1), Value::Null)]);
        assert!(Entity::from_value("Foo", bad_key).is_err());
    }

    #[test]
    fn typed_accessor_errors_name_the_property() {
        let entity = Entity::new("Foo").with("n", "x");
        let err = entity.integer("n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid format: Foo.n: expected integer, found text"
        );
    }
}
