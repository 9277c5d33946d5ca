//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data
//! that maintains required invariants.

use proptest::prelude::*;
use relstore_codec::Value;
use relstore_core::Entity;

/// Strategy for generating valid collection names.
pub fn collection_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-zA-Z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for generating property names.
pub fn property_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,7}").expect("Invalid regex")
}

/// Strategy for generating primitive values, undefined excluded.
pub fn primitive_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        "[a-z]{0,8}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(Value::Bytes),
    ]
}

/// Strategy for generating nested values.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    primitive_value_strategy().prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{1,4}", inner), 0..4).prop_map(|pairs| {
                Value::map(
                    pairs
                        .into_iter()
                        .map(|(k, v)| (Value::Text(k), v))
                        .collect(),
                )
            }),
        ]
    })
}

/// Strategy for generating valid primary keys.
pub fn key_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::Integer),
        "[a-z0-9]{1,8}".prop_map(Value::Text),
    ]
}

/// Strategy for generating entities of `collection` keyed by `primary_key`.
pub fn entity_strategy(
    collection: &'static str,
    primary_key: &'static str,
) -> impl Strategy<Value = Entity> {
    (
        key_strategy(),
        prop::collection::vec((property_name_strategy(), value_strategy()), 0..4),
    )
        .prop_map(move |(key, properties)| {
            let mut entity = Entity::new(collection);
            for (name, value) in properties {
                entity.set(name, value);
            }
            entity.with(primary_key, key)
        })
}

/// A mutation on a `Foo { id, tag, group }` collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// Add or replace `Foo { id, tag, group }`.
    Put {
        /// Primary key.
        id: u8,
        /// Indexed property.
        tag: u8,
        /// Second indexed property.
        group: u8,
    },
    /// Remove `Foo` by key.
    Remove {
        /// Primary key.
        id: u8,
    },
    /// Truncate `Foo`.
    Truncate,
}

impl StoreOp {
    /// Builds the entity a put would store.
    pub fn entity(id: u8, tag: u8, group: u8) -> Entity {
        Entity::new("Foo")
            .with("id", u32::from(id))
            .with("tag", u32::from(tag))
            .with("group", u32::from(group))
    }
}

/// Strategy for generating operation sequences over a small key space, so
/// puts often replace and removes often hit.
pub fn store_ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<StoreOp>> {
    let op = prop_oneof![
        6 => (0u8..16, 0u8..4, 0u8..3).prop_map(|(id, tag, group)| StoreOp::Put { id, tag, group }),
        3 => (0u8..16).prop_map(|id| StoreOp::Remove { id }),
        1 => Just(StoreOp::Truncate),
    ];
    prop::collection::vec(op, 1..max_len.max(2))
}
