//! Cross-module integration helpers.
//!
//! [`IntegrationHarness`] applies operations to a store and to a plain
//! shadow map side by side, then checks that queries agree with the shadow.

use crate::fixtures::quiet_options;
use crate::generators::StoreOp;
use relstore_codec::Value;
use relstore_core::{Entity, Store, TruncateOptions};
use std::collections::HashMap;

/// A store paired with the entities it is expected to hold.
pub struct IntegrationHarness {
    /// The store under test.
    pub store: Store,
    /// Expected `Foo` entities by primary key.
    expected: HashMap<Value, Entity>,
}

impl IntegrationHarness {
    /// Creates a harness over `Foo { id }` with indices on `tag` and
    /// `group, tag`.
    pub fn new() -> Self {
        let store = Store::with_options(quiet_options());
        store
            .register_entity("Foo")
            .primary_key("id")
            .index(&["tag"])
            .index(&["group", "tag"])
            .finish()
            .expect("Failed to register Foo");
        Self {
            store,
            expected: HashMap::new(),
        }
    }

    /// Applies an operation to both the store and the shadow.
    pub fn apply(&mut self, op: &StoreOp) {
        match *op {
            StoreOp::Put { id, tag, group } => {
                let entity = StoreOp::entity(id, tag, group);
                let key = self.store.add_one(entity.clone()).expect("Failed to add entity");
                self.expected.insert(key, entity);
            }
            StoreOp::Remove { id } => {
                let key = Value::from(u32::from(id));
                let removed = self
                    .store
                    .remove_by_key("Foo", key.clone())
                    .expect("Failed to remove entity");
                assert_eq!(
                    removed,
                    self.expected.remove(&key).is_some(),
                    "Removal result mismatch for {key}"
                );
            }
            StoreOp::Truncate => {
                let removed = self.store.truncate_collection("Foo", TruncateOptions::new());
                assert_eq!(removed, self.expected.len(), "Truncate count mismatch");
                self.expected.clear();
            }
        }
    }

    /// Checks the primary map, the indices and indexed lookups against the
    /// shadow.
    pub fn verify_all(&self) {
        assert_eq!(self.store.count("Foo"), self.expected.len(), "Count mismatch");
        for (key, entity) in &self.expected {
            assert_eq!(
                self.store.find_one("Foo", key.clone()).as_ref(),
                Some(entity),
                "Entity mismatch for {key}"
            );
        }
        self.store
            .verify_indexes()
            .expect("Index verification failed");

        for tag in 0u32..4 {
            let mut found: Vec<Value> = self
                .store
                .find_all_by("Foo", &["tag"], &[tag.into()])
                .expect("Lookup failed")
                .iter()
                .map(|e| e.get("id").clone())
                .collect();
            let mut wanted: Vec<Value> = self
                .expected
                .iter()
                .filter(|(_, e)| e.get("tag") == &Value::from(tag))
                .map(|(k, _)| k.clone())
                .collect();
            found.sort_by(Value::cmp_canonical);
            wanted.sort_by(Value::cmp_canonical);
            assert_eq!(found, wanted, "Indexed lookup mismatch for tag {tag}");
        }
    }

    /// Returns the number of tracked entities.
    pub fn tracked_count(&self) -> usize {
        self.expected.len()
    }
}

impl Default for IntegrationHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Relationship and cascade checks.
pub mod relationships {
    use super::*;

    /// Links `count` new `Bar` targets to `owner` through `friends`.
    pub fn link_friends(store: &Store, owner: &Entity, count: usize) -> Vec<Entity> {
        let friends: Vec<Entity> = (0..count)
            .map(|i| {
                Entity::new("Bar")
                    .with("id", format!("{}-{i}", owner.get("id")))
            })
            .collect();
        store
            .relationship(owner, "friends")
            .expect("Missing friends relationship")
            .extend(friends.clone())
            .expect("Failed to link friends");
        friends
    }

    /// Checks that every pair `join` returns is linked and still stored.
    pub fn check_join_consistency(store: &Store, owner: &str, target: &str) {
        for (o, t) in store.join(owner, target) {
            assert!(
                store.find_one(owner, o.get("id").clone()).is_some(),
                "Joined owner is not stored"
            );
            assert!(
                store.find_one(target, t.get("id").clone()).is_some(),
                "Joined target is not stored"
            );
        }
    }
}

/// Constraint checks.
pub mod constraints {
    use super::*;

    /// Adds `entity` expecting an integrity failure, and checks that the
    /// collection is unchanged afterwards.
    pub fn assert_rejected(store: &Store, entity: Entity) {
        let collection = entity.collection().to_string();
        let before = store.find_all(&collection);
        let err = store.add_one(entity).expect_err("Mutation should be rejected");
        assert!(err.is_integrity(), "Expected an integrity error, got {err}");
        assert_eq!(store.find_all(&collection), before, "Rejected mutation left changes");
        store.verify_indexes().expect("Index verification failed");
    }
}
