//! Store fixtures and scenario builders.

use relstore_core::{Entity, RelationshipOptions, Store, StoreOptions};

/// Parses a JSON object into an entity of `collection`.
///
/// # Panics
///
/// If the JSON is malformed, holds floats, or is not an object.
pub fn entity(collection: &str, json: &str) -> Entity {
    let value = serde_json::from_str(json).expect("Invalid entity JSON");
    Entity::from_value(collection, value).expect("Entity JSON must be an object")
}

/// Options for test stores: scan warnings off to keep output quiet.
pub fn quiet_options() -> StoreOptions {
    StoreOptions::new().warn_on_scan(false)
}

/// Runs a test with a fresh store.
pub fn with_store<F, R>(f: F) -> R
where
    F: FnOnce(&Store) -> R,
{
    let store = Store::with_options(quiet_options());
    f(&store)
}

/// Ready-made stores.
pub mod scenarios {
    use super::*;

    /// `Bar { id }` and `Foo { id }` with a `Foo.friends -> Bar` relationship.
    pub fn foo_bar(options: RelationshipOptions) -> Store {
        let store = Store::with_options(quiet_options());
        store
            .register_entity("Bar")
            .primary_key("id")
            .finish()
            .expect("Failed to register Bar");
        store
            .register_entity("Foo")
            .primary_key("id")
            .relationship("friends", "Bar", options)
            .finish()
            .expect("Failed to register Foo");
        store
    }

    /// A `Foo` collection holding `count` entities with `id` `0..count`
    /// and `number` equal to the id.
    pub fn populated(count: i64) -> Store {
        let store = Store::with_options(quiet_options());
        store
            .set_primary_key("Foo", "id")
            .expect("Failed to declare primary key");
        store
            .add_all((0..count).map(|i| Entity::new("Foo").with("id", i).with("number", i)))
            .expect("Failed to populate");
        store
    }

    /// A `Node` tree linked through a cascading `children` relationship.
    ///
    /// Returns the store and the number of nodes. The root has id 0.
    pub fn tree(depth: usize, fanout: usize) -> (Store, usize) {
        let store = Store::with_options(quiet_options());
        store
            .register_entity("Node")
            .primary_key("id")
            .relationship("children", "Node", RelationshipOptions::new().cascade(true))
            .finish()
            .expect("Failed to register Node");

        let mut next_id: i64 = 0;
        let root = Entity::new("Node").with("id", next_id);
        store.add_one(root.clone()).expect("Failed to add root");
        let mut level = vec![root];
        let mut total = 1;
        for _ in 0..depth {
            let mut next_level = Vec::with_capacity(level.len() * fanout);
            for parent in &level {
                let children: Vec<Entity> = (0..fanout)
                    .map(|_| {
                        next_id += 1;
                        Entity::new("Node").with("id", next_id)
                    })
                    .collect();
                store
                    .relationship(parent, "children")
                    .expect("Missing children relationship")
                    .extend(children.clone())
                    .expect("Failed to link children");
                total += children.len();
                next_level.extend(children);
            }
            level = next_level;
        }
        (store, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relstore_core::Value;

    #[test]
    fn entity_from_json() {
        let foo = entity("Foo", r#"{"id": "1", "tags": ["a"], "nested": {"n": 1}}"#);
        assert_eq!(foo.collection(), "Foo");
        assert_eq!(foo.get("tags"), &Value::Array(vec![Value::text("a")]));
        assert_eq!(foo.get("nested").get("n"), Some(&Value::Integer(1)));
    }

    #[test]
    fn populated_scenario() {
        let store = scenarios::populated(10);
        assert_eq!(store.count("Foo"), 10);
    }

    #[test]
    fn tree_scenario() {
        let (store, total) = scenarios::tree(2, 3);
        assert_eq!(total, 13);
        assert_eq!(store.count("Node"), 13);
    }
}
