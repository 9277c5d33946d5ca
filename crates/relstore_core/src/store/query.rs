//! Read-only queries and joins.

use super::Store;
use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::index::normalize_query;
use relstore_codec::Value;

impl Store {
    /// Finds an entity by primary key.
    pub fn find_one(&self, collection: &str, key: impl Into<Value>) -> Option<Entity> {
        let key = key.into().into_canonical();
        let state = self.state.read();
        state.collection(collection)?.entities.get(&key).cloned()
    }

    /// Returns every entity of a collection in insertion order.
    pub fn find_all(&self, collection: &str) -> Vec<Entity> {
        self.find_all_where(collection, |_| true)
    }

    /// Returns the entities of a collection that satisfy `predicate`.
    pub fn find_all_where<F>(&self, collection: &str, predicate: F) -> Vec<Entity>
    where
        F: Fn(&Entity) -> bool,
    {
        let state = self.state.read();
        state
            .collection(collection)
            .map(|c| {
                c.entities
                    .values()
                    .filter(|entity| predicate(entity))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns entities whose `properties` equal `values`.
    ///
    /// Uses the index over exactly these properties when one exists, in any
    /// declaration order; otherwise scans the collection and logs a warning.
    pub fn find_all_by<S: AsRef<str>>(
        &self,
        collection: &str,
        properties: &[S],
        values: &[Value],
    ) -> CoreResult<Vec<Entity>> {
        let (properties, values) = normalize_query(properties, values)?;
        let state = self.state.read();
        Ok(state
            .lookup(&self.stats, collection, &properties, &values)?
            .into_iter()
            .map(|(_, entity)| entity.clone())
            .collect())
    }

    /// Returns the single entity whose `properties` equal `values`.
    ///
    /// # Errors
    ///
    /// [`CoreError::NoResultsFound`] or [`CoreError::MultipleResultsFound`]
    /// unless exactly one entity matches.
    pub fn find_one_by<S: AsRef<str>>(
        &self,
        collection: &str,
        properties: &[S],
        values: &[Value],
    ) -> CoreResult<Entity> {
        let mut found = self.find_all_by(collection, properties, values)?;
        match found.len() {
            0 => Err(CoreError::NoResultsFound {
                collection: collection.to_string(),
            }),
            1 => Ok(found.remove(0)),
            count => Err(CoreError::MultipleResultsFound {
                collection: collection.to_string(),
                count,
            }),
        }
    }

    /// Returns the number of entities in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.state
            .read()
            .collection(collection)
            .map_or(0, |c| c.entities.len())
    }

    /// Pairs each `owner` entity with the `target` entities it links to.
    ///
    /// Owners are visited in insertion order and, for each relationship from
    /// `owner` to `target`, targets follow list order. Links whose target no
    /// longer exists are skipped.
    pub fn join(&self, owner: &str, target: &str) -> Vec<(Entity, Entity)> {
        let state = self.state.read();
        let (Some(owners), Some(targets)) = (state.collection(owner), state.collection(target))
        else {
            return Vec::new();
        };
        let relationships: Vec<_> = owners
            .relationships
            .values()
            .filter(|r| r.target == target)
            .collect();

        let mut pairs = Vec::new();
        for (key, entity) in &owners.entities {
            for relationship in &relationships {
                for target_key in relationship.targets(key) {
                    if let Some(linked) = targets.entities.get(target_key) {
                        pairs.push((entity.clone(), linked.clone()));
                    }
                }
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreOptions;
    use crate::relationship::RelationshipOptions;

    fn people() -> Store {
        let store = Store::with_options(StoreOptions::new().warn_on_scan(false));
        store.set_primary_key("Person", "id").unwrap();
        store
            .add_all(vec![
                Entity::new("Person").with("id", 1).with("first", "ada").with("last", "l"),
                Entity::new("Person").with("id", 2).with("first", "alan").with("last", "t"),
                Entity::new("Person").with("id", 3).with("first", "ada").with("last", "b"),
            ])
            .unwrap();
        store
    }

    #[test]
    fn find_all_preserves_insertion_order() {
        let store = people();
        let ids: Vec<_> = store
            .find_all("Person")
            .iter()
            .map(|p| p.integer("id").unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(store.find_all("Nobody").is_empty());
    }

    #[test]
    fn find_all_where_filters() {
        let store = people();
        let adas = store.find_all_where("Person", |p| p.get("first") == &Value::text("ada"));
        assert_eq!(adas.len(), 2);
    }

    #[test]
    fn indexed_and_scanned_lookups_agree() {
        let store = people();
        let scanned = store.find_all_by("Person", &["first"], &["ada".into()]).unwrap();
        assert_eq!(store.stats().scans, 1);

        store.create_index("Person", &["first"], false).unwrap();
        let indexed = store.find_all_by("Person", &["first"], &["ada".into()]).unwrap();
        assert_eq!(store.stats().index_lookups, 1);
        assert_eq!(scanned, indexed);
    }

    #[test]
    fn composite_lookup_ignores_property_order() {
        let store = people();
        store.create_index("Person", &["last", "first"], false).unwrap();

        let found = store
            .find_one_by("Person", &["first", "last"], &["ada".into(), "b".into()])
            .unwrap();
        assert_eq!(found.integer("id").unwrap(), 3);
        assert_eq!(store.stats().scans, 0);
    }

    #[test]
    fn find_one_by_cardinality() {
        let store = people();
        assert!(matches!(
            store.find_one_by("Person", &["first"], &["ada".into()]),
            Err(CoreError::MultipleResultsFound { count: 2, .. })
        ));
        assert!(matches!(
            store.find_one_by("Person", &["first"], &["grace".into()]),
            Err(CoreError::NoResultsFound { .. })
        ));
        assert_eq!(
            store
                .find_one_by("Person", &["first"], &["alan".into()])
                .unwrap()
                .integer("id")
                .unwrap(),
            2
        );
    }

    #[test]
    fn find_by_object_value() {
        let store = people();
        let address = Value::map(vec![
            (Value::text("city"), Value::text("x")),
            (Value::text("zip"), Value::Integer(1)),
        ]);
        store
            .add_one(Entity::new("Person").with("id", 4).with("address", address.clone()))
            .unwrap();
        store.create_index("Person", &["address"], false).unwrap();

        let found = store.find_all_by("Person", &["address"], &[address]).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn join_pairs_in_owner_then_list_order() {
        let store = Store::new();
        store.set_primary_key("Foo", "id").unwrap();
        store.set_primary_key("Bar", "id").unwrap();
        store
            .create_foreign_key("Foo", "Bar", "friends", RelationshipOptions::new())
            .unwrap();

        let first = Entity::new("Foo").with("id", "f1");
        let second = Entity::new("Foo").with("id", "f2");
        store.add_all(vec![first.clone(), second.clone()]).unwrap();
        store
            .relationship(&second, "friends")
            .unwrap()
            .push(Entity::new("Bar").with("id", "c"))
            .unwrap();
        store
            .relationship(&first, "friends")
            .unwrap()
            .extend(vec![
                Entity::new("Bar").with("id", "b"),
                Entity::new("Bar").with("id", "a"),
            ])
            .unwrap();

        let pairs: Vec<_> = store
            .join("Foo", "Bar")
            .into_iter()
            .map(|(o, t)| (o.text("id").unwrap().to_string(), t.text("id").unwrap().to_string()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("f1".to_string(), "b".to_string()),
                ("f1".to_string(), "a".to_string()),
                ("f2".to_string(), "c".to_string()),
            ]
        );

        store.remove_by_key("Bar", "b").unwrap();
        assert_eq!(store.join("Foo", "Bar").len(), 2);
        assert!(store.join("Bar", "Foo").is_empty());
    }
}
