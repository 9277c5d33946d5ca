//! Mutations: add, remove, truncate and trigger dispatch.

use super::{Store, StoreState};
use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::index::normalize_query;
use crate::trigger::{Change, TriggerCallback, TriggerContext, TriggerEvent};
use crate::types::TruncateOptions;
use relstore_codec::Value;
use std::collections::HashSet;
use tracing::{debug, trace};

impl Store {
    /// Adds an entity, or replaces the one stored under the same primary key.
    ///
    /// Intercept triggers for the insert (or update) run first and may
    /// transform or reject the entity; the primary map and indices are
    /// only written once they all succeed. Returns the primary key.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvariantViolation`] if the collection has no primary
    ///   key or the entity's key is empty
    /// - any error raised by an intercept trigger, typically
    ///   [`CoreError::Integrity`]
    pub fn add_one(&self, entity: Entity) -> CoreResult<Value> {
        let mut state = self.state.write();
        self.add_locked(&mut state, entity)
    }

    /// Adds entities one at a time, stopping at the first failure.
    ///
    /// Entities added before the failure stay in the store.
    pub fn add_all<I>(&self, entities: I) -> CoreResult<Vec<Value>>
    where
        I: IntoIterator<Item = Entity>,
    {
        let mut state = self.state.write();
        entities
            .into_iter()
            .map(|entity| self.add_locked(&mut state, entity))
            .collect()
    }

    /// Removes an entity and cascades along its cascading relationships.
    ///
    /// Removing an entity that is not stored is a no-op returning false.
    pub fn remove_one(&self, entity: &Entity) -> CoreResult<bool> {
        let mut state = self.state.write();
        let Some(collection) = state.collection(entity.collection()) else {
            return Ok(false);
        };
        if collection.primary_key.is_none() {
            return Ok(false);
        }
        let key = collection.key_of(entity)?;
        self.remove_locked(&mut state, entity.collection(), &key)
    }

    /// Removes the entity stored under `key`.
    pub fn remove_by_key(&self, collection: &str, key: impl Into<Value>) -> CoreResult<bool> {
        let mut state = self.state.write();
        self.remove_locked(&mut state, collection, &key.into().into_canonical())
    }

    /// Removes entities one at a time, stopping at the first failure.
    /// Returns how many were removed.
    pub fn remove_all<'e, I>(&self, entities: I) -> CoreResult<usize>
    where
        I: IntoIterator<Item = &'e Entity>,
    {
        let mut removed = 0;
        for entity in entities {
            if self.remove_one(entity)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Removes the single entity whose `properties` equal `values`.
    ///
    /// # Errors
    ///
    /// [`CoreError::NoResultsFound`] or [`CoreError::MultipleResultsFound`]
    /// unless exactly one entity matches.
    pub fn remove_one_by<S: AsRef<str>>(
        &self,
        collection: &str,
        properties: &[S],
        values: &[Value],
    ) -> CoreResult<Entity> {
        let mut state = self.state.write();
        let (properties, values) = normalize_query(properties, values)?;
        let mut matches: Vec<(Value, Entity)> = state
            .lookup(&self.stats, collection, &properties, &values)?
            .into_iter()
            .map(|(key, entity)| (key.clone(), entity.clone()))
            .collect();
        let (key, entity) = match matches.len() {
            0 => {
                return Err(CoreError::NoResultsFound {
                    collection: collection.to_string(),
                })
            }
            1 => matches.remove(0),
            count => {
                return Err(CoreError::MultipleResultsFound {
                    collection: collection.to_string(),
                    count,
                })
            }
        };
        self.remove_locked(&mut state, collection, &key)?;
        Ok(entity)
    }

    /// Removes every entity whose `properties` equal `values`.
    pub fn remove_all_by<S: AsRef<str>>(
        &self,
        collection: &str,
        properties: &[S],
        values: &[Value],
    ) -> CoreResult<usize> {
        let mut state = self.state.write();
        let (properties, values) = normalize_query(properties, values)?;
        let keys: Vec<Value> = state
            .lookup(&self.stats, collection, &properties, &values)?
            .into_iter()
            .map(|(key, _)| key.clone())
            .collect();
        let mut removed = 0;
        for key in keys {
            // An earlier removal may already have cascaded to this one.
            if self.remove_locked(&mut state, collection, &key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Removes every entity of a collection at once.
    ///
    /// No triggers fire. Index definitions survive; their entries and the
    /// collection's link rows do not. With `cascade`, every collection
    /// reachable through a declared relationship is truncated as well,
    /// whatever that relationship's own cascade flag. Returns the number
    /// of entities removed across all truncated collections.
    pub fn truncate_collection(&self, collection: &str, options: TruncateOptions) -> usize {
        let mut state = self.state.write();
        let mut visited = HashSet::new();
        let mut pending = vec![collection.to_string()];
        let mut removed = 0;

        while let Some(name) = pending.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }
            let Some(coll) = state.collection_mut(&name) else {
                continue;
            };
            let count = coll.clear();
            removed += count;
            self.stats.record_truncation();
            debug!(collection = %name, removed = count, "truncated collection");
            if options.cascade {
                pending.extend(coll.relationships.values().map(|r| r.target.clone()));
            }
        }
        removed
    }

    pub(crate) fn add_locked(&self, state: &mut StoreState, entity: Entity) -> CoreResult<Value> {
        let change = self.write_locked(state, entity)?;
        self.finish_write(state, &change);
        Ok(change.key)
    }

    /// Runs the intercept pipeline and writes the entity to the primary map
    /// and indices. Stats and observers are left to [`Self::finish_write`],
    /// so a write can still be taken back with [`Self::undo_write`].
    pub(crate) fn write_locked(&self, state: &mut StoreState, entity: Entity) -> CoreResult<Change> {
        let name = entity.collection().to_string();
        let collection = state.ensure_collection(&name);
        let key = collection.key_of(&entity)?;
        let primary_key = collection.primary_key_property()?.to_string();
        let old_value = collection.entities.get(&key).cloned();
        let event = if old_value.is_some() {
            TriggerEvent::Update
        } else {
            TriggerEvent::Insert
        };

        let change = Change {
            event,
            collection: name.clone(),
            key: key.clone(),
            old_value,
            new_value: Some(entity),
        };
        let mut change = self.intercept(state, change)?;
        change.event = event;
        change.collection.clone_from(&name);
        change.key = key.clone();

        let stored = match &change.new_value {
            Some(stored)
                if stored.collection() == name
                    && stored.get(&primary_key).clone().into_canonical() == key =>
            {
                stored.clone()
            }
            Some(_) => {
                return Err(CoreError::invariant(format!(
                    "trigger changed the identity of {name} {key}"
                )))
            }
            None => {
                return Err(CoreError::invariant(format!(
                    "trigger dropped the value of {name} {key}"
                )))
            }
        };

        state.ensure_collection(&name).put(key, stored)?;
        Ok(change)
    }

    /// Records a write made by [`Self::write_locked`] and runs observers.
    pub(crate) fn finish_write(&self, state: &StoreState, change: &Change) {
        match change.event {
            TriggerEvent::Update => self.stats.record_update(),
            _ => self.stats.record_insert(),
        }
        trace!(collection = %change.collection, key = %change.key, event = %change.event, "stored entity");
        self.observe(state, change);
    }

    /// Reverts a write made by [`Self::write_locked`] that has not been
    /// finished: the previous entity is restored, or the key removed.
    pub(crate) fn undo_write(state: &mut StoreState, change: &Change) -> CoreResult<()> {
        let Some(collection) = state.collection_mut(&change.collection) else {
            return Ok(());
        };
        match &change.old_value {
            Some(previous) => {
                collection.put(change.key.clone(), previous.clone())?;
            }
            None => {
                collection.take(&change.key)?;
            }
        }
        trace!(collection = %change.collection, key = %change.key, "reverted write");
        Ok(())
    }

    /// Removes `key` from `collection`, then everything its cascading
    /// relationships reach.
    ///
    /// Cascades run after the owner's delete has been written, and keys
    /// that are already gone are skipped, so cycles terminate. A failure
    /// part-way through leaves earlier removals in place.
    pub(crate) fn remove_locked(
        &self,
        state: &mut StoreState,
        collection: &str,
        key: &Value,
    ) -> CoreResult<bool> {
        let mut removed_root = false;
        let mut pending = vec![(collection.to_string(), key.clone(), false)];

        while let Some((name, key, cascaded)) = pending.pop() {
            let Some(cascades) = self.remove_single(state, &name, &key)? else {
                continue;
            };
            if cascaded {
                self.stats.record_cascaded_delete();
                trace!(collection = %name, %key, "cascaded delete");
            } else {
                removed_root = true;
            }
            // Reversed so targets are removed in list order.
            for (target, keys) in cascades.into_iter().rev() {
                for target_key in keys.into_iter().rev() {
                    pending.push((target.clone(), target_key, true));
                }
            }
        }
        Ok(removed_root)
    }

    /// Deletes one entity without following cascades. Returns the cascade
    /// targets, or `None` if the key was not stored.
    fn remove_single(
        &self,
        state: &mut StoreState,
        collection: &str,
        key: &Value,
    ) -> CoreResult<Option<Vec<(String, Vec<Value>)>>> {
        let Some(existing) = state
            .collection(collection)
            .and_then(|c| c.entities.get(key))
            .cloned()
        else {
            return Ok(None);
        };

        let change = Change::delete(collection, key.clone(), existing);
        // Delete intercepts may veto but not rewrite.
        self.intercept(state, change.clone())?;

        let Some(coll) = state.collection_mut(collection) else {
            return Ok(None);
        };
        coll.take(key)?;
        let cascades = coll.detach_links(key);
        self.stats.record_delete();

        self.observe(state, &change);
        Ok(Some(cascades))
    }

    /// Runs matching intercept triggers as a pipeline.
    fn intercept(&self, state: &StoreState, mut change: Change) -> CoreResult<Change> {
        let context = TriggerContext::new(state, &self.stats);
        let event = change.event;
        let collection = change.collection.clone();
        for trigger in state.triggers.matching(&collection, event) {
            let TriggerCallback::Intercept(callback) = &trigger.callback else {
                continue;
            };
            self.stats.record_trigger_fired();
            trace!(trigger = %trigger.id, label = %trigger.label, %event, "intercept");
            change = callback(&context, change).map_err(|err| {
                if err.is_integrity() {
                    self.stats.record_constraint_violation();
                }
                debug!(trigger = %trigger.id, label = %trigger.label, error = %err, "mutation rejected");
                err
            })?;
        }
        Ok(change)
    }

    /// Runs matching observe triggers after a write.
    fn observe(&self, state: &StoreState, change: &Change) {
        let context = TriggerContext::new(state, &self.stats);
        for trigger in state.triggers.matching(&change.collection, change.event) {
            if let TriggerCallback::Observe(callback) = &trigger.callback {
                self.stats.record_trigger_fired();
                trace!(trigger = %trigger.id, label = %trigger.label, event = %change.event, "observe");
                callback(&context, change);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relationship::RelationshipOptions;

    fn store() -> Store {
        let store = Store::new();
        store.set_primary_key("Foo", "id").unwrap();
        store.set_primary_key("Bar", "id").unwrap();
        store
    }

    fn foo(id: &str) -> Entity {
        Entity::new("Foo").with("id", id)
    }

    #[test]
    fn add_then_find() {
        let store = store();
        let entity = foo("1").with("number", 5);
        assert_eq!(store.add_one(entity.clone()).unwrap(), Value::text("1"));
        assert_eq!(store.find_one("Foo", "1"), Some(entity));
        assert_eq!(store.stats().inserts, 1);
    }

    #[test]
    fn add_with_existing_key_is_an_update() {
        let store = store();
        store.add_one(foo("1").with("n", 1)).unwrap();
        store.add_one(foo("1").with("n", 2)).unwrap();

        assert_eq!(store.count("Foo"), 1);
        assert_eq!(store.find_one("Foo", "1").unwrap().get("n").as_integer(), Some(2));
        let stats = store.stats();
        assert_eq!((stats.inserts, stats.updates), (1, 1));
    }

    #[test]
    fn map_keys_match_regardless_of_entry_order() {
        let store = store();
        let ab = Value::Map(vec![
            (Value::text("a"), Value::Integer(1)),
            (Value::text("b"), Value::Integer(2)),
        ]);
        let ba = Value::Map(vec![
            (Value::text("b"), Value::Integer(2)),
            (Value::text("a"), Value::Integer(1)),
        ]);

        let first = store
            .add_one(Entity::new("Foo").with("id", ab.clone()).with("n", 1))
            .unwrap();
        let second = store
            .add_one(Entity::new("Foo").with("id", ba.clone()).with("n", 2))
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(store.count("Foo"), 1);
        let stats = store.stats();
        assert_eq!((stats.inserts, stats.updates), (1, 1));

        for key in [ab.clone(), ba.clone()] {
            let found = store.find_one("Foo", key.clone()).unwrap();
            assert_eq!(found.get("n"), &Value::Integer(2));
            let by = store.find_one_by("Foo", &["id"], &[key]).unwrap();
            assert_eq!(by.get("n"), &Value::Integer(2));
        }
        store.verify_indexes().unwrap();

        assert!(store.remove_by_key("Foo", ab).unwrap());
        assert_eq!(store.count("Foo"), 0);
        assert!(!store.remove_by_key("Foo", ba).unwrap());
    }

    #[test]
    fn missing_or_empty_primary_key_is_an_invariant_violation() {
        let store = store();
        for entity in [Entity::new("Foo"), foo(""), Entity::new("Foo").with("id", ())] {
            let err = store.add_one(entity).unwrap_err();
            assert!(matches!(err, CoreError::InvariantViolation { .. }));
        }
        let err = store.add_one(Entity::new("Undeclared").with("id", 1)).unwrap_err();
        assert!(matches!(err, CoreError::InvariantViolation { .. }));
        assert_eq!(store.count("Foo"), 0);
    }

    #[test]
    fn zero_is_a_valid_key() {
        let store = store();
        store.add_one(Entity::new("Foo").with("id", 0)).unwrap();
        assert!(store.find_one("Foo", 0).is_some());
    }

    #[test]
    fn remove_absent_is_noop() {
        let store = store();
        assert!(!store.remove_one(&foo("1")).unwrap());
        assert!(!store.remove_one(&Entity::new("Unknown").with("id", 1)).unwrap());
        assert!(!store.remove_by_key("Foo", "1").unwrap());
        assert_eq!(store.stats().deletes, 0);
    }

    #[test]
    fn bulk_add_stops_at_first_failure() {
        let store = store();
        let result = store.add_all(vec![foo("1"), foo(""), foo("3")]);
        assert!(result.is_err());
        assert_eq!(store.count("Foo"), 1);
    }

    #[test]
    fn remove_all_counts_removed() {
        let store = store();
        let entities = vec![foo("1"), foo("2")];
        store.add_all(entities.clone()).unwrap();
        assert_eq!(store.remove_all(&entities).unwrap(), 2);
        assert_eq!(store.remove_all(&entities).unwrap(), 0);
    }

    #[test]
    fn remove_by_properties() {
        let store = store();
        store
            .add_all(vec![
                foo("1").with("tag", "a"),
                foo("2").with("tag", "b"),
                foo("3").with("tag", "b"),
            ])
            .unwrap();

        let removed = store.remove_one_by("Foo", &["tag"], &["a".into()]).unwrap();
        assert_eq!(removed.get("id"), &Value::text("1"));

        let err = store.remove_one_by("Foo", &["tag"], &["b".into()]).unwrap_err();
        assert!(matches!(err, CoreError::MultipleResultsFound { count: 2, .. }));
        let err = store.remove_one_by("Foo", &["tag"], &["z".into()]).unwrap_err();
        assert!(matches!(err, CoreError::NoResultsFound { .. }));

        assert_eq!(store.remove_all_by("Foo", &["tag"], &["b".into()]).unwrap(), 2);
        assert_eq!(store.count("Foo"), 0);
    }

    #[test]
    fn cascade_follows_relationship_flag() {
        for cascade in [true, false] {
            let store = store();
            store
                .create_foreign_key(
                    "Foo",
                    "Bar",
                    "friends",
                    RelationshipOptions::new().cascade(cascade),
                )
                .unwrap();
            let owner = foo("1");
            store.add_one(owner.clone()).unwrap();
            store
                .relationship(&owner, "friends")
                .unwrap()
                .extend(vec![
                    Entity::new("Bar").with("id", "a"),
                    Entity::new("Bar").with("id", "b"),
                ])
                .unwrap();
            assert_eq!(store.count("Bar"), 2);

            store.remove_one(&owner).unwrap();
            assert_eq!(store.count("Bar"), if cascade { 0 } else { 2 });
            assert_eq!(store.stats().cascaded_deletes, if cascade { 2 } else { 0 });
        }
    }

    #[test]
    fn truncate_keeps_definitions_and_clears_links() {
        let store = store();
        store.create_index("Foo", &["tag"], false).unwrap();
        store
            .create_foreign_key("Foo", "Bar", "friends", RelationshipOptions::new())
            .unwrap();
        let owner = foo("1").with("tag", "x");
        store.add_one(owner.clone()).unwrap();
        store
            .relationship(&owner, "friends")
            .unwrap()
            .push(Entity::new("Bar").with("id", "a"))
            .unwrap();

        assert_eq!(store.truncate_collection("Foo", TruncateOptions::new()), 1);
        assert_eq!(store.count("Foo"), 0);
        assert_eq!(store.count("Bar"), 1);

        let descriptor = store.describe("Foo").unwrap();
        assert!(descriptor.index(&["tag"]).is_some());
        assert_eq!(descriptor.relationship("friends").unwrap().owners, 0);
        store.verify_indexes().unwrap();
    }

    #[test]
    fn truncate_cascade_ignores_relationship_flag() {
        let store = store();
        store
            .create_foreign_key("Foo", "Bar", "friends", RelationshipOptions::new())
            .unwrap();
        store.add_one(foo("1")).unwrap();
        store.add_one(Entity::new("Bar").with("id", "a")).unwrap();

        let removed = store.truncate_collection("Foo", TruncateOptions::new().cascade(true));
        assert_eq!(removed, 2);
        assert_eq!(store.count("Bar"), 0);
        assert_eq!(store.stats().truncations, 2);
    }

    #[test]
    fn truncate_cascade_terminates_on_cycles() {
        let store = store();
        store
            .create_foreign_key("Foo", "Foo", "children", RelationshipOptions::new())
            .unwrap();
        store
            .create_foreign_key("Foo", "Bar", "bars", RelationshipOptions::new())
            .unwrap();
        store
            .create_foreign_key("Bar", "Foo", "foos", RelationshipOptions::new())
            .unwrap();
        store.add_one(foo("1")).unwrap();

        store.truncate_collection("Foo", TruncateOptions::new().cascade(true));
        assert_eq!(store.stats().truncations, 2);
        assert_eq!(store.truncate_collection("Missing", TruncateOptions::new()), 0);
    }
}
