//! Per-collection storage: primary map, indices and relationship tables.

mod descriptor;
mod model;
mod typed;

pub use descriptor::{CollectionDescriptor, IndexDescriptor};
pub use model::Model;
pub use typed::TypedCollection;

use crate::entity::{is_valid_key, Entity};
use crate::error::{CoreError, CoreResult};
use crate::index::{canonical_name, HashIndex, IndexKey};
use crate::relationship::Relationship;
use crate::stats::StoreStats;
use indexmap::IndexMap;
use relstore_codec::{CodecResult, Value};
use tracing::warn;

/// Storage for one entity type.
#[derive(Debug)]
pub(crate) struct CollectionState {
    pub(crate) name: String,
    pub(crate) primary_key: Option<String>,
    /// Primary key to entity, in insertion order.
    pub(crate) entities: IndexMap<Value, Entity>,
    /// Indices by canonical name.
    pub(crate) indexes: IndexMap<String, HashIndex>,
    /// Relationships by owning property.
    pub(crate) relationships: IndexMap<String, Relationship>,
}

impl CollectionState {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: None,
            entities: IndexMap::new(),
            indexes: IndexMap::new(),
            relationships: IndexMap::new(),
        }
    }

    /// Returns the declared primary-key property.
    pub(crate) fn primary_key_property(&self) -> CoreResult<&str> {
        self.primary_key.as_deref().ok_or_else(|| {
            CoreError::invariant(format!("collection {} has no primary key", self.name))
        })
    }

    /// Extracts and validates an entity's primary key.
    ///
    /// Composite keys come back in canonical form, so maps that differ only
    /// in entry order name the same entity.
    pub(crate) fn key_of(&self, entity: &Entity) -> CoreResult<Value> {
        let property = self.primary_key_property()?;
        let key = entity.get(property);
        if !is_valid_key(key) {
            return Err(CoreError::invariant(format!(
                "{}.{property} must be set to a non-empty value, found {key}",
                self.name
            )));
        }
        Ok(key.clone().into_canonical())
    }

    /// Finds entities whose `properties` equal `values`.
    ///
    /// Both slices must already be in canonical property order. Uses the
    /// matching index when one exists and scans otherwise.
    pub(crate) fn lookup(
        &self,
        properties: &[String],
        values: &[Value],
        warn_on_scan: bool,
        stats: &StoreStats,
    ) -> CoreResult<Vec<(&Value, &Entity)>> {
        let name = canonical_name(properties);
        if let Some(index) = self.indexes.get(&name) {
            stats.record_index_lookup();
            let key = IndexKey::of_projection(values.to_vec())?;
            return Ok(index
                .lookup(&key)
                .filter_map(|pk| self.entities.get_key_value(pk))
                .collect());
        }

        stats.record_scan();
        if warn_on_scan {
            warn!(
                collection = %self.name,
                properties = %name,
                "no index for lookup, scanning collection"
            );
        }
        Ok(self
            .entities
            .iter()
            .filter(|(_, entity)| {
                properties
                    .iter()
                    .zip(values)
                    .all(|(p, v)| same_value(entity.get(p), v))
            })
            .collect())
    }

    /// Creates an index and back-fills it. Returns false if it already existed.
    pub(crate) fn create_index(&mut self, properties: Vec<String>, primary: bool) -> CoreResult<bool> {
        let name = canonical_name(&properties);
        if let Some(existing) = self.indexes.get_mut(&name) {
            if primary {
                existing.set_primary_key(true);
            }
            return Ok(false);
        }
        let mut index = HashIndex::new(properties, primary);
        index.rebuild(self.entities.iter())?;
        self.indexes.insert(name, index);
        Ok(true)
    }

    /// Stores an entity under `key`, keeping every index in step.
    ///
    /// Index keys are computed before anything is written, so an encoding
    /// failure leaves the collection untouched.
    pub(crate) fn put(&mut self, key: Value, entity: Entity) -> CoreResult<Option<Entity>> {
        let previous = self.entities.get(&key);
        let mut plan = Vec::with_capacity(self.indexes.len());
        for index in self.indexes.values() {
            let old_key = previous.map(|e| index.key_for(e)).transpose()?;
            plan.push((old_key, index.key_for(&entity)?));
        }

        for (index, (old_key, new_key)) in self.indexes.values_mut().zip(plan) {
            if let Some(old_key) = old_key {
                if old_key != new_key {
                    index.remove(&old_key, &key);
                }
            }
            index.insert(new_key, key.clone());
        }
        Ok(self.entities.insert(key, entity))
    }

    /// Removes the entity under `key` from the primary map and every index.
    pub(crate) fn take(&mut self, key: &Value) -> CoreResult<Option<Entity>> {
        let Some(entity) = self.entities.get(key) else {
            return Ok(None);
        };
        let keys = self
            .indexes
            .values()
            .map(|index| index.key_for(entity))
            .collect::<CodecResult<Vec<_>>>()?;
        for (index, index_key) in self.indexes.values_mut().zip(keys) {
            index.remove(&index_key, key);
        }
        Ok(self.entities.shift_remove(key))
    }

    /// Drops the owner's link rows and returns the targets of cascading
    /// relationships.
    pub(crate) fn detach_links(&mut self, key: &Value) -> Vec<(String, Vec<Value>)> {
        let mut cascades = Vec::new();
        for relationship in self.relationships.values_mut() {
            if let Some(targets) = relationship.links.shift_remove(key) {
                if relationship.options.cascade && !targets.is_empty() {
                    cascades.push((relationship.target.clone(), targets));
                }
            }
        }
        cascades
    }

    /// Clears entities, index buckets and link rows. Definitions are kept.
    pub(crate) fn clear(&mut self) -> usize {
        let removed = self.entities.len();
        self.entities.clear();
        for index in self.indexes.values_mut() {
            index.clear();
        }
        for relationship in self.relationships.values_mut() {
            relationship.links.clear();
        }
        removed
    }

    /// Checks that every entity is filed exactly once in every index.
    pub(crate) fn verify_indexes(&self) -> CoreResult<()> {
        for index in self.indexes.values() {
            if index.len() != self.entities.len() {
                return Err(CoreError::invariant(format!(
                    "index {}.{} holds {} entries for {} entities",
                    self.name,
                    index.name(),
                    index.len(),
                    self.entities.len()
                )));
            }
            for (pk, entity) in &self.entities {
                let key = index.key_for(entity)?;
                if !index.contains(&key, pk) {
                    return Err(CoreError::invariant(format!(
                        "index {}.{} is missing entity {pk}",
                        self.name,
                        index.name()
                    )));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn descriptor(&self) -> CollectionDescriptor {
        CollectionDescriptor {
            name: self.name.clone(),
            primary_key: self.primary_key.clone(),
            entity_count: self.entities.len(),
            indexes: self
                .indexes
                .values()
                .map(|index| IndexDescriptor {
                    properties: index.properties().to_vec(),
                    primary_key: index.is_primary_key(),
                    entries: index.len(),
                })
                .collect(),
            relationships: self
                .relationships
                .iter()
                .map(|(property, relationship)| relationship.descriptor(property))
                .collect(),
        }
    }
}

/// Structural equality, treating differently ordered maps as equal.
fn same_value(a: &Value, b: &Value) -> bool {
    a == b || (!a.is_primitive() && !b.is_primitive() && a.cmp_canonical(b).is_eq())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> CollectionState {
        let mut collection = CollectionState::new("User");
        collection.primary_key = Some("id".into());
        collection.create_index(vec!["id".into()], true).unwrap();
        collection
    }

    fn user(id: &str, name: &str) -> Entity {
        Entity::new("User").with("id", id).with("name", name)
    }

    fn props(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn key_of_requires_declared_and_valid_key() {
        let mut collection = CollectionState::new("User");
        assert!(collection.key_of(&user("1", "a")).is_err());

        collection.primary_key = Some("id".into());
        assert_eq!(collection.key_of(&user("1", "a")).unwrap(), Value::text("1"));
        assert!(collection.key_of(&user("", "a")).is_err());
        assert!(collection.key_of(&Entity::new("User")).is_err());
    }

    #[test]
    fn update_moves_index_entry() {
        let mut collection = users();
        collection.create_index(props(&["name"]), false).unwrap();

        collection.put(Value::text("1"), user("1", "old")).unwrap();
        collection.put(Value::text("1"), user("1", "new")).unwrap();

        let stats = StoreStats::new();
        let old = collection
            .lookup(&props(&["name"]), &[Value::text("old")], false, &stats)
            .unwrap();
        let new = collection
            .lookup(&props(&["name"]), &[Value::text("new")], false, &stats)
            .unwrap();
        assert!(old.is_empty());
        assert_eq!(new.len(), 1);
        collection.verify_indexes().unwrap();
    }

    #[test]
    fn create_index_backfills() {
        let mut collection = users();
        collection.put(Value::text("1"), user("1", "a")).unwrap();
        collection.put(Value::text("2"), user("2", "a")).unwrap();

        assert!(collection.create_index(props(&["name"]), false).unwrap());
        assert!(!collection.create_index(props(&["name"]), false).unwrap());

        let stats = StoreStats::new();
        let found = collection
            .lookup(&props(&["name"]), &[Value::text("a")], false, &stats)
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(stats.index_lookups(), 1);
        assert_eq!(stats.scans(), 0);
    }

    #[test]
    fn lookup_without_index_scans() {
        let mut collection = users();
        collection.put(Value::text("1"), user("1", "a")).unwrap();
        collection.put(Value::text("2"), user("2", "b")).unwrap();

        let stats = StoreStats::new();
        let found = collection
            .lookup(&props(&["name"]), &[Value::text("b")], false, &stats)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, &Value::text("2"));
        assert_eq!(stats.scans(), 1);
    }

    #[test]
    fn take_and_clear() {
        let mut collection = users();
        collection.put(Value::text("1"), user("1", "a")).unwrap();
        collection.put(Value::text("2"), user("2", "b")).unwrap();

        assert!(collection.take(&Value::text("1")).unwrap().is_some());
        assert!(collection.take(&Value::text("1")).unwrap().is_none());
        collection.verify_indexes().unwrap();

        assert_eq!(collection.clear(), 1);
        assert!(collection.entities.is_empty());
        assert_eq!(collection.indexes.len(), 1);
        collection.verify_indexes().unwrap();
    }

    #[test]
    fn scan_matches_maps_structurally() {
        let a = Value::Map(vec![
            (Value::text("x"), Value::Integer(1)),
            (Value::text("y"), Value::Integer(2)),
        ]);
        let b = Value::Map(vec![
            (Value::text("y"), Value::Integer(2)),
            (Value::text("x"), Value::Integer(1)),
        ]);
        assert!(same_value(&a, &b));
        assert!(!same_value(&a, &Value::Integer(1)));
    }
}
