//! The store: root aggregate of collections, indices, relationships and
//! triggers.
//!
//! All state sits behind one [`RwLock`]. Mutations take the write lock for
//! their whole duration, trigger dispatch and cascades included, so every
//! mutation completes before the next one starts. Queries share the read
//! lock.

mod mutate;
mod query;
mod state;
mod triggers;

pub(crate) use state::StoreState;

use crate::collection::{CollectionDescriptor, Model, TypedCollection};
use crate::config::StoreOptions;
use crate::error::{CoreError, CoreResult};
use crate::index::canonical_properties;
use crate::relationship::{Relationship, RelationshipOptions};
use crate::stats::{StatsSnapshot, StoreStats};
use parking_lot::RwLock;
use tracing::debug;

/// An in-process relational object store.
///
/// ```
/// use relstore_core::{Entity, Store};
///
/// let store = Store::new();
/// store.set_primary_key("User", "id").unwrap();
/// store.create_index("User", &["name"], false).unwrap();
///
/// store.add_one(Entity::new("User").with("id", 1).with("name", "ada")).unwrap();
///
/// let found = store.find_one_by("User", &["name"], &["ada".into()]).unwrap();
/// assert_eq!(found.get("id").as_integer(), Some(1));
/// ```
#[derive(Debug, Default)]
pub struct Store {
    pub(crate) state: RwLock<StoreState>,
    pub(crate) stats: StoreStats,
}

impl Store {
    /// Creates an empty store with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with the given options.
    pub fn with_options(options: StoreOptions) -> Self {
        Self {
            state: RwLock::new(StoreState::new(options)),
            stats: StoreStats::new(),
        }
    }

    /// Returns the options in effect.
    pub fn options(&self) -> StoreOptions {
        self.state.read().options.clone()
    }

    /// Replaces the options.
    pub fn set_options(&self, options: StoreOptions) {
        debug!(?options, "updating store options");
        self.state.write().options = options;
    }

    /// Returns a snapshot of the operation counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Registers a collection if it does not exist yet.
    pub fn ensure_collection(&self, name: &str) {
        self.state.write().ensure_collection(name);
    }

    /// Lists registered collections in registration order.
    pub fn collection_names(&self) -> Vec<String> {
        self.state.read().collections.keys().cloned().collect()
    }

    /// Describes a registered collection.
    pub fn describe(&self, name: &str) -> Option<CollectionDescriptor> {
        self.state.read().collection(name).map(|c| c.descriptor())
    }

    /// Declares the primary-key property of a collection.
    ///
    /// Redeclaring the same property is a no-op. Switching to another
    /// property is only allowed while the collection is empty.
    pub fn set_primary_key(&self, collection: &str, property: &str) -> CoreResult<()> {
        let mut state = self.state.write();
        let coll = state.ensure_collection(collection);
        match coll.primary_key.as_deref() {
            Some(existing) if existing == property => return Ok(()),
            Some(existing) if !coll.entities.is_empty() => {
                return Err(CoreError::invalid_operation(format!(
                    "{collection} already has primary key {existing} and holds entities"
                )));
            }
            Some(existing) => {
                let previous = existing.to_string();
                if coll
                    .indexes
                    .get(&previous)
                    .is_some_and(|index| index.is_primary_key())
                {
                    coll.indexes.shift_remove(&previous);
                }
            }
            None => {}
        }
        coll.primary_key = Some(property.to_string());
        coll.create_index(vec![property.to_string()], true)?;
        debug!(collection, property, "declared primary key");
        Ok(())
    }

    /// Creates an index over `properties`, back-filling existing entities.
    ///
    /// Creating an index that already exists is a no-op. With
    /// `is_primary_key` the single property also becomes the primary key.
    pub fn create_index<S: AsRef<str>>(
        &self,
        collection: &str,
        properties: &[S],
        is_primary_key: bool,
    ) -> CoreResult<()> {
        let properties = canonical_properties(properties)?;
        if is_primary_key {
            let [property] = properties.as_slice() else {
                return Err(CoreError::invalid_operation(
                    "a primary key index covers exactly one property",
                ));
            };
            return self.set_primary_key(collection, property);
        }
        let mut state = self.state.write();
        let name = properties.join(",");
        if state.ensure_collection(collection).create_index(properties, false)? {
            debug!(collection, index = %name, "created index");
        }
        Ok(())
    }

    /// Drops a secondary index. Returns false if it did not exist.
    pub fn drop_index<S: AsRef<str>>(&self, collection: &str, properties: &[S]) -> CoreResult<bool> {
        let name = canonical_properties(properties)?.join(",");
        let mut state = self.state.write();
        let Some(coll) = state.collection_mut(collection) else {
            return Ok(false);
        };
        let primary = match coll.indexes.get(&name) {
            None => return Ok(false),
            Some(index) => index.is_primary_key(),
        };
        if primary {
            return Err(CoreError::invalid_operation(format!(
                "cannot drop primary key index {collection}.{name}"
            )));
        }
        coll.indexes.shift_remove(&name);
        debug!(collection, index = %name, "dropped index");
        Ok(true)
    }

    /// Declares a one-to-many relationship from `owner.property` to `target`.
    ///
    /// Redeclaring a relationship updates its options; pointing an existing
    /// property at a different target is rejected.
    pub fn create_foreign_key(
        &self,
        owner: &str,
        target: &str,
        property: &str,
        options: RelationshipOptions,
    ) -> CoreResult<()> {
        let mut state = self.state.write();
        state.ensure_collection(target);
        let coll = state.ensure_collection(owner);
        match coll.relationships.get_mut(property) {
            Some(existing) if existing.target != target => {
                Err(CoreError::invalid_operation(format!(
                    "{owner}.{property} already refers to {}",
                    existing.target
                )))
            }
            Some(existing) => {
                existing.options = options;
                Ok(())
            }
            None => {
                coll.relationships
                    .insert(property.to_string(), Relationship::new(target, options));
                debug!(owner, target, property, ?options, "declared relationship");
                Ok(())
            }
        }
    }

    /// Checks that every index holds exactly one entry per entity.
    pub fn verify_indexes(&self) -> CoreResult<()> {
        let state = self.state.read();
        for collection in state.collections.values() {
            collection.verify_indexes()?;
        }
        Ok(())
    }

    /// Returns a typed handle over the model's collection.
    pub fn collection<T: Model>(&self) -> TypedCollection<'_, T> {
        TypedCollection::new(self)
    }
}
