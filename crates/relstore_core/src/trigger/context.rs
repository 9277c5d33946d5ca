//! Read-only store access for trigger callbacks.

use crate::config::StoreOptions;
use crate::entity::Entity;
use crate::error::CoreResult;
use crate::index::normalize_query;
use crate::stats::StoreStats;
use crate::store::StoreState;
use relstore_codec::Value;

/// View of the store handed to trigger callbacks.
///
/// Callbacks run while the store is locked for writing, so they can read
/// through this context but cannot mutate the store.
pub struct TriggerContext<'a> {
    state: &'a StoreState,
    stats: &'a StoreStats,
}

impl<'a> TriggerContext<'a> {
    pub(crate) fn new(state: &'a StoreState, stats: &'a StoreStats) -> Self {
        Self { state, stats }
    }

    /// Returns the store options in effect.
    pub fn options(&self) -> &'a StoreOptions {
        &self.state.options
    }

    /// Finds an entity by primary key.
    pub fn find_one(&self, collection: &str, key: &Value) -> Option<&'a Entity> {
        let key = key.clone().into_canonical();
        self.state.collection(collection)?.entities.get(&key)
    }

    /// Returns the primary keys of entities whose `properties` equal `values`.
    pub fn lookup_keys<S: AsRef<str>>(
        &self,
        collection: &str,
        properties: &[S],
        values: &[Value],
    ) -> CoreResult<Vec<&'a Value>> {
        Ok(self
            .find(collection, properties, values)?
            .into_iter()
            .map(|(key, _)| key)
            .collect())
    }

    /// Returns entities whose `properties` equal `values`.
    pub fn find_all_by<S: AsRef<str>>(
        &self,
        collection: &str,
        properties: &[S],
        values: &[Value],
    ) -> CoreResult<Vec<&'a Entity>> {
        Ok(self
            .find(collection, properties, values)?
            .into_iter()
            .map(|(_, entity)| entity)
            .collect())
    }

    /// Returns the number of entities in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.state
            .collection(collection)
            .map_or(0, |c| c.entities.len())
    }

    fn find<S: AsRef<str>>(
        &self,
        collection: &str,
        properties: &[S],
        values: &[Value],
    ) -> CoreResult<Vec<(&'a Value, &'a Entity)>> {
        let (properties, values) = normalize_query(properties, values)?;
        self.state.lookup(self.stats, collection, &properties, &values)
    }
}
