//! Lock-protected store state.

use crate::collection::CollectionState;
use crate::config::StoreOptions;
use crate::entity::Entity;
use crate::error::CoreResult;
use crate::stats::StoreStats;
use crate::trigger::TriggerRegistry;
use indexmap::IndexMap;
use relstore_codec::Value;
use tracing::debug;

/// Everything guarded by the store lock.
#[derive(Debug, Default)]
pub(crate) struct StoreState {
    pub(crate) options: StoreOptions,
    pub(crate) collections: IndexMap<String, CollectionState>,
    pub(crate) triggers: TriggerRegistry,
}

impl StoreState {
    pub(crate) fn new(options: StoreOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub(crate) fn collection(&self, name: &str) -> Option<&CollectionState> {
        self.collections.get(name)
    }

    pub(crate) fn collection_mut(&mut self, name: &str) -> Option<&mut CollectionState> {
        self.collections.get_mut(name)
    }

    /// Returns the named collection, registering it on first use.
    pub(crate) fn ensure_collection(&mut self, name: &str) -> &mut CollectionState {
        if !self.collections.contains_key(name) {
            debug!(collection = %name, "registering collection");
        }
        self.collections
            .entry(name.to_string())
            .or_insert_with(|| CollectionState::new(name))
    }

    /// Index-or-scan lookup; unknown collections are empty.
    pub(crate) fn lookup(
        &self,
        stats: &StoreStats,
        collection: &str,
        properties: &[String],
        values: &[Value],
    ) -> CoreResult<Vec<(&Value, &Entity)>> {
        match self.collection(collection) {
            Some(c) => c.lookup(properties, values, self.options.warn_on_scan, stats),
            None => Ok(Vec::new()),
        }
    }
}
