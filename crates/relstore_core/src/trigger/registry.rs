//! Trigger registry.

use crate::trigger::{Trigger, TriggerCallback, TriggerEvent, TriggerEvents, TriggerInfo};
use crate::types::TriggerId;
use std::collections::BTreeMap;

/// All triggers of a store, ordered by id and therefore by registration.
#[derive(Debug, Default)]
pub(crate) struct TriggerRegistry {
    triggers: BTreeMap<TriggerId, Trigger>,
    last_id: TriggerId,
}

impl TriggerRegistry {
    pub(crate) fn register(
        &mut self,
        collection: &str,
        events: TriggerEvents,
        label: Option<String>,
        callback: TriggerCallback,
    ) -> TriggerId {
        let id = self.last_id.next();
        self.last_id = id;
        let label = label.unwrap_or_else(|| format!("{:?}", callback.strategy()).to_lowercase());
        self.triggers.insert(
            id,
            Trigger {
                id,
                collection: collection.to_string(),
                events,
                label,
                callback,
            },
        );
        id
    }

    /// Removes a trigger. Dropping the returned value releases its callback.
    pub(crate) fn remove(&mut self, id: TriggerId) -> Option<Trigger> {
        self.triggers.remove(&id)
    }

    /// Removes every trigger and returns how many there were.
    pub(crate) fn clear(&mut self) -> usize {
        let count = self.triggers.len();
        self.triggers.clear();
        count
    }

    pub(crate) fn len(&self) -> usize {
        self.triggers.len()
    }

    /// Triggers bound to `collection` that fire on `event`, in registration order.
    pub(crate) fn matching<'a>(
        &'a self,
        collection: &'a str,
        event: TriggerEvent,
    ) -> impl Iterator<Item = &'a Trigger> + 'a {
        self.triggers
            .values()
            .filter(move |t| t.collection == collection && t.events.matches(event))
    }

    pub(crate) fn info(&self, collection: Option<&str>) -> Vec<TriggerInfo> {
        self.triggers
            .values()
            .filter(|t| collection.map_or(true, |c| t.collection == c))
            .map(Trigger::info)
            .collect()
    }
}
