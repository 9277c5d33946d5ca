//! Trigger registration.

use super::Store;
use crate::error::{CoreError, CoreResult};
use crate::trigger::{TriggerCallback, TriggerInfo, TriggerOptions};
use crate::types::TriggerId;
use tracing::debug;

impl Store {
    /// Registers a trigger on a collection, creating the collection if needed.
    ///
    /// Triggers on the same collection and event run in registration order.
    pub fn create_collection_trigger(
        &self,
        collection: &str,
        callback: TriggerCallback,
        options: TriggerOptions,
    ) -> TriggerId {
        let mut state = self.state.write();
        state.ensure_collection(collection);
        let strategy = callback.strategy();
        let id = state
            .triggers
            .register(collection, options.events, options.label, callback);
        debug!(%id, collection, ?strategy, events = ?options.events, "registered trigger");
        id
    }

    /// Drops a trigger, releasing its callback.
    ///
    /// # Errors
    ///
    /// [`CoreError::TriggerNotFound`] if no trigger has this id.
    pub fn drop_trigger(&self, id: TriggerId) -> CoreResult<()> {
        let removed = self.state.write().triggers.remove(id);
        match removed {
            Some(trigger) => {
                debug!(%id, collection = %trigger.collection, label = %trigger.label, "dropped trigger");
                Ok(())
            }
            None => Err(CoreError::TriggerNotFound { id }),
        }
    }

    /// Drops every trigger, constraints included. Returns how many were dropped.
    pub fn drop_all_triggers(&self) -> usize {
        let count = self.state.write().triggers.clear();
        debug!(count, "dropped all triggers");
        count
    }

    /// Lists triggers, optionally restricted to one collection.
    pub fn triggers(&self, collection: Option<&str>) -> Vec<TriggerInfo> {
        self.state.read().triggers.info(collection)
    }

    /// Returns the number of registered triggers.
    pub fn trigger_count(&self) -> usize {
        self.state.read().triggers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::trigger::{ExecutionStrategy, TriggerEvent, TriggerEvents};
    use parking_lot::Mutex;
    use relstore_codec::Value;
    use std::sync::Arc;

    fn store() -> Store {
        let store = Store::new();
        store.set_primary_key("Foo", "id").unwrap();
        store
    }

    fn foo(id: &str) -> Entity {
        Entity::new("Foo").with("id", id)
    }

    #[test]
    fn observe_delete_fires_only_on_delete() {
        let store = store();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.create_collection_trigger(
            "Foo",
            TriggerCallback::observe(move |_, change| {
                sink.lock().push((change.event, change.old_value.clone()));
            }),
            TriggerOptions::new().events(TriggerEvents::DELETE),
        );

        store.add_one(foo("1")).unwrap();
        assert!(seen.lock().is_empty());

        store.remove_by_key("Foo", "1").unwrap();
        store.remove_by_key("Foo", "1").unwrap();
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], (TriggerEvent::Delete, Some(foo("1"))));
    }

    #[test]
    fn observers_see_committed_state() {
        let store = store();
        let counts = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&counts);
        store.create_collection_trigger(
            "Foo",
            TriggerCallback::observe(move |ctx, _| sink.lock().push(ctx.count("Foo"))),
            TriggerOptions::new(),
        );

        store.add_one(foo("1")).unwrap();
        store.add_one(foo("2")).unwrap();
        store.remove_by_key("Foo", "1").unwrap();
        assert_eq!(*counts.lock(), vec![1, 2, 1]);
    }

    #[test]
    fn intercept_transformation_is_stored() {
        let store = store();
        store.create_collection_trigger(
            "Foo",
            TriggerCallback::intercept(|_, mut change| {
                if let Some(entity) = change.new_value.as_mut() {
                    entity.set("name", "rewritten");
                }
                Ok(change)
            }),
            TriggerOptions::new(),
        );

        store.add_one(foo("1").with("name", "original")).unwrap();
        assert_eq!(
            store.find_one("Foo", "1").unwrap().get("name"),
            &Value::text("rewritten")
        );
    }

    #[test]
    fn intercepts_chain_in_registration_order() {
        let store = store();
        for suffix in ["a", "b"] {
            store.create_collection_trigger(
                "Foo",
                TriggerCallback::intercept(move |_, mut change| {
                    if let Some(entity) = change.new_value.as_mut() {
                        let trail = entity.get("trail").as_text().unwrap_or("").to_string();
                        entity.set("trail", format!("{trail}{suffix}"));
                    }
                    Ok(change)
                }),
                TriggerOptions::new().events(TriggerEvents::INSERT),
            );
        }

        store.add_one(foo("1")).unwrap();
        assert_eq!(store.find_one("Foo", "1").unwrap().text("trail").unwrap(), "ab");
    }

    #[test]
    fn rejecting_intercept_aborts_before_write() {
        let store = store();
        let observed = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&observed);
        store.create_collection_trigger(
            "Foo",
            TriggerCallback::intercept(|_, _| Err(CoreError::invalid_operation("read only"))),
            TriggerOptions::new().events(TriggerEvents::INSERT),
        );
        store.create_collection_trigger(
            "Foo",
            TriggerCallback::observe(move |_, _| *sink.lock() += 1),
            TriggerOptions::new(),
        );

        assert!(store.add_one(foo("1")).is_err());
        assert_eq!(store.count("Foo"), 0);
        assert_eq!(*observed.lock(), 0);
        store.verify_indexes().unwrap();
    }

    #[test]
    fn delete_intercept_can_veto_but_not_rewrite() {
        let store = store();
        store.add_one(foo("keep")).unwrap();
        store.add_one(foo("go")).unwrap();
        store.create_collection_trigger(
            "Foo",
            TriggerCallback::intercept(|_, mut change| {
                if change.key == Value::text("keep") {
                    return Err(CoreError::invalid_operation("protected"));
                }
                change.key = Value::text("keep");
                Ok(change)
            }),
            TriggerOptions::new().events(TriggerEvents::DELETE),
        );

        assert!(store.remove_by_key("Foo", "keep").is_err());
        assert!(store.remove_by_key("Foo", "go").unwrap());
        assert!(store.find_one("Foo", "keep").is_some());
        assert!(store.find_one("Foo", "go").is_none());
    }

    #[test]
    fn intercept_may_not_change_identity() {
        let store = store();
        store.create_collection_trigger(
            "Foo",
            TriggerCallback::intercept(|_, mut change| {
                if let Some(entity) = change.new_value.as_mut() {
                    entity.set("id", "other");
                }
                Ok(change)
            }),
            TriggerOptions::new(),
        );

        let err = store.add_one(foo("1")).unwrap_err();
        assert!(matches!(err, CoreError::InvariantViolation { .. }));
        assert_eq!(store.count("Foo"), 0);
    }

    #[test]
    fn update_events_carry_old_value() {
        let store = store();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        store.create_collection_trigger(
            "Foo",
            TriggerCallback::observe(move |_, change| *sink.lock() = Some(change.clone())),
            TriggerOptions::new().events(TriggerEvents::UPDATE),
        );

        store.add_one(foo("1").with("n", 1)).unwrap();
        assert!(seen.lock().is_none());
        store.add_one(foo("1").with("n", 2)).unwrap();

        let change = seen.lock().clone().unwrap();
        assert_eq!(change.event, TriggerEvent::Update);
        assert_eq!(change.old_value.unwrap().get("n"), &Value::Integer(1));
        assert_eq!(change.new_value.unwrap().get("n"), &Value::Integer(2));
    }

    #[test]
    fn drop_trigger_stops_it_firing() {
        let store = store();
        let fired = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&fired);
        let id = store.create_collection_trigger(
            "Foo",
            TriggerCallback::observe(move |_, _| *sink.lock() += 1),
            TriggerOptions::new(),
        );

        store.add_one(foo("1")).unwrap();
        store.drop_trigger(id).unwrap();
        store.add_one(foo("2")).unwrap();

        assert_eq!(*fired.lock(), 1);
        assert!(matches!(
            store.drop_trigger(id),
            Err(CoreError::TriggerNotFound { .. })
        ));
        // The closure and its captured Arc were released.
        assert_eq!(Arc::strong_count(&fired), 1);
    }

    #[test]
    fn listing_and_drop_all() {
        let store = store();
        store.create_collection_trigger(
            "Foo",
            TriggerCallback::observe(|_, _| {}),
            TriggerOptions::new().label("audit"),
        );
        store.create_collection_trigger(
            "Bar",
            TriggerCallback::intercept(|_, c| Ok(c)),
            TriggerOptions::new().events(TriggerEvents::INSERT),
        );

        let foo_triggers = store.triggers(Some("Foo"));
        assert_eq!(foo_triggers.len(), 1);
        assert_eq!(foo_triggers[0].label, "audit");
        assert_eq!(foo_triggers[0].strategy, ExecutionStrategy::Observe);
        assert_eq!(store.trigger_count(), 2);

        assert_eq!(store.drop_all_triggers(), 2);
        assert_eq!(store.trigger_count(), 0);
        assert!(store.collection_names().contains(&"Bar".to_string()));
    }
}
