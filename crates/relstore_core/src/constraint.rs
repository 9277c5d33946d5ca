//! Constraints expressed as intercept triggers.
//!
//! Every constraint is an intercept trigger on inserts and updates of one
//! collection, so it can be listed, dropped by id, and is removed by
//! [`Store::drop_all_triggers`]. While
//! [`StoreOptions::disable_constraint_checks`](crate::StoreOptions) is set,
//! constraint triggers still fire but let every change through.

use crate::error::{CoreError, CoreResult};
use crate::store::Store;
use crate::trigger::{TriggerCallback, TriggerEvents, TriggerOptions};
use crate::types::TriggerId;
use relstore_codec::Value;

/// Events every constraint fires on.
const CONSTRAINT_EVENTS: TriggerEvents = TriggerEvents::INSERT.union(TriggerEvents::UPDATE);

fn owned(properties: &[impl AsRef<str>]) -> CoreResult<Vec<String>> {
    if properties.is_empty() {
        return Err(CoreError::invalid_operation(
            "a constraint needs at least one property",
        ));
    }
    Ok(properties.iter().map(|p| p.as_ref().to_string()).collect())
}

impl Store {
    /// Registers a CHECK constraint.
    ///
    /// On every insert and update, `predicate` receives the incoming
    /// entity's values for `properties`, in the given order. Returning false
    /// rejects the mutation with [`CoreError::Integrity`].
    ///
    /// ```
    /// use relstore_core::{Entity, Store};
    ///
    /// let store = Store::new();
    /// store.set_primary_key("Foo", "id").unwrap();
    /// store
    ///     .check("Foo", &["number"], |v| v[0].as_integer().is_some_and(|n| n > 0))
    ///     .unwrap();
    ///
    /// assert!(store.add_one(Entity::new("Foo").with("id", "1").with("number", 5)).is_ok());
    /// assert!(store.add_one(Entity::new("Foo").with("id", "2").with("number", -1)).is_err());
    /// assert_eq!(store.count("Foo"), 1);
    /// ```
    pub fn check<S, F>(&self, collection: &str, properties: &[S], predicate: F) -> CoreResult<TriggerId>
    where
        S: AsRef<str>,
        F: Fn(&[Value]) -> bool + Send + Sync + 'static,
    {
        let properties = owned(properties)?;
        let label = format!("check({})", properties.join(", "));
        Ok(self.constraint(collection, "check", properties, label, predicate))
    }

    /// Rejects entities whose `property` is null.
    pub fn check_not_null(&self, collection: &str, property: &str) -> TriggerId {
        self.constraint(
            collection,
            "not null",
            vec![property.to_string()],
            format!("not_null({property})"),
            |values| !values[0].is_null(),
        )
    }

    /// Rejects entities that do not set `property`.
    pub fn check_not_undefined(&self, collection: &str, property: &str) -> TriggerId {
        self.constraint(
            collection,
            "not undefined",
            vec![property.to_string()],
            format!("not_undefined({property})"),
            |values| !values[0].is_undefined(),
        )
    }

    /// Registers a UNIQUE constraint over one or more properties.
    ///
    /// Creates the index over `properties` if it is missing. A write is
    /// rejected when another entity already holds the same values; an
    /// entity never collides with its own stored version. Entities lacking
    /// the properties share the undefined value and collide with each other.
    pub fn check_unique<S: AsRef<str>>(&self, collection: &str, properties: &[S]) -> CoreResult<TriggerId> {
        let properties = owned(properties)?;
        self.create_index(collection, &properties, false)?;

        let label = format!("unique({})", properties.join(", "));
        let callback = {
            let properties = properties.clone();
            TriggerCallback::intercept(move |ctx, change| {
                if ctx.options().disable_constraint_checks {
                    return Ok(change);
                }
                let Some(entity) = change.new_value.as_ref() else {
                    return Ok(change);
                };
                let values = entity.project(&properties);
                let taken = ctx
                    .lookup_keys(&change.collection, &properties, &values)?
                    .into_iter()
                    .any(|key| *key != change.key);
                if taken {
                    return Err(CoreError::integrity(
                        "unique",
                        change.collection.as_str(),
                        &properties,
                        values,
                    ));
                }
                Ok(change)
            })
        };
        Ok(self.create_collection_trigger(
            collection,
            callback,
            TriggerOptions::new().events(CONSTRAINT_EVENTS).label(label),
        ))
    }

    /// Drops a constraint by id.
    ///
    /// # Errors
    ///
    /// [`CoreError::TriggerNotFound`] if no constraint or trigger has this id.
    pub fn drop_constraint(&self, id: TriggerId) -> CoreResult<()> {
        self.drop_trigger(id)
    }

    /// Drops every constraint. User triggers are dropped too.
    pub fn drop_all_constraints(&self) -> usize {
        self.drop_all_triggers()
    }

    fn constraint<F>(
        &self,
        collection: &str,
        kind: &'static str,
        properties: Vec<String>,
        label: String,
        predicate: F,
    ) -> TriggerId
    where
        F: Fn(&[Value]) -> bool + Send + Sync + 'static,
    {
        let callback = TriggerCallback::intercept(move |ctx, change| {
            if ctx.options().disable_constraint_checks {
                return Ok(change);
            }
            let Some(entity) = change.new_value.as_ref() else {
                return Ok(change);
            };
            let values = entity.project(&properties);
            if !predicate(&values) {
                return Err(CoreError::integrity(
                    kind,
                    change.collection.as_str(),
                    &properties,
                    values,
                ));
            }
            Ok(change)
        });
        self.create_collection_trigger(
            collection,
            callback,
            TriggerOptions::new().events(CONSTRAINT_EVENTS).label(label),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::config::StoreOptions;
    use crate::trigger::ExecutionStrategy;

    fn store() -> Store {
        let store = Store::new();
        store.set_primary_key("Foo", "id").unwrap();
        store
    }

    fn foo(id: &str) -> Entity {
        Entity::new("Foo").with("id", id)
    }

    fn positive(values: &[Value]) -> bool {
        values[0].as_integer().is_some_and(|n| n > 0)
    }

    #[test]
    fn check_rejects_failing_values() {
        let store = store();
        store.check("Foo", &["number"], positive).unwrap();

        store.add_one(foo("1").with("number", 5)).unwrap();
        let err = store.add_one(foo("2").with("number", -1)).unwrap_err();
        assert!(err.is_integrity());
        assert_eq!(
            err.to_string(),
            "check constraint failed on Foo field(s): number with values -1"
        );
        assert_eq!(store.find_all("Foo").len(), 1);
        assert_eq!(store.stats().constraint_violations, 1);
    }

    #[test]
    fn check_runs_on_updates() {
        let store = store();
        store.check("Foo", &["number"], positive).unwrap();
        store.add_one(foo("1").with("number", 5)).unwrap();

        assert!(store.add_one(foo("1").with("number", 0)).is_err());
        assert_eq!(store.find_one("Foo", "1").unwrap().get("number"), &Value::Integer(5));
    }

    #[test]
    fn check_sees_properties_in_declared_order() {
        let store = store();
        store
            .check("Foo", &["high", "low"], |v| v[0].as_integer() > v[1].as_integer())
            .unwrap();

        store.add_one(foo("1").with("low", 1).with("high", 2)).unwrap();
        assert!(store.add_one(foo("2").with("low", 3).with("high", 2)).is_err());
        assert!(store.check("Foo", &[] as &[&str], |_| true).is_err());
    }

    #[test]
    fn check_does_not_fire_on_delete() {
        let store = store();
        store.add_one(foo("1").with("number", -5)).unwrap();
        store.check("Foo", &["number"], positive).unwrap();
        assert!(store.remove_by_key("Foo", "1").unwrap());
    }

    #[test]
    fn not_null_and_not_undefined() {
        let store = store();
        store.check_not_null("Foo", "name");
        store.check_not_undefined("Foo", "tag");

        let err = store.add_one(foo("1").with("name", ()).with("tag", 1)).unwrap_err();
        assert!(matches!(&err, CoreError::Integrity { constraint, .. } if constraint == "not null"));

        // An unset property is undefined, not null.
        let err = store.add_one(foo("2").with("name", "x")).unwrap_err();
        assert!(matches!(&err, CoreError::Integrity { constraint, .. } if constraint == "not undefined"));

        store.add_one(foo("3").with("tag", ())).unwrap();
        assert_eq!(store.count("Foo"), 1);
    }

    #[test]
    fn unique_rejects_duplicates_but_not_self() {
        let store = store();
        store.check_unique("Foo", &["email"]).unwrap();
        assert!(store.describe("Foo").unwrap().index(&["email"]).is_some());

        store.add_one(foo("1").with("email", "x")).unwrap();
        let err = store.add_one(foo("2").with("email", "x")).unwrap_err();
        assert!(matches!(&err, CoreError::Integrity { constraint, .. } if constraint == "unique"));
        assert_eq!(store.find_all("Foo"), vec![foo("1").with("email", "x")]);

        // Re-saving the same entity is not a collision.
        store.add_one(foo("1").with("email", "x").with("n", 1)).unwrap();
        store.add_one(foo("1").with("email", "y")).unwrap();
        store.add_one(foo("2").with("email", "x")).unwrap();
        store.verify_indexes().unwrap();
    }

    #[test]
    fn composite_unique() {
        let store = store();
        store.check_unique("Foo", &["first", "last"]).unwrap();

        store.add_one(foo("1").with("first", "a").with("last", "b")).unwrap();
        store.add_one(foo("2").with("first", "a").with("last", "c")).unwrap();
        assert!(store
            .add_one(foo("3").with("last", "b").with("first", "a"))
            .is_err());
    }

    #[test]
    fn disabled_checks_let_everything_through() {
        let store = Store::with_options(StoreOptions::new().disable_constraint_checks(true));
        store.set_primary_key("Foo", "id").unwrap();
        store.check("Foo", &["number"], positive).unwrap();
        store.check_unique("Foo", &["email"]).unwrap();

        store.add_one(foo("1").with("number", -1).with("email", "x")).unwrap();
        store.add_one(foo("2").with("number", -2).with("email", "x")).unwrap();
        assert_eq!(store.count("Foo"), 2);

        store.set_options(StoreOptions::new());
        assert!(store.add_one(foo("3").with("number", -3)).is_err());
    }

    #[test]
    fn dropping_constraints() {
        let store = store();
        let id = store.check("Foo", &["number"], positive).unwrap();
        store.check_not_null("Foo", "number");

        let info = store.triggers(Some("Foo"));
        assert_eq!(info[0].label, "check(number)");
        assert_eq!(info[0].strategy, ExecutionStrategy::Intercept);

        store.drop_constraint(id).unwrap();
        store.add_one(foo("1").with("number", -1)).unwrap();
        assert!(store.add_one(foo("2").with("number", ())).is_err());

        assert_eq!(store.drop_all_constraints(), 1);
        store.add_one(foo("2").with("number", ())).unwrap();
        assert!(store.drop_constraint(id).is_err());
    }
}
