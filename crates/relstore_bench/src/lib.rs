//! Benchmark utilities.

use relstore_core::{Entity, Store};
use relstore_testkit::quiet_options;

/// Generates `Person` entities with `id`, `first`, `last` and `age`.
///
/// `first` cycles through `distinct` values so indexed lookups return
/// `count / distinct` entities each.
pub fn people(count: usize, distinct: usize) -> Vec<Entity> {
    (0..count)
        .map(|i| {
            Entity::new("Person")
                .with("id", i as i64)
                .with("first", format!("first-{}", i % distinct))
                .with("last", format!("last-{i}"))
                .with("age", (i % 90) as i64)
        })
        .collect()
}

/// Creates a store with a `Person` collection keyed by `id`, optionally
/// indexed on `first`.
pub fn person_store(indexed: bool) -> Store {
    let store = Store::with_options(quiet_options());
    let builder = store.register_entity("Person").primary_key("id");
    let builder = if indexed { builder.index(&["first"]) } else { builder };
    builder.finish().expect("Failed to register Person");
    store
}
