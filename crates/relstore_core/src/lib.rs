//! # RelStore Core
//!
//! An in-process relational object store.
//!
//! This crate provides:
//! - Collections of [`Entity`] records keyed by a primary key
//! - Secondary indices over one or more properties, with scan fallback
//! - One-to-many relationships with cascading deletes and joins
//! - Intercept and observe triggers on inserts, updates and deletes
//! - CHECK, NOT NULL, NOT UNDEFINED and UNIQUE constraints
//! - A typed layer over user types through the [`Model`] trait
//!
//! ## Example
//!
//! ```
//! use relstore_core::{Entity, RelationshipOptions, Store};
//!
//! let store = Store::new();
//! store
//!     .register_entity("Bar")
//!     .primary_key("id")
//!     .finish()
//!     .unwrap();
//! store
//!     .register_entity("Foo")
//!     .primary_key("id")
//!     .check(&["number"], |v| v[0].as_integer().is_some_and(|n| n > 0))
//!     .relationship("friends", "Bar", RelationshipOptions::new().cascade(true))
//!     .finish()
//!     .unwrap();
//!
//! let foo = Entity::new("Foo").with("id", "1").with("number", 5);
//! store.add_one(foo.clone()).unwrap();
//! assert!(store
//!     .add_one(Entity::new("Foo").with("id", "2").with("number", -1))
//!     .is_err());
//!
//! store
//!     .relationship(&foo, "friends")
//!     .unwrap()
//!     .extend(vec![
//!         Entity::new("Bar").with("id", "a"),
//!         Entity::new("Bar").with("id", "b"),
//!     ])
//!     .unwrap();
//! assert_eq!(store.join("Foo", "Bar").len(), 2);
//!
//! store.remove_one(&foo).unwrap();
//! assert_eq!(store.count("Bar"), 0);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
mod config;
mod constraint;
mod entity;
mod error;
mod index;
mod relationship;
mod schema;
mod stats;
mod store;
mod trigger;
mod types;

pub use collection::{CollectionDescriptor, IndexDescriptor, Model, TypedCollection};
pub use config::StoreOptions;
pub use entity::{is_valid_key, Entity};
pub use error::{CoreError, CoreResult};
pub use index::{canonical_name, HashIndex, IndexKey};
pub use relationship::{RelationshipDescriptor, RelationshipList, RelationshipOptions};
pub use schema::{EntityBuilder, EntitySchema, Registration, RelationshipSchema};
pub use stats::{StatsSnapshot, StoreStats};
pub use store::Store;
pub use trigger::{
    Change, ExecutionStrategy, InterceptFn, ObserveFn, TriggerCallback, TriggerContext,
    TriggerEvent, TriggerEvents, TriggerInfo, TriggerOptions,
};
pub use types::{TriggerId, TruncateOptions};

pub use relstore_codec::Value;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
