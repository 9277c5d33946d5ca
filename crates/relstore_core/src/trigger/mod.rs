//! Collection triggers.
//!
//! A trigger is bound to one collection and a mask of mutation events.
//! Intercept triggers run before a mutation is written and form a pipeline:
//! each receives the change produced by the previous one and may transform
//! it or fail, which aborts the mutation. Observe triggers run after the
//! write, in registration order, and cannot veto.
//!
//! ```
//! use relstore_core::{Entity, Store, TriggerCallback, TriggerEvents, TriggerOptions};
//!
//! let store = Store::new();
//! store.set_primary_key("Foo", "id").unwrap();
//! store.create_collection_trigger(
//!     "Foo",
//!     TriggerCallback::intercept(|_, mut change| {
//!         if let Some(entity) = change.new_value.as_mut() {
//!             entity.set("seen", true);
//!         }
//!         Ok(change)
//!     }),
//!     TriggerOptions::new().events(TriggerEvents::INSERT),
//! );
//!
//! store.add_one(Entity::new("Foo").with("id", "1")).unwrap();
//! let stored = store.find_one("Foo", "1").unwrap();
//! assert_eq!(stored.get("seen").as_bool(), Some(true));
//! ```

mod context;
mod registry;

pub use context::TriggerContext;
pub(crate) use registry::TriggerRegistry;

use crate::entity::Entity;
use crate::error::CoreResult;
use crate::types::TriggerId;
use bitflags::bitflags;
use relstore_codec::Value;
use serde::Serialize;
use std::fmt;

/// Kind of mutation carried by a [`Change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerEvent {
    /// A new primary key was added.
    Insert,
    /// An existing primary key was replaced.
    Update,
    /// An entity was removed.
    Delete,
}

impl TriggerEvent {
    /// Returns the single-event mask for this event.
    pub const fn mask(self) -> TriggerEvents {
        match self {
            Self::Insert => TriggerEvents::INSERT,
            Self::Update => TriggerEvents::UPDATE,
            Self::Delete => TriggerEvents::DELETE,
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

bitflags! {
    /// Set of events a trigger fires on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TriggerEvents: u8 {
        /// Fire on inserts.
        const INSERT = 1 << 0;
        /// Fire on updates.
        const UPDATE = 1 << 1;
        /// Fire on deletes.
        const DELETE = 1 << 2;
        /// Fire on every event.
        const ALL = Self::INSERT.bits() | Self::UPDATE.bits() | Self::DELETE.bits();
    }
}

impl TriggerEvents {
    /// Returns true if `event` is in this mask.
    pub const fn matches(self, event: TriggerEvent) -> bool {
        self.contains(event.mask())
    }

    /// Lists the events in this mask.
    pub fn events(self) -> Vec<TriggerEvent> {
        [TriggerEvent::Insert, TriggerEvent::Update, TriggerEvent::Delete]
            .into_iter()
            .filter(|event| self.matches(*event))
            .collect()
    }
}

impl Default for TriggerEvents {
    fn default() -> Self {
        Self::ALL
    }
}

/// How a trigger takes part in a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStrategy {
    /// Runs before the write; may transform or reject the change.
    Intercept,
    /// Runs after the write; side effects only.
    Observe,
}

/// A mutation passing through the trigger pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Kind of mutation.
    pub event: TriggerEvent,
    /// Target collection.
    pub collection: String,
    /// Primary key of the affected entity.
    pub key: Value,
    /// Entity before the mutation. Set for updates and deletes.
    pub old_value: Option<Entity>,
    /// Entity after the mutation. Set for inserts and updates.
    pub new_value: Option<Entity>,
}

impl Change {
    pub(crate) fn delete(collection: &str, key: Value, old_value: Entity) -> Self {
        Self {
            event: TriggerEvent::Delete,
            collection: collection.to_string(),
            key,
            old_value: Some(old_value),
            new_value: None,
        }
    }

    /// Returns the entity this change is about: the new value if present,
    /// otherwise the old one.
    pub fn entity(&self) -> Option<&Entity> {
        self.new_value.as_ref().or(self.old_value.as_ref())
    }
}

/// Callback signature of intercept triggers.
pub type InterceptFn = dyn Fn(&TriggerContext<'_>, Change) -> CoreResult<Change> + Send + Sync;

/// Callback signature of observe triggers.
pub type ObserveFn = dyn Fn(&TriggerContext<'_>, &Change) + Send + Sync;

/// A trigger callback tagged with its execution strategy.
pub enum TriggerCallback {
    /// Pre-write callback returning the change to continue with.
    Intercept(Box<InterceptFn>),
    /// Post-write callback.
    Observe(Box<ObserveFn>),
}

impl TriggerCallback {
    /// Wraps an intercept closure.
    pub fn intercept<F>(f: F) -> Self
    where
        F: Fn(&TriggerContext<'_>, Change) -> CoreResult<Change> + Send + Sync + 'static,
    {
        Self::Intercept(Box::new(f))
    }

    /// Wraps an observe closure.
    pub fn observe<F>(f: F) -> Self
    where
        F: Fn(&TriggerContext<'_>, &Change) + Send + Sync + 'static,
    {
        Self::Observe(Box::new(f))
    }

    /// Returns the strategy of this callback.
    pub fn strategy(&self) -> ExecutionStrategy {
        match self {
            Self::Intercept(_) => ExecutionStrategy::Intercept,
            Self::Observe(_) => ExecutionStrategy::Observe,
        }
    }
}

impl fmt::Debug for TriggerCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TriggerCallback::{:?}", self.strategy())
    }
}

/// Registration options for a trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerOptions {
    /// Events the trigger fires on. Defaults to all.
    pub events: TriggerEvents,
    /// Name used in logs and listings.
    pub label: Option<String>,
}

impl TriggerOptions {
    /// Creates options firing on every event.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the event mask.
    #[must_use]
    pub fn events(mut self, events: TriggerEvents) -> Self {
        self.events = events;
        self
    }

    /// Sets the label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// A registered trigger.
#[derive(Debug)]
pub(crate) struct Trigger {
    pub(crate) id: TriggerId,
    pub(crate) collection: String,
    pub(crate) events: TriggerEvents,
    pub(crate) label: String,
    pub(crate) callback: TriggerCallback,
}

impl Trigger {
    pub(crate) fn info(&self) -> TriggerInfo {
        TriggerInfo {
            id: self.id,
            collection: self.collection.clone(),
            events: self.events.events(),
            strategy: self.callback.strategy(),
            label: self.label.clone(),
        }
    }
}

/// Description of a registered trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerInfo {
    /// Trigger id.
    pub id: TriggerId,
    /// Collection the trigger is bound to.
    pub collection: String,
    /// Events it fires on.
    pub events: Vec<TriggerEvent>,
    /// Execution strategy.
    pub strategy: ExecutionStrategy,
    /// Label given at registration.
    pub label: String,
}
