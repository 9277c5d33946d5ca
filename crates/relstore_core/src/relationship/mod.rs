//! One-to-many relationships between collections.
//!
//! A relationship is declared on an owner collection under a property
//! name. For every owner primary key it stores the ordered list of target
//! primary keys; owners never hold target entities themselves.

mod list;

pub use list::RelationshipList;

use indexmap::IndexMap;
use relstore_codec::Value;
use serde::{Deserialize, Serialize};

/// Behaviour of a relationship when owners are removed or targets unlinked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipOptions {
    /// Removing an owner also removes every target it lists.
    pub cascade: bool,
    /// Unlinking a target from the list also removes the target.
    pub delete_on_removal: bool,
}

impl RelationshipOptions {
    /// Creates options with both flags off.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cascade: false,
            delete_on_removal: false,
        }
    }

    /// Sets whether owner removal cascades to targets.
    #[must_use]
    pub const fn cascade(mut self, value: bool) -> Self {
        self.cascade = value;
        self
    }

    /// Sets whether unlinked targets are removed.
    #[must_use]
    pub const fn delete_on_removal(mut self, value: bool) -> Self {
        self.delete_on_removal = value;
        self
    }
}

/// Snapshot of a declared relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipDescriptor {
    /// Owning property.
    pub property: String,
    /// Target collection.
    pub target: String,
    /// Cascade behaviour.
    pub options: RelationshipOptions,
    /// Number of owners with a link row.
    pub owners: usize,
}

/// Link table of one relationship.
#[derive(Debug, Clone)]
pub(crate) struct Relationship {
    pub(crate) target: String,
    pub(crate) options: RelationshipOptions,
    /// Owner primary key to ordered target primary keys.
    pub(crate) links: IndexMap<Value, Vec<Value>>,
}

impl Relationship {
    pub(crate) fn new(target: impl Into<String>, options: RelationshipOptions) -> Self {
        Self {
            target: target.into(),
            options,
            links: IndexMap::new(),
        }
    }

    /// Target keys listed for `owner`, empty if it has no row.
    pub(crate) fn targets(&self, owner: &Value) -> &[Value] {
        self.links.get(owner).map_or(&[], Vec::as_slice)
    }

    pub(crate) fn descriptor(&self, property: &str) -> RelationshipDescriptor {
        RelationshipDescriptor {
            property: property.to_string(),
            target: self.target.clone(),
            options: self.options,
            owners: self.links.len(),
        }
    }
}
