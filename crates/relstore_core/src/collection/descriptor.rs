//! Read-only descriptions of registered collections.

use crate::relationship::RelationshipDescriptor;
use serde::Serialize;

/// Snapshot of a collection's definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionDescriptor {
    /// Collection name.
    pub name: String,
    /// Primary-key property, once declared.
    pub primary_key: Option<String>,
    /// Number of stored entities.
    pub entity_count: usize,
    /// Declared indices, in declaration order.
    pub indexes: Vec<IndexDescriptor>,
    /// Declared relationships, in declaration order.
    pub relationships: Vec<RelationshipDescriptor>,
}

impl CollectionDescriptor {
    /// Returns the index over exactly these properties, in any order.
    pub fn index<S: AsRef<str>>(&self, properties: &[S]) -> Option<&IndexDescriptor> {
        let mut wanted: Vec<&str> = properties.iter().map(AsRef::as_ref).collect();
        wanted.sort_unstable();
        self.indexes
            .iter()
            .find(|index| index.properties.iter().map(String::as_str).eq(wanted.iter().copied()))
    }

    /// Returns the relationship declared on `property`.
    pub fn relationship(&self, property: &str) -> Option<&RelationshipDescriptor> {
        self.relationships.iter().find(|r| r.property == property)
    }
}

/// Snapshot of one index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDescriptor {
    /// Indexed properties in canonical order.
    pub properties: Vec<String>,
    /// Whether this is the primary-key index.
    pub primary_key: bool,
    /// Number of filed entries.
    pub entries: usize,
}
