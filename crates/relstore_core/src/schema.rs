//! Declarative collection registration.
//!
//! A collection's primary key, indices, relationships and constraints can
//! be declared in one place, either with the [`EntityBuilder`] returned by
//! [`Store::register_entity`] or from a serializable [`EntitySchema`].

use crate::collection::CollectionDescriptor;
use crate::error::{CoreError, CoreResult};
use crate::relationship::RelationshipOptions;
use crate::store::Store;
use crate::types::TriggerId;
use relstore_codec::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Serializable description of a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    /// Collection name.
    pub name: String,
    /// Primary-key property.
    #[serde(default)]
    pub primary_key: Option<String>,
    /// Secondary indices, each over one or more properties.
    #[serde(default)]
    pub indexes: Vec<Vec<String>>,
    /// UNIQUE constraints, each over one or more properties.
    #[serde(default)]
    pub unique: Vec<Vec<String>>,
    /// Properties that may not be null.
    #[serde(default)]
    pub not_null: Vec<String>,
    /// Properties that must be set.
    #[serde(default)]
    pub not_undefined: Vec<String>,
    /// Relationships owned by this collection.
    #[serde(default)]
    pub relationships: Vec<RelationshipSchema>,
}

impl EntitySchema {
    /// Creates an empty schema for `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Serializable description of a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipSchema {
    /// Owning property.
    pub property: String,
    /// Target collection.
    pub target: String,
    /// Cascade behaviour.
    #[serde(flatten)]
    pub options: RelationshipOptions,
}

/// Result of registering a collection.
#[derive(Debug, Clone)]
pub struct Registration {
    /// The collection as registered.
    pub descriptor: CollectionDescriptor,
    /// Ids of the constraints created, in creation order.
    pub constraints: Vec<TriggerId>,
}

type Predicate = Box<dyn Fn(&[Value]) -> bool + Send + Sync>;

/// Builder returned by [`Store::register_entity`].
///
/// ```
/// use relstore_core::{RelationshipOptions, Store};
///
/// let store = Store::new();
/// let registration = store
///     .register_entity("Foo")
///     .primary_key("id")
///     .index(&["name"])
///     .not_null("name")
///     .relationship("friends", "Bar", RelationshipOptions::new().cascade(true))
///     .finish()
///     .unwrap();
///
/// assert_eq!(registration.descriptor.primary_key.as_deref(), Some("id"));
/// assert_eq!(registration.constraints.len(), 1);
/// ```
#[must_use = "nothing is registered until finish is called"]
pub struct EntityBuilder<'s> {
    store: &'s Store,
    schema: EntitySchema,
    checks: Vec<(Vec<String>, Predicate)>,
}

impl<'s> EntityBuilder<'s> {
    /// Declares the primary-key property.
    pub fn primary_key(mut self, property: impl Into<String>) -> Self {
        self.schema.primary_key = Some(property.into());
        self
    }

    /// Declares a secondary index.
    pub fn index<S: AsRef<str>>(mut self, properties: &[S]) -> Self {
        self.schema.indexes.push(to_owned(properties));
        self
    }

    /// Declares a UNIQUE constraint.
    pub fn unique<S: AsRef<str>>(mut self, properties: &[S]) -> Self {
        self.schema.unique.push(to_owned(properties));
        self
    }

    /// Declares a NOT NULL constraint.
    pub fn not_null(mut self, property: impl Into<String>) -> Self {
        self.schema.not_null.push(property.into());
        self
    }

    /// Declares a NOT UNDEFINED constraint.
    pub fn not_undefined(mut self, property: impl Into<String>) -> Self {
        self.schema.not_undefined.push(property.into());
        self
    }

    /// Declares a CHECK constraint. See [`Store::check`].
    pub fn check<S, F>(mut self, properties: &[S], predicate: F) -> Self
    where
        S: AsRef<str>,
        F: Fn(&[Value]) -> bool + Send + Sync + 'static,
    {
        self.checks.push((to_owned(properties), Box::new(predicate)));
        self
    }

    /// Declares a relationship to `target`.
    pub fn relationship(
        mut self,
        property: impl Into<String>,
        target: impl Into<String>,
        options: RelationshipOptions,
    ) -> Self {
        self.schema.relationships.push(RelationshipSchema {
            property: property.into(),
            target: target.into(),
            options,
        });
        self
    }

    /// Returns the declarations collected so far, CHECK predicates aside.
    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    /// Applies every declaration to the store.
    ///
    /// Declarations are applied one by one; on error, those already
    /// applied stay in place.
    pub fn finish(self) -> CoreResult<Registration> {
        let mut registration = self.store.apply_schema(&self.schema)?;
        for (properties, predicate) in self.checks {
            let id = self.store.check(&self.schema.name, &properties, predicate)?;
            registration.constraints.push(id);
        }
        Ok(registration)
    }
}

impl fmt::Debug for EntityBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityBuilder")
            .field("schema", &self.schema)
            .field("checks", &self.checks.len())
            .finish()
    }
}

fn to_owned<S: AsRef<str>>(properties: &[S]) -> Vec<String> {
    properties.iter().map(|p| p.as_ref().to_string()).collect()
}

impl Store {
    /// Starts registering a collection.
    pub fn register_entity(&self, name: impl Into<String>) -> EntityBuilder<'_> {
        EntityBuilder {
            store: self,
            schema: EntitySchema::new(name),
            checks: Vec::new(),
        }
    }

    /// Registers a collection from a schema.
    ///
    /// The primary key is declared first, then indices, relationships and
    /// constraints. Applying the same schema twice leaves a single copy of
    /// every index and relationship but registers its constraints again.
    pub fn apply_schema(&self, schema: &EntitySchema) -> CoreResult<Registration> {
        let name = schema.name.as_str();
        if name.is_empty() {
            return Err(CoreError::invalid_operation("collection name is empty"));
        }
        self.ensure_collection(name);
        if let Some(primary_key) = &schema.primary_key {
            self.set_primary_key(name, primary_key)?;
        }
        for properties in &schema.indexes {
            self.create_index(name, properties, false)?;
        }
        for relationship in &schema.relationships {
            self.create_foreign_key(
                name,
                &relationship.target,
                &relationship.property,
                relationship.options,
            )?;
        }

        let mut constraints = Vec::new();
        for property in &schema.not_null {
            constraints.push(self.check_not_null(name, property));
        }
        for property in &schema.not_undefined {
            constraints.push(self.check_not_undefined(name, property));
        }
        for properties in &schema.unique {
            constraints.push(self.check_unique(name, properties)?);
        }

        let descriptor = self
            .describe(name)
            .ok_or_else(|| CoreError::invariant(format!("collection {name} vanished")))?;
        debug!(
            collection = name,
            constraints = constraints.len(),
            "registered collection"
        );
        Ok(Registration {
            descriptor,
            constraints,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;

    #[test]
    fn builder_registers_everything() {
        let store = Store::new();
        let registration = store
            .register_entity("Foo")
            .primary_key("id")
            .index(&["last", "first"])
            .unique(&["email"])
            .not_undefined("first")
            .check(&["age"], |v| v[0].as_integer().map_or(true, |n| n >= 0))
            .relationship("friends", "Bar", RelationshipOptions::new())
            .finish()
            .unwrap();

        let descriptor = &registration.descriptor;
        assert!(descriptor.index(&["first", "last"]).is_some());
        assert!(descriptor.index(&["email"]).is_some());
        assert_eq!(descriptor.relationship("friends").unwrap().target, "Bar");
        assert_eq!(registration.constraints.len(), 3);
        assert!(store.describe("Bar").is_some());

        let foo = |id: &str| Entity::new("Foo").with("id", id).with("first", "a");
        store.add_one(foo("1").with("email", "x")).unwrap();
        assert!(store.add_one(foo("2").with("email", "x")).is_err());
        assert!(store.add_one(foo("3").with("age", -1).with("email", "y")).is_err());
        assert!(store
            .add_one(Entity::new("Foo").with("id", "4").with("email", "z"))
            .is_err());
    }

    #[test]
    fn schema_from_json() {
        let schema: EntitySchema = serde_json::from_str(
            r#"{
                "name": "Foo",
                "primary_key": "id",
                "indexes": [["name"]],
                "relationships": [
                    {"property": "friends", "target": "Bar", "cascade": true}
                ]
            }"#,
        )
        .unwrap();
        assert!(schema.unique.is_empty());
        assert!(schema.relationships[0].options.cascade);
        assert!(!schema.relationships[0].options.delete_on_removal);

        let store = Store::new();
        let registration = store.apply_schema(&schema).unwrap();
        assert!(registration.constraints.is_empty());
        assert!(registration.descriptor.index(&["name"]).is_some());
    }

    #[test]
    fn empty_name_is_rejected() {
        let store = Store::new();
        assert!(store.apply_schema(&EntitySchema::default()).is_err());
        assert!(store.collection_names().is_empty());
    }

    #[test]
    fn builder_exposes_schema() {
        let store = Store::new();
        let builder = store.register_entity("Foo").primary_key("id").not_null("name");
        assert_eq!(builder.schema().not_null, vec!["name".to_string()]);
        assert_eq!(builder.schema().primary_key.as_deref(), Some("id"));
    }
}
