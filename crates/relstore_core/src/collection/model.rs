//! Strongly typed entities.

use crate::entity::Entity;
use crate::error::CoreResult;
use crate::schema::EntityBuilder;

/// A Rust type stored as entities of one collection.
///
/// Conversions go through [`Entity`]; the store never sees the Rust type.
/// [`Model::register`] replaces per-field annotations: it receives the
/// collection's builder and declares keys, indices, constraints and
/// relationships on it.
///
/// ```
/// use relstore_core::{CoreResult, Entity, EntityBuilder, Model, Store};
///
/// #[derive(Debug, PartialEq)]
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl Model for User {
///     const COLLECTION: &'static str = "User";
///
///     fn register(builder: EntityBuilder<'_>) -> EntityBuilder<'_> {
///         builder.primary_key("id").index(&["name"])
///     }
///
///     fn to_entity(&self) -> Entity {
///         Entity::new(Self::COLLECTION)
///             .with("id", self.id)
///             .with("name", self.name.as_str())
///     }
///
///     fn from_entity(entity: &Entity) -> CoreResult<Self> {
///         Ok(Self {
///             id: entity.integer("id")?,
///             name: entity.text("name")?.to_string(),
///         })
///     }
/// }
///
/// let store = Store::new();
/// let users = store.collection::<User>();
/// users.register().unwrap();
/// users.add(&User { id: 1, name: "ada".into() }).unwrap();
///
/// assert_eq!(users.get(1).unwrap().unwrap().name, "ada");
/// ```
pub trait Model: Sized {
    /// Name of the collection holding this type.
    const COLLECTION: &'static str;

    /// Declares the collection's keys, indices, constraints and
    /// relationships. The default declares nothing.
    fn register(builder: EntityBuilder<'_>) -> EntityBuilder<'_> {
        builder
    }

    /// Converts a value to an entity of [`Model::COLLECTION`].
    fn to_entity(&self) -> Entity;

    /// Converts a stored entity back.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidFormat`](crate::CoreError::InvalidFormat) when a
    /// property is missing or has the wrong type.
    fn from_entity(entity: &Entity) -> CoreResult<Self>;
}
