//! Typed collection handle.

use super::Model;
use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::relationship::RelationshipList;
use crate::schema::Registration;
use crate::store::Store;
use crate::types::TruncateOptions;
use relstore_codec::Value;
use std::marker::PhantomData;

/// Type-safe access to the collection of a [`Model`].
///
/// Obtained from [`Store::collection`]. Values are converted with
/// [`Model::to_entity`] on the way in and [`Model::from_entity`] on the
/// way out; everything else is delegated to the store.
pub struct TypedCollection<'s, T: Model> {
    store: &'s Store,
    _marker: PhantomData<fn() -> T>,
}

impl<'s, T: Model> TypedCollection<'s, T> {
    pub(crate) fn new(store: &'s Store) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    /// Returns the collection name.
    pub fn name(&self) -> &'static str {
        T::COLLECTION
    }

    /// Applies the model's declarations to the store.
    pub fn register(&self) -> CoreResult<Registration> {
        T::register(self.store.register_entity(T::COLLECTION)).finish()
    }

    /// Adds or replaces a value. Returns its primary key.
    pub fn add(&self, value: &T) -> CoreResult<Value> {
        self.store.add_one(self.entity(value)?)
    }

    /// Adds values one at a time, stopping at the first failure.
    pub fn add_all<'v, I>(&self, values: I) -> CoreResult<Vec<Value>>
    where
        I: IntoIterator<Item = &'v T>,
        T: 'v,
    {
        let entities = values
            .into_iter()
            .map(|value| self.entity(value))
            .collect::<CoreResult<Vec<_>>>()?;
        self.store.add_all(entities)
    }

    /// Gets a value by primary key.
    pub fn get(&self, key: impl Into<Value>) -> CoreResult<Option<T>> {
        self.store
            .find_one(T::COLLECTION, key)
            .map(|entity| T::from_entity(&entity))
            .transpose()
    }

    /// Returns every value in insertion order.
    pub fn all(&self) -> CoreResult<Vec<T>> {
        self.store
            .find_all(T::COLLECTION)
            .iter()
            .map(T::from_entity)
            .collect()
    }

    /// Returns the values matching `predicate`.
    pub fn filter<F>(&self, predicate: F) -> CoreResult<Vec<T>>
    where
        F: Fn(&T) -> bool,
    {
        Ok(self.all()?.into_iter().filter(|value| predicate(value)).collect())
    }

    /// Returns values whose `properties` equal `values`.
    pub fn find_by<S: AsRef<str>>(&self, properties: &[S], values: &[Value]) -> CoreResult<Vec<T>> {
        self.store
            .find_all_by(T::COLLECTION, properties, values)?
            .iter()
            .map(T::from_entity)
            .collect()
    }

    /// Returns the single value whose `properties` equal `values`.
    pub fn find_one_by<S: AsRef<str>>(&self, properties: &[S], values: &[Value]) -> CoreResult<T> {
        T::from_entity(&self.store.find_one_by(T::COLLECTION, properties, values)?)
    }

    /// Removes a value. Returns false if it was not stored.
    pub fn remove(&self, value: &T) -> CoreResult<bool> {
        self.store.remove_one(&self.entity(value)?)
    }

    /// Removes the value stored under `key`.
    pub fn remove_key(&self, key: impl Into<Value>) -> CoreResult<bool> {
        self.store.remove_by_key(T::COLLECTION, key)
    }

    /// Returns the number of stored values.
    pub fn count(&self) -> usize {
        self.store.count(T::COLLECTION)
    }

    /// Removes every value. See [`Store::truncate_collection`].
    pub fn truncate(&self, options: TruncateOptions) -> usize {
        self.store.truncate_collection(T::COLLECTION, options)
    }

    /// Returns the link list of `owner` under `property`.
    pub fn relationship(&self, owner: &T, property: &str) -> CoreResult<RelationshipList<'s>> {
        self.store.relationship(&self.entity(owner)?, property)
    }

    fn entity(&self, value: &T) -> CoreResult<Entity> {
        let entity = value.to_entity();
        if entity.collection() != T::COLLECTION {
            return Err(CoreError::invalid_format(format!(
                "model for {} produced an entity of {}",
                T::COLLECTION,
                entity.collection()
            )));
        }
        Ok(entity)
    }
}
