//! Handle over one owner's link list.

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::store::{Store, StoreState};
use relstore_codec::Value;
use std::collections::HashSet;
use tracing::debug;

/// An edit of one owner's link list.
#[derive(Debug)]
pub(crate) enum LinkChange {
    Push(Vec<Entity>),
    Pop,
    Splice {
        start: usize,
        delete_count: usize,
        insert: Vec<Entity>,
    },
    Set {
        index: usize,
        entity: Entity,
    },
    Replace(Vec<Entity>),
    Unlink(Value),
}

/// The ordered targets one owner links to through one relationship.
///
/// Every edit is a single store mutation. New targets are added to the
/// target collection first, through the normal insert path, so triggers and
/// constraints apply and a rejected target leaves the list untouched. Then
/// the list is rewritten. A batch of targets is added all or nothing: if one
/// is rejected, the ones already written are reverted. Finally, if the relationship deletes on removal,
/// targets no longer listed are removed from the store.
///
/// Reads resolve keys against the target collection and skip targets that
/// have since been removed.
///
/// ```
/// use relstore_core::{Entity, RelationshipOptions, Store};
///
/// let store = Store::new();
/// store.set_primary_key("Foo", "id").unwrap();
/// store.set_primary_key("Bar", "id").unwrap();
/// store
///     .create_foreign_key("Foo", "Bar", "friends", RelationshipOptions::new())
///     .unwrap();
///
/// let owner = Entity::new("Foo").with("id", "f");
/// store.add_one(owner.clone()).unwrap();
///
/// let friends = store.relationship(&owner, "friends").unwrap();
/// friends.push(Entity::new("Bar").with("id", "b")).unwrap();
/// assert_eq!(friends.len(), 1);
/// assert_eq!(store.count("Bar"), 1);
/// ```
#[derive(Debug, Clone)]
pub struct RelationshipList<'s> {
    store: &'s Store,
    collection: String,
    owner: Value,
    property: String,
    target: String,
}

impl<'s> RelationshipList<'s> {
    /// Owner collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Primary key of the owner.
    pub fn owner_key(&self) -> &Value {
        &self.owner
    }

    /// Relationship property.
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Target collection.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Keys of the linked targets that still exist, in list order.
    pub fn keys(&self) -> Vec<Value> {
        let state = self.store.state.read();
        live_keys(&state, &self.collection, &self.property, &self.target, &self.owner)
    }

    /// The linked targets, in list order.
    pub fn entities(&self) -> Vec<Entity> {
        let state = self.store.state.read();
        let keys = live_keys(&state, &self.collection, &self.property, &self.target, &self.owner);
        resolve(&state, &self.target, &keys)
    }

    /// Number of linked targets that still exist.
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    /// Returns true if no existing target is linked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a target, adding it to the target collection.
    pub fn push(&self, entity: Entity) -> CoreResult<()> {
        self.apply(LinkChange::Push(vec![entity])).map(drop)
    }

    /// Appends several targets.
    pub fn extend<I>(&self, entities: I) -> CoreResult<()>
    where
        I: IntoIterator<Item = Entity>,
    {
        self.apply(LinkChange::Push(entities.into_iter().collect()))
            .map(drop)
    }

    /// Unlinks the last target and returns it.
    pub fn pop(&self) -> CoreResult<Option<Entity>> {
        Ok(self.apply(LinkChange::Pop)?.into_iter().next())
    }

    /// Removes `delete_count` targets starting at `start` and inserts
    /// `insert` in their place. Returns the unlinked targets.
    ///
    /// `start` and `delete_count` are clamped to the list length.
    pub fn splice<I>(&self, start: usize, delete_count: usize, insert: I) -> CoreResult<Vec<Entity>>
    where
        I: IntoIterator<Item = Entity>,
    {
        self.apply(LinkChange::Splice {
            start,
            delete_count,
            insert: insert.into_iter().collect(),
        })
    }

    /// Puts a target at `index` and returns the one it displaced.
    ///
    /// `index` may equal the length, which appends.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidOperation`] if `index` is past the end.
    pub fn set(&self, index: usize, entity: Entity) -> CoreResult<Option<Entity>> {
        Ok(self
            .apply(LinkChange::Set { index, entity })?
            .into_iter()
            .next())
    }

    /// Replaces the whole list. Returns the previous targets.
    pub fn replace<I>(&self, entities: I) -> CoreResult<Vec<Entity>>
    where
        I: IntoIterator<Item = Entity>,
    {
        self.apply(LinkChange::Replace(entities.into_iter().collect()))
    }

    /// Unlinks every target. Returns the previous targets.
    pub fn clear(&self) -> CoreResult<Vec<Entity>> {
        self.apply(LinkChange::Replace(Vec::new()))
    }

    /// Unlinks the first occurrence of the target stored under `key` and
    /// returns it.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidOperation`] if that target is not listed.
    pub fn unlink(&self, key: impl Into<Value>) -> CoreResult<Entity> {
        self.apply(LinkChange::Unlink(key.into().into_canonical()))?
            .into_iter()
            .next()
            .ok_or_else(|| {
                CoreError::invariant(format!(
                    "unlinked target of {} {}.{} could not be resolved",
                    self.collection, self.owner, self.property
                ))
            })
    }

    fn apply(&self, change: LinkChange) -> CoreResult<Vec<Entity>> {
        let mut state = self.store.state.write();
        self.store
            .apply_link_change(&mut state, &self.collection, &self.owner, &self.property, change)
    }
}

impl Store {
    /// Returns the link list of `owner` under the relationship `property`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::RelationshipNotFound`] if the owner's collection
    ///   declares no such relationship
    /// - [`CoreError::InvariantViolation`] if the owner has no valid
    ///   primary key
    pub fn relationship(&self, owner: &Entity, property: &str) -> CoreResult<RelationshipList<'_>> {
        let key = {
            let state = self.state.read();
            let collection = state.collection(owner.collection()).ok_or_else(|| {
                CoreError::relationship_not_found(owner.collection(), property)
            })?;
            collection.key_of(owner)?
        };
        self.relationship_by_key(owner.collection(), key, property)
    }

    /// Returns the link list of the owner stored under `key`.
    pub fn relationship_by_key(
        &self,
        collection: &str,
        key: impl Into<Value>,
        property: &str,
    ) -> CoreResult<RelationshipList<'_>> {
        let state = self.state.read();
        let target = state
            .collection(collection)
            .and_then(|c| c.relationships.get(property))
            .map(|r| r.target.clone())
            .ok_or_else(|| CoreError::relationship_not_found(collection, property))?;
        Ok(RelationshipList {
            store: self,
            collection: collection.to_string(),
            owner: key.into().into_canonical(),
            property: property.to_string(),
            target,
        })
    }

    /// Applies one list edit under the write lock. Returns the targets the
    /// edit displaced, resolved before any of them is removed.
    pub(crate) fn apply_link_change(
        &self,
        state: &mut StoreState,
        collection: &str,
        owner: &Value,
        property: &str,
        change: LinkChange,
    ) -> CoreResult<Vec<Entity>> {
        let Some(owners) = state.collection(collection) else {
            return Err(CoreError::relationship_not_found(collection, property));
        };
        if !owners.entities.contains_key(owner) {
            return Err(CoreError::invalid_operation(format!(
                "{collection} {owner} is not stored"
            )));
        }
        let Some(relationship) = owners.relationships.get(property) else {
            return Err(CoreError::relationship_not_found(collection, property));
        };
        let target = relationship.target.clone();
        let delete_on_removal = relationship.options.delete_on_removal;
        let old = live_keys(state, collection, property, &target, owner);

        let mut new = old.clone();
        let displaced: Vec<Value> = match change {
            LinkChange::Push(entities) => {
                new.extend(self.add_targets(state, &target, entities)?);
                Vec::new()
            }
            LinkChange::Pop => new.pop().into_iter().collect(),
            LinkChange::Splice {
                start,
                delete_count,
                insert,
            } => {
                let start = start.min(new.len());
                let end = start.saturating_add(delete_count).min(new.len());
                let inserted = self.add_targets(state, &target, insert)?;
                new.splice(start..end, inserted).collect()
            }
            LinkChange::Set { index, entity } => {
                if index > new.len() {
                    return Err(CoreError::invalid_operation(format!(
                        "index {index} is out of bounds for {collection}.{property} of length {}",
                        new.len()
                    )));
                }
                check_target(&entity, &target)?;
                let key = self.add_locked(state, entity)?;
                if index == new.len() {
                    new.push(key);
                    Vec::new()
                } else {
                    vec![std::mem::replace(&mut new[index], key)]
                }
            }
            LinkChange::Replace(entities) => {
                new = self.add_targets(state, &target, entities)?;
                old.clone()
            }
            LinkChange::Unlink(key) => {
                let Some(index) = new.iter().position(|listed| *listed == key) else {
                    return Err(CoreError::invalid_operation(format!(
                        "{target} {key} is not linked from {collection} {owner}.{property}"
                    )));
                };
                vec![new.remove(index)]
            }
        };
        let displaced = resolve(state, &target, &displaced);

        let kept: HashSet<&Value> = new.iter().collect();
        let mut unlinked: Vec<Value> = Vec::new();
        for key in &old {
            if !kept.contains(key) && !unlinked.contains(key) {
                unlinked.push(key.clone());
            }
        }

        let Some(relationship) = state
            .collection_mut(collection)
            .and_then(|c| c.relationships.get_mut(property))
        else {
            return Err(CoreError::relationship_not_found(collection, property));
        };
        if new.is_empty() {
            relationship.links.shift_remove(owner);
        } else {
            relationship.links.insert(owner.clone(), new);
        }
        debug!(collection, %owner, property, unlinked = unlinked.len(), "rewrote link list");

        if delete_on_removal {
            for key in &unlinked {
                self.remove_locked(state, &target, key)?;
            }
        }
        Ok(displaced)
    }

    fn add_targets(
        &self,
        state: &mut StoreState,
        target: &str,
        entities: Vec<Entity>,
    ) -> CoreResult<Vec<Value>> {
        for entity in &entities {
            check_target(entity, target)?;
        }
        let mut written = Vec::with_capacity(entities.len());
        for entity in entities {
            match self.write_locked(state, entity) {
                Ok(change) => written.push(change),
                Err(err) => {
                    for change in written.iter().rev() {
                        Self::undo_write(state, change)?;
                    }
                    debug!(collection = target, reverted = written.len(), error = %err, "rejected link batch");
                    return Err(err);
                }
            }
        }
        for change in &written {
            self.finish_write(state, change);
        }
        Ok(written.into_iter().map(|change| change.key).collect())
    }
}

fn check_target(entity: &Entity, target: &str) -> CoreResult<()> {
    if entity.collection() != target {
        return Err(CoreError::invalid_operation(format!(
            "cannot link {} entity into a list of {target}",
            entity.collection()
        )));
    }
    Ok(())
}

/// Listed keys whose target still exists.
fn live_keys(
    state: &StoreState,
    collection: &str,
    property: &str,
    target: &str,
    owner: &Value,
) -> Vec<Value> {
    let Some(relationship) = state
        .collection(collection)
        .and_then(|c| c.relationships.get(property))
    else {
        return Vec::new();
    };
    let Some(targets) = state.collection(target) else {
        return Vec::new();
    };
    relationship
        .targets(owner)
        .iter()
        .filter(|key| targets.entities.contains_key(*key))
        .cloned()
        .collect()
}

fn resolve(state: &StoreState, target: &str, keys: &[Value]) -> Vec<Entity> {
    let Some(targets) = state.collection(target) else {
        return Vec::new();
    };
    keys.iter()
        .filter_map(|key| targets.entities.get(key))
        .cloned()
        .collect()
}
