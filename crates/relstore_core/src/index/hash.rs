//! Hash index implementation.

use crate::entity::Entity;
use crate::index::key::{canonical_name, IndexKey};
use indexmap::{IndexMap, IndexSet};
use relstore_codec::{CodecResult, Value};

/// Equality index over one or more properties.
///
/// Maps an [`IndexKey`] to the primary keys of every entity whose projected
/// properties produced it. Buckets keep insertion order and never hold the
/// same primary key twice.
#[derive(Debug, Clone)]
pub struct HashIndex {
    /// Indexed properties in canonical order.
    properties: Vec<String>,
    /// Whether this is the collection's primary-key index.
    primary: bool,
    buckets: IndexMap<IndexKey, IndexSet<Value>>,
    entries: usize,
}

impl HashIndex {
    /// Creates an empty index. `properties` must already be canonical.
    pub fn new(properties: Vec<String>, primary: bool) -> Self {
        Self {
            properties,
            primary,
            buckets: IndexMap::new(),
            entries: 0,
        }
    }

    /// Returns the canonical name of this index.
    pub fn name(&self) -> String {
        canonical_name(&self.properties)
    }

    /// Returns the indexed properties.
    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    /// Returns true for the primary-key index.
    pub fn is_primary_key(&self) -> bool {
        self.primary
    }

    pub(crate) fn set_primary_key(&mut self, primary: bool) {
        self.primary = primary;
    }

    /// Computes the key an entity is filed under.
    pub fn key_for(&self, entity: &Entity) -> CodecResult<IndexKey> {
        IndexKey::of_projection(entity.project(&self.properties))
    }

    /// Files `primary_key` under `key`. Returns false if it was already there.
    pub fn insert(&mut self, key: IndexKey, primary_key: Value) -> bool {
        let added = self.buckets.entry(key).or_default().insert(primary_key);
        if added {
            self.entries += 1;
        }
        added
    }

    /// Removes `primary_key` from `key`'s bucket, dropping the bucket once empty.
    pub fn remove(&mut self, key: &IndexKey, primary_key: &Value) -> bool {
        let Some(bucket) = self.buckets.get_mut(key) else {
            return false;
        };
        if !bucket.shift_remove(primary_key) {
            return false;
        }
        self.entries -= 1;
        if bucket.is_empty() {
            self.buckets.shift_remove(key);
        }
        true
    }

    /// Returns the primary keys filed under `key`, in insertion order.
    pub fn lookup<'a>(&'a self, key: &IndexKey) -> impl Iterator<Item = &'a Value> + 'a {
        self.buckets.get(key).into_iter().flatten()
    }

    /// Returns true if `primary_key` is filed under `key`.
    pub fn contains(&self, key: &IndexKey, primary_key: &Value) -> bool {
        self.buckets
            .get(key)
            .is_some_and(|bucket| bucket.contains(primary_key))
    }

    /// Returns the total number of entries.
    pub fn len(&self) -> usize {
        self.entries
    }

    /// Returns true if the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Returns the number of distinct keys.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Removes every entry, keeping the definition.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.entries = 0;
    }

    /// Rebuilds the index from `(primary key, entity)` pairs.
    pub fn rebuild<'a, I>(&mut self, entities: I) -> CodecResult<()>
    where
        I: IntoIterator<Item = (&'a Value, &'a Entity)>,
    {
        let mut keyed = Vec::new();
        for (primary_key, entity) in entities {
            keyed.push((self.key_for(entity)?, primary_key.clone()));
        }
        self.clear();
        for (key, primary_key) in keyed {
            self.insert(key, primary_key);
        }
        Ok(())
    }
}
