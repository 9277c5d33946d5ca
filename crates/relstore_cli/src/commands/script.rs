//! Script format and execution.
//!
//! A script is a JSON document:
//!
//! ```json
//! {
//!   "collections": [
//!     {"name": "Bar", "primary_key": "id"},
//!     {"name": "Foo", "primary_key": "id", "unique": [["email"]],
//!      "relationships": [{"property": "friends", "target": "Bar", "cascade": true}]}
//!   ],
//!   "operations": [
//!     {"op": "insert", "collection": "Foo", "entity": {"id": "1", "email": "a@b"}},
//!     {"op": "link", "collection": "Foo", "key": "1", "property": "friends",
//!      "entity": {"id": "x"}},
//!     {"op": "unlink", "collection": "Foo", "key": "1", "property": "friends",
//!      "target_key": "x"},
//!     {"op": "remove", "collection": "Foo", "key": "1"},
//!     {"op": "truncate", "collection": "Bar", "cascade": false}
//!   ]
//! }
//! ```
//!
//! JSON numbers must be integers; objects become map values.

use relstore_core::{
    CoreError, Entity, EntitySchema, StatsSnapshot, Store, TruncateOptions, Value,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while loading or running a script.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The script file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// Script path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The script is not valid JSON or does not match the format.
    #[error("invalid script: {0}")]
    Parse(#[from] serde_json::Error),

    /// A collection declaration was rejected.
    #[error("collection {name}: {source}")]
    Schema {
        /// Collection name.
        name: String,
        /// Store error.
        source: CoreError,
    },

    /// An operation failed.
    #[error("operation {index} ({operation}): {source}")]
    Operation {
        /// Position in the operation list.
        index: usize,
        /// Description of the operation.
        operation: String,
        /// Store error.
        source: CoreError,
    },
}

/// A parsed script.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Script {
    /// Collections to register, in order.
    #[serde(default)]
    pub collections: Vec<EntitySchema>,
    /// Operations to apply, in order.
    #[serde(default)]
    pub operations: Vec<Operation>,
}

/// One scripted mutation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Operation {
    /// Add or replace an entity.
    Insert {
        /// Target collection.
        collection: String,
        /// Entity properties.
        entity: Value,
    },
    /// Remove an entity by primary key.
    Remove {
        /// Target collection.
        collection: String,
        /// Primary key.
        key: Value,
    },
    /// Append a target to an owner's relationship list.
    Link {
        /// Owner collection.
        collection: String,
        /// Owner primary key.
        key: Value,
        /// Relationship property.
        property: String,
        /// Target entity properties.
        entity: Value,
    },
    /// Remove the first occurrence of a target from an owner's list.
    Unlink {
        /// Owner collection.
        collection: String,
        /// Owner primary key.
        key: Value,
        /// Relationship property.
        property: String,
        /// Primary key of the target to unlink.
        target_key: Value,
    },
    /// Remove every entity of a collection.
    Truncate {
        /// Target collection.
        collection: String,
        /// Also truncate related collections.
        #[serde(default)]
        cascade: bool,
    },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert { collection, .. } => write!(f, "insert into {collection}"),
            Self::Remove { collection, key } => write!(f, "remove {collection} {key}"),
            Self::Link {
                collection,
                key,
                property,
                ..
            } => write!(f, "link {collection} {key}.{property}"),
            Self::Unlink {
                collection,
                key,
                property,
                target_key,
            } => write!(f, "unlink {target_key} from {collection} {key}.{property}"),
            Self::Truncate {
                collection,
                cascade,
            } => {
                write!(f, "truncate {collection}")?;
                if *cascade {
                    f.write_str(" cascade")?;
                }
                Ok(())
            }
        }
    }
}

impl Operation {
    /// Applies the operation to `store`.
    pub fn apply(&self, store: &Store) -> Result<(), CoreError> {
        match self {
            Self::Insert { collection, entity } => {
                store.add_one(Entity::from_value(collection.as_str(), entity.clone())?)?;
            }
            Self::Remove { collection, key } => {
                store.remove_by_key(collection, key.clone())?;
            }
            Self::Link {
                collection,
                key,
                property,
                entity,
            } => {
                let list = store.relationship_by_key(collection, key.clone(), property)?;
                let target = Entity::from_value(list.target(), entity.clone())?;
                list.push(target)?;
            }
            Self::Unlink {
                collection,
                key,
                property,
                target_key,
            } => {
                let list = store.relationship_by_key(collection, key.clone(), property)?;
                list.unlink(target_key.clone())?;
            }
            Self::Truncate {
                collection,
                cascade,
            } => {
                store.truncate_collection(collection, TruncateOptions::new().cascade(*cascade));
            }
        }
        Ok(())
    }
}

/// Snapshot of one collection after a run.
#[derive(Debug, Serialize)]
pub struct CollectionReport {
    /// Collection name.
    pub name: String,
    /// Primary-key property.
    pub primary_key: Option<String>,
    /// Stored entities in insertion order.
    pub entities: Vec<Entity>,
}

/// An operation that failed during a run.
#[derive(Debug, Serialize)]
pub struct Failure {
    /// Position in the operation list.
    pub index: usize,
    /// Description of the operation.
    pub operation: String,
    /// Error message.
    pub error: String,
}

/// Outcome of running a script.
#[derive(Debug, Serialize)]
pub struct Report {
    /// Number of operations applied successfully.
    pub applied: usize,
    /// Operations that failed, when running with keep-going.
    pub failures: Vec<Failure>,
    /// Every collection, in registration order.
    pub collections: Vec<CollectionReport>,
    /// Operation counters.
    pub stats: StatsSnapshot,
}

/// Reads and parses a script file.
pub fn load(path: &Path) -> Result<Script, ScriptError> {
    let text = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// Runs a script against `store`.
///
/// Without `keep_going` the first failing operation aborts the run. With
/// it, failures are recorded in the report and later operations still run.
/// Rejected collection declarations always abort.
pub fn execute(store: &Store, script: &Script, keep_going: bool) -> Result<Report, ScriptError> {
    for schema in &script.collections {
        store
            .apply_schema(schema)
            .map_err(|source| ScriptError::Schema {
                name: schema.name.clone(),
                source,
            })?;
    }

    let mut applied = 0;
    let mut failures = Vec::new();
    for (index, operation) in script.operations.iter().enumerate() {
        debug!(index, %operation, "applying operation");
        match operation.apply(store) {
            Ok(()) => applied += 1,
            Err(source) if keep_going => {
                warn!(index, %operation, error = %source, "operation failed");
                failures.push(Failure {
                    index,
                    operation: operation.to_string(),
                    error: source.to_string(),
                });
            }
            Err(source) => {
                return Err(ScriptError::Operation {
                    index,
                    operation: operation.to_string(),
                    source,
                })
            }
        }
    }

    Ok(Report {
        applied,
        failures,
        collections: snapshot(store),
        stats: store.stats(),
    })
}

fn snapshot(store: &Store) -> Vec<CollectionReport> {
    store
        .collection_names()
        .into_iter()
        .map(|name| CollectionReport {
            primary_key: store.describe(&name).and_then(|d| d.primary_key),
            entities: store.find_all(&name),
            name,
        })
        .collect()
}
