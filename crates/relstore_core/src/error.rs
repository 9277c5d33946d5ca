//! Error types for RelStore core.

use crate::types::TriggerId;
use relstore_codec::{CodecError, Value};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A constraint rejected a mutation.
    #[error(
        "{constraint} constraint failed on {collection} field(s): {} with values {}",
        .properties.join(", "),
        join_values(.values)
    )]
    Integrity {
        /// Kind of constraint that failed (`check`, `unique`, ...).
        constraint: String,
        /// Collection the mutation targeted.
        collection: String,
        /// Properties the constraint inspects.
        properties: Vec<String>,
        /// Offending values, in property order.
        values: Vec<Value>,
    },

    /// A query expected exactly one result and found none.
    #[error("no results found in {collection}")]
    NoResultsFound {
        /// Collection that was queried.
        collection: String,
    },

    /// A query expected exactly one result and found several.
    #[error("expected one result in {collection}, found {count}")]
    MultipleResultsFound {
        /// Collection that was queried.
        collection: String,
        /// Number of matches.
        count: usize,
    },

    /// An internal invariant was broken, such as a missing primary key.
    #[error("invariant violation: {message}")]
    InvariantViolation {
        /// Description of the violation.
        message: String,
    },

    /// No trigger is registered under this id.
    #[error("trigger not found: {id}")]
    TriggerNotFound {
        /// The unknown id.
        id: TriggerId,
    },

    /// The collection declares no relationship with this name.
    #[error("relationship not found: {collection}.{property}")]
    RelationshipNotFound {
        /// Owner collection.
        collection: String,
        /// Relationship property.
        property: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },

    /// An entity could not be converted to a typed model.
    #[error("invalid format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// Value codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl CoreError {
    /// Creates an integrity error.
    pub fn integrity(
        constraint: impl Into<String>,
        collection: impl Into<String>,
        properties: &[String],
        values: Vec<Value>,
    ) -> Self {
        Self::Integrity {
            constraint: constraint.into(),
            collection: collection.into(),
            properties: properties.to_vec(),
            values,
        }
    }

    /// Creates an invariant violation error.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates a relationship not found error.
    pub fn relationship_not_found(
        collection: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        Self::RelationshipNotFound {
            collection: collection.into(),
            property: property.into(),
        }
    }

    /// Returns true if a constraint rejected the operation.
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity { .. })
    }
}

fn join_values(values: &[Value]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
