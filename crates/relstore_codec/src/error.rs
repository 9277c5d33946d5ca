//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while encoding, hashing or converting values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Float values cannot be represented.
    #[error("float values are not supported: {value}")]
    FloatForbidden {
        /// Textual form of the rejected number.
        value: String,
    },

    /// An unsigned number does not fit in a signed 64-bit integer.
    #[error("integer {value} is out of range")]
    IntegerOverflow {
        /// The rejected number.
        value: u64,
    },

    /// The value nests deeper than the encoder allows.
    #[error("value nesting exceeds the limit of {limit}")]
    NestingTooDeep {
        /// Maximum supported depth.
        limit: usize,
    },

    /// A map key of this type cannot be converted.
    #[error("unsupported map key type: {type_name}")]
    UnsupportedKey {
        /// Type name of the rejected key.
        type_name: String,
    },
}

impl CodecError {
    /// Create a float-forbidden error.
    pub fn float_forbidden(value: f64) -> Self {
        Self::FloatForbidden {
            value: value.to_string(),
        }
    }

    /// Create an unsupported key error.
    pub fn unsupported_key(type_name: impl Into<String>) -> Self {
        Self::UnsupportedKey {
            type_name: type_name.into(),
        }
    }
}
