//! Secondary indices.
//!
//! Every collection keeps one [`HashIndex`] per declared property set.
//! Indices are keyed by their canonical name (sorted property names joined
//! by commas), so `["b", "a"]` and `["a", "b"]` address the same index.

mod hash;
mod key;

pub use hash::HashIndex;
pub use key::{canonical_name, canonical_properties, normalize_query, IndexKey};
