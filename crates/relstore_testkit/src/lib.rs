//! # RelStore Testkit
//!
//! Test utilities for RelStore.
//!
//! This crate provides:
//! - Store fixtures and ready-made scenarios
//! - Property-based generators for values, entities and operation sequences
//! - An integration harness that checks the store against a shadow model
//! - Stress helpers for concurrent access
//!
//! ## Usage
//!
//! ```
//! use relstore_testkit::prelude::*;
//!
//! with_store(|store| {
//!     store.set_primary_key("Foo", "id").unwrap();
//!     store.add_one(entity("Foo", r#"{"id": 1}"#)).unwrap();
//!     assert_eq!(store.count("Foo"), 1);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use stress::*;
