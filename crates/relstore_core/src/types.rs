//! Core type definitions for RelStore.

use serde::Serialize;
use std::fmt;

/// Identifier of a registered trigger.
///
/// Trigger ids are store-scoped, monotonically increasing and never reused,
/// even after the trigger is dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TriggerId(pub u64);

impl TriggerId {
    /// Creates a new trigger ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the following ID.
    #[must_use]
    pub(crate) const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trigger:{}", self.0)
    }
}

/// Options for [`Store::truncate_collection`](crate::Store::truncate_collection).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TruncateOptions {
    /// Also truncate every collection reachable through declared relationships.
    pub cascade: bool,
}

impl TruncateOptions {
    /// Truncate only the named collection.
    #[must_use]
    pub const fn new() -> Self {
        Self { cascade: false }
    }

    /// Sets whether related collections are truncated too.
    #[must_use]
    pub const fn cascade(mut self, value: bool) -> Self {
        self.cascade = value;
        self
    }
}
