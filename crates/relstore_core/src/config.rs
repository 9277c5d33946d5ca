//! Store configuration.

/// Options controlling store behaviour.
///
/// Options can be supplied at construction and replaced at runtime with
/// [`Store::set_options`](crate::Store::set_options), for example to switch
/// constraint evaluation off around a bulk load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Skip evaluation of constraint predicates.
    ///
    /// Constraint triggers still fire but pass every change through.
    /// User-defined triggers are unaffected.
    pub disable_constraint_checks: bool,

    /// Emit a warning when a lookup has no matching index and falls back to
    /// a full collection scan.
    pub warn_on_scan: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            disable_constraint_checks: false,
            warn_on_scan: true,
        }
    }
}

impl StoreOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether constraint predicates are skipped.
    #[must_use]
    pub const fn disable_constraint_checks(mut self, value: bool) -> Self {
        self.disable_constraint_checks = value;
        self
    }

    /// Sets whether scan fallbacks are logged.
    #[must_use]
    pub const fn warn_on_scan(mut self, value: bool) -> Self {
        self.warn_on_scan = value;
        self
    }
}
