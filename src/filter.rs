//! The include/exclude policy for schemas and tables.
//!
//! Filtering is the caller's concern: this crate only consumes a predicate.
//! Skipped entities are never even created in the [`model`](crate::model)
//! tree, so a filtered-out table never shows up in a readiness check or a
//! work-queue handout.

/// Decides which schemas and tables the reader should track at all.
pub trait Filter: Send + Sync {
    /// Whether `schema` should be tracked.
    fn include_schema(&self, schema: &str) -> bool;

    /// Whether `schema.table` should be tracked.
    fn include_table(&self, schema: &str, table: &str) -> bool;
}

/// A [`Filter`] that includes everything. Useful as a default and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllFilter;

impl Filter for AllowAllFilter {
    fn include_schema(&self, _schema: &str) -> bool {
        true
    }

    fn include_table(&self, _schema: &str, _table: &str) -> bool {
        true
    }
}
