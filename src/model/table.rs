use std::collections::HashMap;

use serde_json::Value;

use crate::manifest::Histogram;

/// A table's attributes and readiness state.
pub struct Table {
    pub schema: String,
    pub name: String,
    pub basename: String,

    pub has_sql: bool,
    pub has_data: bool,
    pub md_seen: bool,
    pub sql_seen: bool,
    pub has_triggers: bool,

    pub extension: String,
    pub chunked: bool,
    /// Monotonically non-decreasing count of chunks observed so far.
    pub num_chunks: u64,
    /// Whether the final chunk (last-marker naming, or the single unchunked
    /// data file) has been observed.
    pub last_chunk_seen: bool,
    /// Size in bytes per observed chunk index; `available_chunk_sizes[i]`
    /// is only meaningful for `i < num_chunks`.
    pub available_chunk_sizes: Vec<u64>,
    /// How many chunks have been handed out via `next_table_chunk`.
    pub chunks_consumed: u64,

    pub primary_index: String,
    pub options: HashMap<String, Value>,
    pub histograms: Vec<Histogram>,

    pub indexes: Vec<String>,
    pub indexes_done: bool,
    pub analyze_done: bool,
}

impl Table {
    pub fn new(schema: impl Into<String>, name: impl Into<String>, basename: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            basename: basename.into(),
            has_sql: true,
            has_data: true,
            md_seen: false,
            sql_seen: false,
            has_triggers: false,
            extension: "tsv".to_string(),
            chunked: false,
            num_chunks: 0,
            last_chunk_seen: false,
            available_chunk_sizes: Vec::new(),
            chunks_consumed: 0,
            primary_index: String::new(),
            options: HashMap::new(),
            histograms: Vec::new(),
            indexes: Vec::new(),
            indexes_done: false,
            analyze_done: false,
        }
    }

    /// `ready ⇔ (¬has_data ∨ md_seen) ∧ (¬has_sql ∨ sql_seen)`.
    pub fn ready(&self) -> bool {
        (!self.has_data || self.md_seen) && (!self.has_sql || self.sql_seen)
    }

    /// `data_done ⇔ last_chunk_seen ∧ chunks_consumed = num_chunks`.
    ///
    /// A table with `has_data == false` is trivially done: it never
    /// contributes to `tables_with_data`, and `last_chunk_seen`/`num_chunks`
    /// stay at their initial values, which also satisfy this formula
    /// (`false ∧ 0 = 0` would be false, so tables without data are handled
    /// specially here rather than relying on the formula alone).
    pub fn data_done(&self) -> bool {
        if !self.has_data {
            return true;
        }
        self.last_chunk_seen && self.chunks_consumed == self.num_chunks
    }

    /// Sum of the sizes of chunks observed but not yet handed out.
    pub fn bytes_available(&self) -> u64 {
        if self.chunks_consumed >= self.num_chunks {
            return 0;
        }
        self.available_chunk_sizes[self.chunks_consumed as usize..self.num_chunks as usize]
            .iter()
            .sum()
    }

    /// `has_data_available ⇔ chunks_consumed < num_chunks`.
    pub fn has_data_available(&self) -> bool {
        self.chunks_consumed < self.num_chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_requires_md_seen_only_when_data_is_present() {
        let mut t = Table::new("s", "t", "s@t");
        t.has_sql = false;
        assert!(!t.ready());
        t.md_seen = true;
        assert!(t.ready());
    }

    #[test]
    fn table_without_data_is_trivially_data_done() {
        let mut t = Table::new("s", "t", "s@t");
        t.has_data = false;
        assert!(t.data_done());
    }

    #[test]
    fn bytes_available_sums_unconsumed_chunks() {
        let mut t = Table::new("s", "t", "s@t");
        t.num_chunks = 3;
        t.available_chunk_sizes = vec![10, 20, 30];
        t.chunks_consumed = 1;
        assert_eq!(t.bytes_available(), 50);
        assert!(t.has_data_available());
    }

    #[test]
    fn data_done_requires_last_chunk_and_full_consumption() {
        let mut t = Table::new("s", "t", "s@t");
        t.num_chunks = 2;
        t.available_chunk_sizes = vec![10, 20];
        t.chunks_consumed = 2;
        assert!(!t.data_done()); // last_chunk_seen still false
        t.last_chunk_seen = true;
        assert!(t.data_done());
    }
}
