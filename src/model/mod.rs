//! In-memory tree of `Dump -> Schema -> {Table, View}` entities with their
//! readiness flags.
//!
//! Schemas and tables are stored in [`slotmap`] slot maps so that
//! `tables_with_data` can hold a *non-owning* set of stable keys into the
//! table store without borrowing it: inserting a new table never invalidates
//! a key already held elsewhere, and a key can outlive any particular
//! borrow of the model. Views have no external weak index pointing at them,
//! so a `Schema` simply owns its `View`s directly.
//!
//! Each of `Dump`, `Schema`, `Table`, `View` implements the same informal
//! "rescan" contract: given the current directory listing, absorb every new
//! file that belongs to it and never re-read one it has already seen. The
//! [`scanner`](crate::scanner) module is what actually dispatches these in
//! pass order.

mod dump;
mod schema;
mod table;
mod view;

use std::collections::{HashMap, HashSet};

use slotmap::SlotMap;

pub use dump::{Dump, DumpStatus};
pub use schema::Schema;
pub use table::Table;
pub use view::View;

slotmap::new_key_type! {
    pub struct SchemaKey;
    pub struct TableKey;
}

/// Owns every schema and table record the reader has observed, plus the
/// weak `tables_with_data` index.
#[derive(Default)]
pub struct EntityModel {
    pub dump: Dump,
    schemas: SlotMap<SchemaKey, Schema>,
    tables: SlotMap<TableKey, Table>,
    schema_by_name: HashMap<String, SchemaKey>,
    table_key_by_name: HashMap<(String, String), TableKey>,
    /// Tables that currently have at least one chunk not yet handed out.
    /// A weak index: holding a key here does not keep the table alive (it
    /// cannot be removed anyway short of dropping the whole model), and
    /// inserting new tables never invalidates keys already in this set.
    pub tables_with_data: HashSet<TableKey>,
}

impl EntityModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_schema(&mut self, schema: Schema) -> SchemaKey {
        let name = schema.name.clone();
        let key = self.schemas.insert(schema);
        self.schema_by_name.insert(name, key);
        key
    }

    pub fn schema(&self, key: SchemaKey) -> &Schema {
        &self.schemas[key]
    }

    pub fn schema_mut(&mut self, key: SchemaKey) -> &mut Schema {
        &mut self.schemas[key]
    }

    pub fn schema_key(&self, name: &str) -> Option<SchemaKey> {
        self.schema_by_name.get(name).copied()
    }

    pub fn schema_by_name(&self, name: &str) -> Option<&Schema> {
        self.schema_key(name).map(|k| self.schema(k))
    }

    pub fn schema_keys(&self) -> impl Iterator<Item = SchemaKey> + '_ {
        self.schemas.keys()
    }

    pub fn schemas_iter(&self) -> impl Iterator<Item = (SchemaKey, &Schema)> {
        self.schemas.iter()
    }

    pub fn insert_table(&mut self, schema_key: SchemaKey, table: Table) -> TableKey {
        let name_key = (table.schema.clone(), table.name.clone());
        let key = self.tables.insert(table);
        self.table_key_by_name.insert(name_key, key);
        self.schemas[schema_key].table_keys.push(key);
        key
    }

    pub fn table(&self, key: TableKey) -> &Table {
        &self.tables[key]
    }

    pub fn table_mut(&mut self, key: TableKey) -> &mut Table {
        &mut self.tables[key]
    }

    pub fn table_key(&self, schema: &str, table: &str) -> Option<TableKey> {
        self.table_key_by_name
            .get(&(schema.to_string(), table.to_string()))
            .copied()
    }

    /// All tables in a schema, in the order they were first observed.
    pub fn tables_of(&self, schema_key: SchemaKey) -> impl Iterator<Item = (TableKey, &Table)> {
        self.schemas[schema_key]
            .table_keys
            .iter()
            .map(move |&k| (k, &self.tables[k]))
    }

    /// Iterate every table across every schema, in schema-then-table
    /// insertion order. Used by the [`WorkQueue`](crate::work_queue::WorkQueue)
    /// passes that must visit all tables looking for the first match.
    pub fn all_tables(&self) -> impl Iterator<Item = (SchemaKey, TableKey)> + '_ {
        self.schemas.iter().flat_map(|(schema_key, schema)| {
            schema
                .table_keys
                .iter()
                .map(move |&table_key| (schema_key, table_key))
        })
    }

    /// Borrow a schema and a table simultaneously. Sound because `schemas`
    /// and `tables` are distinct `SlotMap` fields: the splitter needs to
    /// mutate a table's `indexes` and its owning schema's `fk_queries` in
    /// the same call, without either holding a reference back into the
    /// other.
    pub fn schema_and_table_mut(&mut self, schema_key: SchemaKey, table_key: TableKey) -> (&mut Schema, &mut Table) {
        (&mut self.schemas[schema_key], &mut self.tables[table_key])
    }

    pub fn mark_table_has_data(&mut self, key: TableKey) {
        self.tables_with_data.insert(key);
    }

    /// Sum of `dump_size` over included tables: once the dump is
    /// `Complete`, sums the terminator's authoritative per-(schema, table)
    /// byte counts over only the tables actually present in this model -
    /// i.e. the ones that survived the `Filter` - rather than the
    /// terminator's unfiltered flat total. Falls back to
    /// [`Dump::total_data_size`] while still `Dumping`, when no terminator
    /// figures exist yet to filter.
    pub fn filtered_data_size(&self) -> u64 {
        if self.dump.status != DumpStatus::Complete {
            return self.dump.total_data_size();
        }

        self.all_tables()
            .map(|(_, table_key)| self.table(table_key))
            .map(|table| {
                self.dump
                    .table_data_size
                    .get(&table.schema)
                    .and_then(|tables| tables.get(&table.name))
                    .copied()
                    .unwrap_or(0)
            })
            .sum()
    }

    pub fn clear_table_has_data(&mut self, key: TableKey) {
        self.tables_with_data.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filtered_data_size_sums_only_included_tables_once_complete() {
        let mut model = EntityModel::new();
        let schema_key = model.insert_schema(Schema::new("s", "s"));
        model.insert_table(schema_key, Table::new("s", "kept", "s@kept"));
        // "excluded" was never inserted - the Filter dropped it - but the
        // terminator still reports bytes for it, as a real dumper would.

        model.dump.status = DumpStatus::Complete;
        model.dump.data_size = Some(999);
        let mut table_sizes = HashMap::new();
        let mut s_sizes = HashMap::new();
        s_sizes.insert("kept".to_string(), 100u64);
        s_sizes.insert("excluded".to_string(), 900u64);
        table_sizes.insert("s".to_string(), s_sizes);
        model.dump.table_data_size = table_sizes;

        assert_eq!(model.filtered_data_size(), 100);
    }

    #[test]
    fn filtered_data_size_falls_back_to_running_total_while_dumping() {
        let mut model = EntityModel::new();
        model.dump.dump_size = 42;
        assert_eq!(model.filtered_data_size(), 42);
    }
}
