//! Work handout to the loader pool.
//!
//! `WorkQueue` is a thin view over an [`EntityModel`]: each `next_*` method
//! is a single linear scan that finds the first entity satisfying the
//! relevant readiness predicate, flips the "already emitted" flag, and
//! returns what the loader needs to act on it. None of these methods
//! block - the only I/O is the `Directory::open` call to hand back a file
//! handle for DDL/chunk content.

use std::collections::HashMap;
use std::io::Read;

use crate::classify;
use crate::directory::Directory;
use crate::manifest::Histogram;
use crate::model::{EntityModel, SchemaKey, TableKey};
use crate::scheduler;

/// One included table's DDL, paired with its opened script file.
pub struct TableDdl {
    pub table: String,
    pub file: Box<dyn Read + Send>,
}

/// One included view's DDL, paired with its opened `CREATE VIEW` script and
/// the opened placeholder-table script that must run before it.
pub struct ViewDdl {
    pub view: String,
    pub file: Box<dyn Read + Send>,
    pub pre_file: Box<dyn Read + Send>,
}

/// Result of [`WorkQueue::next_schema`].
pub struct SchemaWork {
    pub schema: String,
    pub tables: Vec<TableDdl>,
    pub views: Vec<ViewDdl>,
    /// Whether the schema itself has a DDL script (`<basename>.sql`) to run
    /// before the per-table/view scripts. Mirrors `Schema::has_sql`.
    pub has_ddl: bool,
    pub schema_script: Option<Box<dyn Read + Send>>,
}

/// Result of [`WorkQueue::next_table_chunk`].
pub struct ChunkWork {
    pub schema: String,
    pub table: String,
    pub chunked: bool,
    pub chunk_index: u64,
    /// Total chunk count once known (`last_chunk_seen`), else `0` meaning
    /// "more may still arrive".
    pub chunks_total: u64,
    pub file: Box<dyn Read + Send>,
    pub chunk_size: u64,
    pub options: HashMap<String, serde_json::Value>,
}

/// Result of [`WorkQueue::next_deferred_index`].
pub struct DeferredIndexWork {
    pub schema: String,
    pub table: String,
    pub indexes: Vec<String>,
}

/// Result of [`WorkQueue::next_table_analyze`].
pub struct AnalyzeWork {
    pub schema: String,
    pub table: String,
    pub histograms: Vec<Histogram>,
}

/// Identifies a table by its `schema.table` pair, the key the caller uses
/// in its own `in_flight`/`load_finished` bookkeeping.
pub type TableId = (String, String);

pub struct WorkQueue;

impl WorkQueue {
    /// Returns the first schema that is `ready` and has not yet had its DDL
    /// handed out, opening every included table's and view's DDL script
    /// along the way. Sets `sql_done` so the schema is never re-emitted.
    pub fn next_schema(
        model: &mut EntityModel,
        dir: &dyn Directory,
    ) -> std::io::Result<Option<SchemaWork>> {
        let schema_key = match Self::find_ready_unemitted_schema(model) {
            Some(key) => key,
            None => return Ok(None),
        };

        let schema_basename = model.schema(schema_key).basename.clone();
        let schema_name = model.schema(schema_key).name.clone();
        let has_ddl = model.schema(schema_key).has_sql;

        let schema_script = if has_ddl {
            let name = classify::schema_script_name(&schema_basename);
            Some(dir.open(&name)?)
        } else {
            None
        };

        let mut tables = Vec::new();
        for (_, table) in model.tables_of(schema_key) {
            if !table.has_sql {
                continue;
            }
            let name = classify::table_script_name(&schema_basename, &table.basename);
            let file = dir.open(&name)?;
            tables.push(TableDdl {
                table: table.name.clone(),
                file,
            });
        }

        let mut views = Vec::new();
        for view in &model.schema(schema_key).views {
            let name = classify::table_script_name(&schema_basename, &view.basename);
            let file = dir.open(&name)?;
            let pre_name = classify::view_pre_script_name(&schema_basename, &view.basename);
            let pre_file = dir.open(&pre_name)?;
            views.push(ViewDdl {
                view: view.name.clone(),
                file,
                pre_file,
            });
        }

        model.schema_mut(schema_key).sql_done = true;

        Ok(Some(SchemaWork {
            schema: schema_name,
            tables,
            views,
            has_ddl,
            schema_script,
        }))
    }

    fn find_ready_unemitted_schema(model: &EntityModel) -> Option<SchemaKey> {
        model.schema_keys().find(|&key| {
            let schema = model.schema(key);
            !schema.sql_done && schema.ready(model.tables_of(key).map(|(_, t)| t))
        })
    }

    /// Delegates to [`scheduler::schedule_chunk_proportionally`] to pick
    /// among `tables_with_data`, then hands out that table's next chunk.
    ///
    /// `in_flight` is the caller-maintained snapshot of bytes currently
    /// dispatched but not yet reported complete, keyed the same way the
    /// scheduler expects: by [`TableKey`].
    pub fn next_table_chunk(
        model: &mut EntityModel,
        dir: &dyn Directory,
        in_flight: &HashMap<TableKey, u64>,
    ) -> std::io::Result<Option<ChunkWork>> {
        let candidates: Vec<(TableKey, u64)> = model
            .tables_with_data
            .iter()
            .map(|&key| (key, model.table(key).bytes_available()))
            .collect();

        let table_key = match scheduler::schedule_chunk_proportionally(in_flight, &candidates) {
            Some(key) => key,
            None => return Ok(None),
        };

        let schema_key = model
            .schema_key(&model.table(table_key).schema)
            .expect("table's schema must exist");
        let schema_basename = model.schema(schema_key).basename.clone();

        let table = model.table_mut(table_key);
        let chunk_index = table.chunks_consumed;
        let is_last = chunk_index + 1 == table.num_chunks && table.last_chunk_seen;
        let chunk_size = table.available_chunk_sizes[chunk_index as usize];

        let file_name = if table.chunked {
            classify::table_data_name_chunked(&schema_basename, &table.basename, &table.extension, chunk_index, is_last)
        } else {
            classify::table_data_name_unchunked(&schema_basename, &table.basename, &table.extension)
        };
        let file = dir.open(&file_name)?;

        let chunks_total = if table.last_chunk_seen { table.num_chunks } else { 0 };
        table.chunks_consumed += 1;

        let work = ChunkWork {
            schema: table.schema.clone(),
            table: table.name.clone(),
            chunked: table.chunked,
            chunk_index,
            chunks_total,
            file,
            chunk_size,
            options: table.options.clone(),
        };

        if !model.table(table_key).has_data_available() {
            model.clear_table_has_data(table_key);
        }

        Ok(Some(work))
    }

    /// Returns the first table whose data is fully loaded, whose indexes
    /// have not yet been handed out, and for which `load_finished` reports
    /// every dispatched chunk as complete.
    pub fn next_deferred_index(
        model: &mut EntityModel,
        load_finished: impl Fn(&TableId) -> bool,
    ) -> Option<DeferredIndexWork> {
        let table_key = model.all_tables().map(|(_, t)| t).find(|&key| {
            let table = model.table(key);
            if table.indexes_done || !table.data_done() {
                return false;
            }
            load_finished(&(table.schema.clone(), table.name.clone()))
        })?;

        let table = model.table_mut(table_key);
        table.indexes_done = true;
        let indexes = std::mem::take(&mut table.indexes);

        Some(DeferredIndexWork {
            schema: table.schema.clone(),
            table: table.name.clone(),
            indexes,
        })
    }

    /// Returns the first table whose data and deferred indexes are both
    /// done but which has not yet been analyzed.
    pub fn next_table_analyze(model: &mut EntityModel) -> Option<AnalyzeWork> {
        let table_key = model.all_tables().map(|(_, t)| t).find(|&key| {
            let table = model.table(key);
            table.data_done() && table.indexes_done && !table.analyze_done
        })?;

        let table = model.table_mut(table_key);
        table.analyze_done = true;

        Some(AnalyzeWork {
            schema: table.schema.clone(),
            table: table.name.clone(),
            histograms: table.histograms.clone(),
        })
    }

    /// `data_available ⇔ tables_with_data ≠ ∅`.
    pub fn data_available(model: &EntityModel) -> bool {
        !model.tables_with_data.is_empty()
    }

    /// `work_available ⇔ ∃ table with data_done ∧ ¬analyze_done`.
    pub fn work_available(model: &EntityModel) -> bool {
        model
            .all_tables()
            .map(|(_, t)| t)
            .any(|key| {
                let table = model.table(key);
                table.data_done() && !table.analyze_done
            })
    }
}
