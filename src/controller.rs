//! `open()` / `rescan()` lifecycle and the shared handle worker threads call
//! back into.
//!
//! The core itself is single-threaded cooperative: every mutation of the
//! [`EntityModel`] happens while holding `inner`'s lock. Workers run on their
//! own threads and call [`DumpReader::next_table_chunk`] and friends
//! concurrently, serialized through the `Mutex`.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};

use log::info;

use crate::directory::{listing_from, Directory};
use crate::error::DumpReaderError;
use crate::filter::Filter;
use crate::manifest::RootManifest;
use crate::model::{DumpStatus, EntityModel, Schema};
use crate::scanner::Scanner;
use crate::splitter;
use crate::work_queue::{AnalyzeWork, ChunkWork, DeferredIndexWork, SchemaWork, TableId, WorkQueue};

struct Inner {
    dir: Box<dyn Directory>,
    filter: Box<dyn Filter>,
    model: EntityModel,
}

/// Handle on an open dump. Cheap to clone - every clone shares the same
/// underlying model through an `Arc<Mutex<_>>`, so a pool of loader threads
/// can each hold a clone and call the `next_*` methods concurrently.
#[derive(Clone)]
pub struct DumpReader {
    inner: Arc<Mutex<Inner>>,
}

impl DumpReader {
    /// Parse the root manifest, create shells for every included schema,
    /// and perform one full rescan (which also probes the terminator:
    /// present and well-formed transitions the dump straight to
    /// `COMPLETE`, absent leaves it `DUMPING`).
    pub fn open(dir: Box<dyn Directory>, filter: Box<dyn Filter>) -> Result<Self, DumpReaderError> {
        let listing = list(dir.as_ref())?;

        let raw = dir.read_to_string("@.json").map_err(|source| DumpReaderError::Io {
            file: "@.json".to_string(),
            source,
        })?;
        let manifest: RootManifest =
            serde_json::from_str(&raw).map_err(|source| DumpReaderError::MalformedManifest {
                file: "@.json".to_string(),
                source,
            })?;

        let mut model = EntityModel::new();
        model.dump.dump_version = manifest.version.clone();
        model.dump.server_version = manifest.server_version.clone();
        model.dump.default_charset = manifest.default_character_set.clone();
        model.dump.gtid_executed = manifest.gtid_executed.clone();
        model.dump.tz_utc = manifest.tz_utc;
        model.dump.mds_compatibility = manifest.mds_compatibility;

        for schema_name in &manifest.schemas {
            if !filter.include_schema(schema_name) {
                continue;
            }
            let basename = manifest
                .basenames
                .get(schema_name)
                .cloned()
                .unwrap_or_else(|| schema_name.clone());
            model.insert_schema(Schema::new(schema_name.clone(), basename));
        }

        Scanner::rescan(&mut model, dir.as_ref(), filter.as_ref(), &listing)?;

        info!(
            "opened dump at '{}': {} schemas, status = {:?}",
            dir.full_path(),
            manifest.schemas.len(),
            model.dump.status
        );

        Ok(Self {
            inner: Arc::new(Mutex::new(Inner { dir, filter, model })),
        })
    }

    /// Re-list the directory and absorb whatever is new. Idempotent: a
    /// rescan of an unchanged listing flips no flags and produces no new
    /// work.
    pub fn rescan(&self) -> Result<(), DumpReaderError> {
        let mut guard = self.inner.lock().unwrap();
        let listing = list(guard.dir.as_ref())?;
        let Inner { dir, filter, model } = &mut *guard;
        Scanner::rescan(model, dir.as_ref(), filter.as_ref(), &listing)
    }

    pub fn status(&self) -> DumpStatus {
        self.inner.lock().unwrap().model.dump.status
    }

    pub fn is_complete(&self) -> bool {
        self.status() == DumpStatus::Complete
    }

    /// Total data size observed so far, counting only schemas and tables
    /// that survived the `Filter`: once complete, the terminator's
    /// authoritative per-table byte counts summed over just the included
    /// tables; while still dumping, the running total of chunk bytes
    /// observed so far.
    pub fn total_data_size(&self) -> u64 {
        self.inner.lock().unwrap().model.filtered_data_size()
    }

    /// The dump's whole-text preamble script (`@.sql`), once observed.
    /// Empty until then.
    pub fn begin_script(&self) -> String {
        self.inner.lock().unwrap().model.dump.begin_script().to_string()
    }

    /// The dump's whole-text postamble script (`@.post.sql`), once observed.
    /// Empty until then.
    pub fn end_script(&self) -> String {
        self.inner.lock().unwrap().model.dump.end_script().to_string()
    }

    /// The dump's whole-text users script (`@.users.sql`), once observed.
    /// Empty until then.
    pub fn users_script(&self) -> String {
        self.inner.lock().unwrap().model.dump.users_script().to_string()
    }

    pub fn next_schema(&self) -> io::Result<Option<SchemaWork>> {
        let mut guard = self.inner.lock().unwrap();
        let Inner { dir, model, .. } = &mut *guard;
        WorkQueue::next_schema(model, dir.as_ref())
    }

    /// `in_flight` is the caller-maintained snapshot of bytes currently
    /// dispatched but not yet reported complete, keyed by `(schema, table)`.
    pub fn next_table_chunk(&self, in_flight: &HashMap<TableId, u64>) -> io::Result<Option<ChunkWork>> {
        let mut guard = self.inner.lock().unwrap();
        let Inner { dir, model, .. } = &mut *guard;

        let mut keyed = HashMap::with_capacity(in_flight.len());
        for ((schema, table), &bytes) in in_flight {
            if let Some(key) = model.table_key(schema, table) {
                *keyed.entry(key).or_insert(0u64) += bytes;
            }
        }

        WorkQueue::next_table_chunk(model, dir.as_ref(), &keyed)
    }

    /// `load_finished` is supplied by the caller and must return `true`
    /// only once every chunk dispatched for that table has been reported
    /// complete.
    pub fn next_deferred_index(&self, load_finished: impl Fn(&TableId) -> bool) -> Option<DeferredIndexWork> {
        let mut guard = self.inner.lock().unwrap();
        WorkQueue::next_deferred_index(&mut guard.model, load_finished)
    }

    pub fn next_table_analyze(&self) -> Option<AnalyzeWork> {
        let mut guard = self.inner.lock().unwrap();
        WorkQueue::next_table_analyze(&mut guard.model)
    }

    pub fn data_available(&self) -> bool {
        WorkQueue::data_available(&self.inner.lock().unwrap().model)
    }

    pub fn work_available(&self) -> bool {
        WorkQueue::work_available(&self.inner.lock().unwrap().model)
    }

    /// Record the post-parse index/constraint list for `schema.table`,
    /// splitting out `FOREIGN KEY` constraints into the schema's deferred
    /// `fk_queries`. Returns `MissingReferent` if either name is unknown -
    /// a programmer error on the loader's side.
    pub fn add_deferred_indexes(
        &self,
        schema: &str,
        table: &str,
        indexes: Vec<String>,
    ) -> Result<(), DumpReaderError> {
        let mut guard = self.inner.lock().unwrap();
        let model = &mut guard.model;

        let schema_key = model.schema_key(schema).ok_or_else(|| DumpReaderError::MissingReferent {
            schema: schema.to_string(),
            table: None,
        })?;
        let table_key = model
            .table_key(schema, table)
            .ok_or_else(|| DumpReaderError::MissingReferent {
                schema: schema.to_string(),
                table: Some(table.to_string()),
            })?;

        let (schema_rec, table_rec) = model.schema_and_table_mut(schema_key, table_key);
        table_rec.indexes = indexes;
        splitter::add_deferred_indexes(schema_rec, &mut table_rec.indexes);

        Ok(())
    }

    /// The schema-global FK constraints accumulated so far, ready to be
    /// applied once every table in `schema` has finished loading and
    /// indexing. Empty while the schema's tables are still loading.
    pub fn fk_queries(&self, schema: &str) -> Vec<String> {
        let guard = self.inner.lock().unwrap();
        guard
            .model
            .schema_by_name(schema)
            .map(|s| s.fk_queries.clone())
            .unwrap_or_default()
    }
}

fn list(dir: &dyn Directory) -> Result<crate::directory::Listing, DumpReaderError> {
    let files = dir.list_files().map_err(|source| DumpReaderError::Io {
        file: dir.full_path(),
        source,
    })?;
    Ok(listing_from(files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::LocalDirectory;
    use crate::filter::AllowAllFilter;

    fn write(dir: &std::path::Path, name: &str, contents: &[u8]) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn open_without_terminator_is_dumping() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "@.json", br#"{"schemas":["s"]}"#);
        write(tmp.path(), "s.json", br#"{"tables":[],"views":[]}"#);

        let reader = DumpReader::open(
            Box::new(LocalDirectory::new(tmp.path())),
            Box::new(AllowAllFilter),
        )
        .unwrap();

        assert_eq!(reader.status(), DumpStatus::Dumping);
    }

    #[test]
    fn open_with_terminator_and_no_schemas_is_complete() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "@.json", br#"{"schemas":[]}"#);
        write(
            tmp.path(),
            "@.done.json",
            br#"{"dataBytes":0,"tableDataBytes":{}}"#,
        );

        let reader = DumpReader::open(
            Box::new(LocalDirectory::new(tmp.path())),
            Box::new(AllowAllFilter),
        )
        .unwrap();

        assert!(reader.is_complete());
        assert!(reader.next_schema().unwrap().is_none());
        assert!(!reader.data_available());
    }

    #[test]
    fn tailing_picks_up_chunks_across_rescans() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "@.json", br#"{"schemas":["s"]}"#);
        write(tmp.path(), "s.json", br#"{"tables":["t"],"views":[]}"#);
        write(tmp.path(), "s@t.json", br#"{"chunking":true}"#);

        let reader = DumpReader::open(
            Box::new(LocalDirectory::new(tmp.path())),
            Box::new(AllowAllFilter),
        )
        .unwrap();

        assert!(!reader.data_available());

        write(tmp.path(), "s@t@0.tsv", &[0u8; 100]);
        reader.rescan().unwrap();
        assert_eq!(reader.total_data_size(), 100, "running total must grow as chunks are observed");

        let in_flight = HashMap::new();
        let chunk = reader.next_table_chunk(&in_flight).unwrap().unwrap();
        assert_eq!(chunk.chunk_index, 0);
        assert_eq!(chunk.chunks_total, 0);
        assert!(reader.next_table_chunk(&in_flight).unwrap().is_none());

        write(tmp.path(), "s@t@@1.tsv", &[0u8; 50]);
        reader.rescan().unwrap();
        assert_eq!(reader.total_data_size(), 150, "handing a chunk out must not affect the running total");

        let chunk = reader.next_table_chunk(&in_flight).unwrap().unwrap();
        assert_eq!(chunk.chunk_index, 1);
        assert_eq!(chunk.chunks_total, 2);

        assert!(!reader.data_available());
        assert!(reader.work_available());
    }

    struct ExcludeSchemaFilter(&'static str);

    impl Filter for ExcludeSchemaFilter {
        fn include_schema(&self, schema: &str) -> bool {
            schema != self.0
        }

        fn include_table(&self, schema: &str, _table: &str) -> bool {
            schema != self.0
        }
    }

    #[test]
    fn total_data_size_once_complete_excludes_filtered_out_schemas() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "@.json", br#"{"schemas":["kept","dropped"]}"#);
        write(tmp.path(), "kept.json", br#"{"tables":["t"],"views":[],"includesDdl":false}"#);
        write(tmp.path(), "kept@t.json", br#"{"includesDdl":false}"#);
        write(tmp.path(), "dropped.json", br#"{"tables":["u"],"views":[]}"#);
        write(tmp.path(), "dropped@u.json", br#"{}"#);
        write(
            tmp.path(),
            "@.done.json",
            br#"{"dataBytes":1000,"tableDataBytes":{"kept":{"t":100},"dropped":{"u":900}}}"#,
        );

        let reader = DumpReader::open(
            Box::new(LocalDirectory::new(tmp.path())),
            Box::new(ExcludeSchemaFilter("dropped")),
        )
        .unwrap();

        assert!(reader.is_complete());
        assert_eq!(
            reader.total_data_size(),
            100,
            "must sum only tables that survived the filter, not the terminator's unfiltered total"
        );
    }

    #[test]
    fn add_deferred_indexes_rejects_unknown_table() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "@.json", br#"{"schemas":["s"]}"#);
        write(tmp.path(), "s.json", br#"{"tables":[],"views":[]}"#);

        let reader = DumpReader::open(
            Box::new(LocalDirectory::new(tmp.path())),
            Box::new(AllowAllFilter),
        )
        .unwrap();

        let err = reader.add_deferred_indexes("s", "missing", vec![]).unwrap_err();
        assert!(matches!(err, DumpReaderError::MissingReferent { .. }));
    }
}
