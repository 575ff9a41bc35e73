//! Incremental directory scanning.
//!
//! A single [`Scanner::rescan`] call performs three fixed, non-recursive
//! passes over the current directory listing: dump-level files, metadata
//! descent (schema and table manifests), and data descent (chunk files).
//! Every check an entity has already satisfied is skipped, so rescanning an
//! unchanged listing is a no-op and running it twice in a row never flips a
//! flag back or re-parses a file.

use std::collections::HashMap;

use log::{debug, info, warn};

use crate::classify::{self, FileKind};
use crate::directory::{Directory, Listing};
use crate::error::DumpReaderError;
use crate::filter::Filter;
use crate::manifest::{self, SchemaManifest, TableManifest, TerminatorManifest};
use crate::model::{DumpStatus, EntityModel, Schema, Table, View};

pub struct Scanner;

impl Scanner {
    /// Run all three passes once against `listing`.
    pub fn rescan(
        model: &mut EntityModel,
        dir: &dyn Directory,
        filter: &dyn Filter,
        listing: &Listing,
    ) -> Result<(), DumpReaderError> {
        Self::scan_dump_level(model, dir, listing)?;
        Self::scan_metadata(model, dir, filter, listing)?;
        Self::scan_data(model, listing);

        debug_assert!(
            model.dump.status != DumpStatus::Complete
                || model
                    .schemas_iter()
                    .all(|(_, s)| s.ready(model.tables_of(model.schema_key(&s.name).unwrap()).map(|(_, t)| t))),
            "dump reported complete with a schema that is not ready"
        );

        Ok(())
    }

    fn scan_dump_level(
        model: &mut EntityModel,
        dir: &dyn Directory,
        listing: &Listing,
    ) -> Result<(), DumpReaderError> {
        let dump = &mut model.dump;

        if dump.preamble.is_none() && listing.contains_key("@.sql") {
            dump.preamble = Some(read_text(dir, "@.sql")?);
        }
        if dump.postamble.is_none() && listing.contains_key("@.post.sql") {
            dump.postamble = Some(read_text(dir, "@.post.sql")?);
        }
        if dump.users_script.is_none() && listing.contains_key("@.users.sql") {
            dump.users_script = Some(read_text(dir, "@.users.sql")?);
        }

        if dump.status != DumpStatus::Complete && listing.contains_key("@.done.json") {
            match probe_terminator(dir) {
                crate::error::TerminatorProbe::Found(terminator) => {
                    apply_terminator(dump, terminator);
                    dump.status = DumpStatus::Complete;
                    info!("dump is complete");
                }
                crate::error::TerminatorProbe::NotYet => {}
                crate::error::TerminatorProbe::Malformed(source) => {
                    return Err(DumpReaderError::MalformedManifest {
                        file: "@.done.json".to_string(),
                        source,
                    });
                }
            }
        }

        Ok(())
    }

    fn scan_metadata(
        model: &mut EntityModel,
        dir: &dyn Directory,
        filter: &dyn Filter,
        listing: &Listing,
    ) -> Result<(), DumpReaderError> {
        let default_charset = model.dump.default_charset.clone();

        for schema_key in model.schema_keys().collect::<Vec<_>>() {
            if model.schema(schema_key).md_done {
                continue;
            }

            let (basename, name) = {
                let schema = model.schema(schema_key);
                (schema.basename.clone(), schema.name.clone())
            };

            if !model.schema(schema_key).sql_seen {
                let script_name = classify::schema_script_name(&basename);
                if listing.contains_key(&script_name) {
                    model.schema_mut(schema_key).sql_seen = true;
                    debug!("schema '{}' DDL observed", name);
                }
            }

            if !model.schema(schema_key).md_loaded {
                let manifest_name = classify::schema_manifest_name(&basename);
                if listing.contains_key(&manifest_name) {
                    let raw = dir.read_to_string(&manifest_name).map_err(|source| DumpReaderError::Io {
                        file: manifest_name.clone(),
                        source,
                    })?;
                    let parsed: SchemaManifest =
                        serde_json::from_str(&raw).map_err(|source| DumpReaderError::MalformedManifest {
                            file: manifest_name.clone(),
                            source,
                        })?;
                    load_schema_manifest(model, schema_key, filter, parsed);
                    debug!("schema '{}' metadata loaded", name);
                }
            }

            // Descend into this schema's tables/views, which may have just
            // been created above or may already exist from a prior pass.
            for table_key in model.schema(schema_key).table_keys.clone() {
                if model.table(table_key).md_seen && model.table(table_key).sql_seen {
                    continue;
                }
                Self::scan_table_metadata(model, dir, table_key, &default_charset, listing)?;
            }

            Self::scan_view_scripts(model.schema_mut(schema_key), listing);

            let settled = model
                .schema(schema_key)
                .ready(model.tables_of(schema_key).map(|(_, t)| t));
            if settled {
                model.schema_mut(schema_key).md_done = true;
                debug!("schema '{}' metadata descent settled, no longer re-walked", name);
            }
        }

        Ok(())
    }

    fn scan_table_metadata(
        model: &mut EntityModel,
        dir: &dyn Directory,
        table_key: super::model::TableKey,
        default_charset: &Option<String>,
        listing: &Listing,
    ) -> Result<(), DumpReaderError> {
        let (schema_basename, table_basename, table_name) = {
            let table = model.table(table_key);
            let schema_basename = model.schema_by_name(&table.schema).unwrap().basename.clone();
            (schema_basename, table.basename.clone(), table.name.clone())
        };

        if !model.table(table_key).md_seen {
            let manifest_name = classify::table_manifest_name(&schema_basename, &table_basename);
            if listing.contains_key(&manifest_name) {
                let raw = dir.read_to_string(&manifest_name).map_err(|source| DumpReaderError::Io {
                    file: manifest_name.clone(),
                    source,
                })?;
                let parsed: TableManifest =
                    serde_json::from_str(&raw).map_err(|source| DumpReaderError::MalformedManifest {
                        file: manifest_name.clone(),
                        source,
                    })?;
                apply_table_manifest(model.table_mut(table_key), parsed, default_charset.as_deref());
                debug!("table '{}' metadata loaded", table_name);
            }
        }

        if !model.table(table_key).sql_seen {
            let script_name = classify::table_script_name(&schema_basename, &table_basename);
            if listing.contains_key(&script_name) {
                model.table_mut(table_key).sql_seen = true;
            }
        }

        if !model.table(table_key).has_triggers {
            let triggers_name = classify::table_triggers_name(&schema_basename, &table_basename);
            if listing.contains_key(&triggers_name) {
                model.table_mut(table_key).has_triggers = true;
            }
        }

        Ok(())
    }

    fn scan_view_scripts(schema: &mut Schema, listing: &Listing) {
        let basename = schema.basename.clone();
        for view in schema.views.iter_mut() {
            if !view.sql_seen {
                let script_name = classify::table_script_name(&basename, &view.basename);
                if listing.contains_key(&script_name) {
                    view.sql_seen = true;
                }
            }
            if !view.sql_pre_seen {
                let pre_name = classify::view_pre_script_name(&basename, &view.basename);
                if listing.contains_key(&pre_name) {
                    view.sql_pre_seen = true;
                }
            }
        }
    }

    fn scan_data(model: &mut EntityModel, listing: &Listing) {
        for (schema_key, table_key) in model.all_tables().collect::<Vec<_>>() {
            let schema_basename = model.schema(schema_key).basename.clone();
            let (found_data, new_bytes) = scan_table_data(model.table_mut(table_key), &schema_basename, listing);
            if found_data {
                model.mark_table_has_data(table_key);
            }
            model.dump.dump_size += new_bytes;
        }
    }
}

fn read_text(dir: &dyn Directory, name: &str) -> Result<String, DumpReaderError> {
    dir.read_to_string(name).map_err(|source| DumpReaderError::Io {
        file: name.to_string(),
        source,
    })
}

fn probe_terminator(dir: &dyn Directory) -> crate::error::TerminatorProbe<TerminatorManifest> {
    match dir.read_to_string("@.done.json") {
        Ok(raw) => match serde_json::from_str::<TerminatorManifest>(&raw) {
            Ok(parsed) => crate::error::TerminatorProbe::Found(parsed),
            Err(err) => crate::error::TerminatorProbe::Malformed(err),
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => crate::error::TerminatorProbe::NotYet,
        Err(_) => crate::error::TerminatorProbe::NotYet,
    }
}

fn apply_terminator(dump: &mut crate::model::Dump, terminator: TerminatorManifest) {
    match terminator.data_bytes {
        Some(bytes) => dump.data_size = Some(bytes),
        None => warn!("@.done.json does not contain dataBytes"),
    }
    match terminator.table_data_bytes {
        Some(map) => dump.table_data_size = map,
        None => warn!("@.done.json does not contain tableDataBytes"),
    }
}

fn load_schema_manifest(
    model: &mut EntityModel,
    schema_key: super::model::SchemaKey,
    filter: &dyn Filter,
    parsed: SchemaManifest,
) {
    let schema_name = model.schema(schema_key).name.clone();
    let schema_basename = model.schema(schema_key).basename.clone();

    {
        let schema = model.schema_mut(schema_key);
        schema.has_sql = parsed.includes_ddl;
        schema.has_data = parsed.includes_data;
        schema.function_names = parsed.functions;
        schema.procedure_names = parsed.procedures;
        schema.event_names = parsed.events;
        schema.md_loaded = true;
    }

    for table_name in &parsed.tables {
        if !filter.include_table(&schema_name, table_name) {
            continue;
        }
        let basename = parsed
            .basenames
            .get(table_name)
            .cloned()
            .unwrap_or_else(|| format!("{}@{}", schema_basename, table_name));

        let mut table = Table::new(schema_name.clone(), table_name.clone(), basename);
        // tables inherit schema-level include flags as their own default,
        // in case the table never gets its own manifest.
        table.has_sql = model.schema(schema_key).has_sql;
        table.has_data = model.schema(schema_key).has_data;
        model.insert_table(schema_key, table);
    }

    for view_name in &parsed.views {
        if !filter.include_table(&schema_name, view_name) {
            continue;
        }
        let basename = parsed
            .basenames
            .get(view_name)
            .cloned()
            .unwrap_or_else(|| format!("{}@{}", schema_basename, view_name));
        model
            .schema_mut(schema_key)
            .views
            .push(View::new(schema_name.clone(), view_name.clone(), basename));
    }

    debug!(
        "{} has {} tables, {} views",
        schema_name,
        model.schema(schema_key).table_keys.len(),
        model.schema(schema_key).views.len()
    );
}

fn apply_table_manifest(table: &mut Table, parsed: TableManifest, dump_default_charset: Option<&str>) {
    table.has_sql = parsed.includes_ddl;
    table.has_data = parsed.includes_data;
    table.extension = parsed.extension;
    table.chunked = parsed.chunking;
    table.histograms = parsed.histograms;
    table.md_seen = true;

    let normalized = manifest::normalize_options(parsed.options, dump_default_charset);
    table.options = normalized.options;
    table.primary_index = normalized.primary_index;
}

/// Probe for new chunk files for a single table. Returns
/// `(found_new_data, bytes_newly_observed)`: the caller inserts into
/// `tables_with_data` and adds to `dump.dump_size` based on this, since
/// `&mut Table` here has no back pointer into the model (the same
/// two-field-mutation problem `EntityModel::schema_and_table_mut` solves
/// for the splitter).
fn scan_table_data(table: &mut Table, schema_basename: &str, listing: &Listing) -> (bool, u64) {
    if table.last_chunk_seen || !table.has_data {
        return (false, 0);
    }

    let mut found_data = false;
    let mut new_bytes = 0u64;

    if !table.chunked {
        let name = classify::table_data_name_unchunked(schema_basename, &table.basename, &table.extension);
        if let Some(&size) = listing.get(&name) {
            table.num_chunks = 1;
            table.available_chunk_sizes = vec![size];
            table.last_chunk_seen = true;
            found_data = true;
            new_bytes += size;
        }
        return (found_data, new_bytes);
    }

    loop {
        let idx = table.num_chunks;
        let non_last = classify::table_data_name_chunked(schema_basename, &table.basename, &table.extension, idx, false);
        if let Some(&size) = listing.get(&non_last) {
            table.num_chunks = idx + 1;
            table.available_chunk_sizes.push(size);
            found_data = true;
            new_bytes += size;
            continue;
        }

        let last = classify::table_data_name_chunked(schema_basename, &table.basename, &table.extension, idx, true);
        if let Some(&size) = listing.get(&last) {
            table.num_chunks = idx + 1;
            table.available_chunk_sizes.push(size);
            table.last_chunk_seen = true;
            found_data = true;
            new_bytes += size;
        } else {
            let out_of_order = has_later_chunk(listing, schema_basename, &table.basename, &table.extension, idx);
            debug_assert!(
                !out_of_order,
                "chunk {} observed out of order for table {}",
                idx, table.name
            );
            if out_of_order {
                warn!(
                    "table {} has a chunk beyond index {} while that index is still missing; dumper may be writing out of order",
                    table.name, idx
                );
            }
        }
        break;
    }

    (found_data, new_bytes)
}

/// Diagnostic-only: whether `listing` contains a chunk file for this table at
/// an index later than `idx`, used to flag a dumper that is writing chunks
/// out of order. Scans the listing itself via the classifier rather than
/// guessing an upper bound on the chunk index to probe for.
fn has_later_chunk(listing: &Listing, schema_basename: &str, table_basename: &str, extension: &str, idx: u64) -> bool {
    let prefix = format!("{}@{}@", schema_basename, table_basename);
    listing.keys().any(|name| {
        if !name.starts_with(&prefix) {
            return false;
        }
        matches!(
            classify::classify(name),
            Some(FileKind::TableChunk {
                table,
                extension: ext,
                idx: found_idx,
                ..
            }) if table == table_basename && ext == extension && found_idx > idx
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{listing_from, LocalDirectory};
    use crate::filter::AllowAllFilter;
    use crate::model::Schema;

    fn write(dir: &std::path::Path, name: &str, contents: &[u8]) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn rescan_adds_newly_observed_chunk_sizes_to_dump_size() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "s@t@0.tsv", &[0u8; 30]);

        let local = LocalDirectory::new(tmp.path());
        let mut model = EntityModel::new();
        let schema_key = model.insert_schema(Schema::new("s", "s"));
        let mut table = Table::new("s", "t", "s@t");
        table.chunked = true;
        model.insert_table(schema_key, table);

        let listing = listing_from(local.list_files().unwrap());
        Scanner::rescan(&mut model, &local, &AllowAllFilter, &listing).unwrap();
        assert_eq!(model.dump.dump_size, 30);

        // an unchanged listing must not double-count.
        Scanner::rescan(&mut model, &local, &AllowAllFilter, &listing).unwrap();
        assert_eq!(model.dump.dump_size, 30);

        write(tmp.path(), "s@t@@1.tsv", &[0u8; 20]);
        let listing = listing_from(local.list_files().unwrap());
        Scanner::rescan(&mut model, &local, &AllowAllFilter, &listing).unwrap();
        assert_eq!(model.dump.dump_size, 50);
    }
}
