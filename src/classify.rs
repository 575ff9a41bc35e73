//! File-name grammar for dump artifacts.
//!
//! A pure module: classifying a name requires no directory access and no
//! knowledge of `basenames` remapping (that lookup lives in the
//! [`model`](crate::model), which owns each manifest's `basenames` map). The
//! scanner is the only component that combines the two: it resolves an
//! entity's basename in the model, then asks this module to synthesize or
//! recognize the corresponding file name.

/// The last-chunk marker inserted between the table basename and the chunk
/// index, e.g. `schema@table@@3.tsv` for the final chunk of a chunked table.
const LAST_CHUNK_MARKER: &str = "@";

/// Tagged classification of a single file name, per the dump's naming
/// convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileKind<'a> {
    DumpManifest,
    DumpTerminator,
    DumpPreamble,
    DumpPostamble,
    UsersScript,
    SchemaManifest { basename: &'a str },
    SchemaScript { basename: &'a str },
    TableManifest { basename: &'a str, table: &'a str },
    TableScript { basename: &'a str, table: &'a str },
    TableTriggers { basename: &'a str, table: &'a str },
    ViewScript { basename: &'a str, view: &'a str },
    ViewPreScript { basename: &'a str, view: &'a str },
    TableChunk {
        basename: &'a str,
        table: &'a str,
        idx: u64,
        extension: &'a str,
        is_last: bool,
    },
    TableDataUnchunked { basename: &'a str, table: &'a str, extension: &'a str },
}

/// Classify a bare file name against the dump root / schema / table grammar.
///
/// Returns `None` for names that match nothing in the grammar (the scanner
/// simply ignores those).
pub fn classify(name: &str) -> Option<FileKind<'_>> {
    match name {
        "@.json" => return Some(FileKind::DumpManifest),
        "@.done.json" => return Some(FileKind::DumpTerminator),
        "@.sql" => return Some(FileKind::DumpPreamble),
        "@.post.sql" => return Some(FileKind::DumpPostamble),
        "@.users.sql" => return Some(FileKind::UsersScript),
        _ => {}
    }

    // schema-level: "<basename>.json" / "<basename>.sql", no '@' in the name
    if let Some(basename) = strip_suffix(name, ".json") {
        if !basename.contains('@') {
            return Some(FileKind::SchemaManifest { basename });
        }
    }
    if let Some(basename) = strip_suffix(name, ".sql") {
        if !basename.contains('@') && !basename.ends_with(".pre") {
            return Some(FileKind::SchemaScript { basename });
        }
    }

    // entries containing '@' are table/view-scoped: "<basename>@<entity>..."
    let at = name.find('@')?;
    let basename = &name[..at];
    let rest = &name[at + 1..];

    if let Some(entity) = strip_suffix(rest, ".json") {
        if !entity.contains('@') {
            return Some(FileKind::TableManifest { basename, table: entity });
        }
    }

    if let Some(entity) = strip_suffix(rest, ".triggers.sql") {
        if !entity.contains('@') {
            return Some(FileKind::TableTriggers { basename, table: entity });
        }
    }

    if let Some(entity) = strip_suffix(rest, ".pre.sql") {
        if !entity.contains('@') {
            return Some(FileKind::ViewPreScript { basename, view: entity });
        }
    }

    if let Some(entity) = strip_suffix(rest, ".sql") {
        if !entity.contains('@') {
            return Some(FileKind::TableScript { basename, table: entity });
        }
        // could also be a view script; callers distinguish table vs. view
        // by checking the model, both share this grammar slot.
    }

    // chunked/unchunked data: "<entity>@<idx>.<ext>" or "<entity>@@<idx>.<ext>" or "<entity>.<ext>"
    if let Some((entity, remainder)) = rest.split_once('@') {
        // remainder is either "<idx>.<ext>" (non-last) or "@<idx>.<ext>" (last)
        let (is_last, idx_and_ext) = if let Some(r) = remainder.strip_prefix(LAST_CHUNK_MARKER) {
            (true, r)
        } else {
            (false, remainder)
        };

        if let Some(dot) = idx_and_ext.find('.') {
            let (idx_str, ext_with_dot) = idx_and_ext.split_at(dot);
            if let Ok(idx) = idx_str.parse::<u64>() {
                let extension = &ext_with_dot[1..];
                return Some(FileKind::TableChunk {
                    basename,
                    table: entity,
                    idx,
                    extension,
                    is_last,
                });
            }
        }
        return None;
    }

    // unchunked data: "<basename>@<table>.<ext>" with no further '@'
    if let Some(dot) = rest.find('.') {
        let (table, ext_with_dot) = rest.split_at(dot);
        if !table.is_empty() {
            return Some(FileKind::TableDataUnchunked {
                basename,
                table,
                extension: &ext_with_dot[1..],
            });
        }
    }

    None
}

fn strip_suffix<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    s.strip_suffix(suffix).filter(|s| !s.is_empty())
}

/// Synthesize `<basename>.json`.
pub fn schema_manifest_name(basename: &str) -> String {
    format!("{}.json", basename)
}

/// Synthesize `<basename>.sql`.
pub fn schema_script_name(basename: &str) -> String {
    format!("{}.sql", basename)
}

/// Synthesize `<schema_basename>@<table_basename>.json`.
pub fn table_manifest_name(schema_basename: &str, table_basename: &str) -> String {
    format!("{}@{}.json", schema_basename, table_basename)
}

/// Synthesize `<schema_basename>@<table_basename>.sql` (shared with views).
pub fn table_script_name(schema_basename: &str, table_basename: &str) -> String {
    format!("{}@{}.sql", schema_basename, table_basename)
}

/// Synthesize `<schema_basename>@<table_basename>.triggers.sql`.
pub fn table_triggers_name(schema_basename: &str, table_basename: &str) -> String {
    format!("{}@{}.triggers.sql", schema_basename, table_basename)
}

/// Synthesize `<schema_basename>@<view_basename>.pre.sql`.
pub fn view_pre_script_name(schema_basename: &str, view_basename: &str) -> String {
    format!("{}@{}.pre.sql", schema_basename, view_basename)
}

/// Synthesize the data file name for an unchunked table:
/// `<schema_basename>@<table_basename>.<extension>`.
pub fn table_data_name_unchunked(schema_basename: &str, table_basename: &str, extension: &str) -> String {
    format!("{}@{}.{}", schema_basename, table_basename, extension)
}

/// Synthesize the data file name for a chunked table's chunk `idx`:
/// `<schema_basename>@<table_basename>@<idx>.<extension>`, with the
/// last-chunk marker inserted when `is_last`.
pub fn table_data_name_chunked(
    schema_basename: &str,
    table_basename: &str,
    extension: &str,
    idx: u64,
    is_last: bool,
) -> String {
    if is_last {
        format!(
            "{}@{}@{}{}.{}",
            schema_basename, table_basename, LAST_CHUNK_MARKER, idx, extension
        )
    } else {
        format!("{}@{}@{}.{}", schema_basename, table_basename, idx, extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_dump_root_files() {
        assert_eq!(classify("@.json"), Some(FileKind::DumpManifest));
        assert_eq!(classify("@.done.json"), Some(FileKind::DumpTerminator));
        assert_eq!(classify("@.sql"), Some(FileKind::DumpPreamble));
        assert_eq!(classify("@.post.sql"), Some(FileKind::DumpPostamble));
        assert_eq!(classify("@.users.sql"), Some(FileKind::UsersScript));
    }

    #[test]
    fn classifies_schema_files() {
        assert_eq!(
            classify("sakila.json"),
            Some(FileKind::SchemaManifest { basename: "sakila" })
        );
        assert_eq!(
            classify("sakila.sql"),
            Some(FileKind::SchemaScript { basename: "sakila" })
        );
    }

    #[test]
    fn classifies_table_files() {
        assert_eq!(
            classify("sakila@actor.json"),
            Some(FileKind::TableManifest {
                basename: "sakila",
                table: "actor"
            })
        );
        assert_eq!(
            classify("sakila@actor.sql"),
            Some(FileKind::TableScript {
                basename: "sakila",
                table: "actor"
            })
        );
        assert_eq!(
            classify("sakila@actor.triggers.sql"),
            Some(FileKind::TableTriggers {
                basename: "sakila",
                table: "actor"
            })
        );
    }

    #[test]
    fn classifies_view_pre_script() {
        assert_eq!(
            classify("sakila@actor_info.pre.sql"),
            Some(FileKind::ViewPreScript {
                basename: "sakila",
                view: "actor_info"
            })
        );
    }

    #[test]
    fn classifies_unchunked_table_data() {
        assert_eq!(
            classify("sakila@actor.tsv"),
            Some(FileKind::TableDataUnchunked {
                basename: "sakila",
                table: "actor",
                extension: "tsv"
            })
        );
    }

    #[test]
    fn classifies_chunked_table_data() {
        assert_eq!(
            classify("sakila@actor@0.tsv"),
            Some(FileKind::TableChunk {
                basename: "sakila",
                table: "actor",
                idx: 0,
                extension: "tsv",
                is_last: false,
            })
        );
        assert_eq!(
            classify("sakila@actor@@1.tsv"),
            Some(FileKind::TableChunk {
                basename: "sakila",
                table: "actor",
                idx: 1,
                extension: "tsv",
                is_last: true,
            })
        );
    }

    #[test]
    fn synthesis_round_trips_classification() {
        let name = table_data_name_chunked("sakila", "actor", "tsv", 2, false);
        assert_eq!(name, "sakila@actor@2.tsv");
        assert_eq!(
            classify(&name),
            Some(FileKind::TableChunk {
                basename: "sakila",
                table: "actor",
                idx: 2,
                extension: "tsv",
                is_last: false,
            })
        );

        let last = table_data_name_chunked("sakila", "actor", "tsv", 2, true);
        assert_eq!(last, "sakila@actor@@2.tsv");
        assert_eq!(
            classify(&last),
            Some(FileKind::TableChunk {
                basename: "sakila",
                table: "actor",
                idx: 2,
                extension: "tsv",
                is_last: true,
            })
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(classify("random.txt"), None);
        assert_eq!(classify("sakila@actor@notanumber.tsv"), None);
    }
}
