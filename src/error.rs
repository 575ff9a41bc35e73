//! Error taxonomy for the dump reader.
//!
//! A missing terminator manifest is not really an error - it is the normal
//! state of a dump that is still being produced. [`TerminatorProbe`] makes
//! that explicit as a three-way result instead of folding it into
//! [`DumpReaderError`].
//!
//! Everything that *is* a genuine error - a manifest that parses to the
//! wrong shape, a reference to an entity that was never declared, an I/O
//! failure from the directory backend - is a [`DumpReaderError`] variant a
//! caller can match on.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DumpReaderError {
    #[error("malformed manifest '{file}': {source}")]
    MalformedManifest {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unable to find {} for adding index", .table.as_ref().map(|t| format!("table {}.{}", .schema, t)).unwrap_or_else(|| format!("schema {}", .schema)))]
    MissingReferent { schema: String, table: Option<String> },

    #[error("I/O error on '{file}': {source}")]
    Io {
        file: String,
        #[source]
        source: io::Error,
    },
}

/// Outcome of attempting to parse the dump terminator manifest (`@.done.json`).
#[derive(Debug)]
pub enum TerminatorProbe<T> {
    /// The terminator was present and parsed successfully.
    Found(T),
    /// The terminator file is not present yet; the dump is still being written.
    NotYet,
    /// The terminator file is present but is not a well-formed manifest.
    Malformed(serde_json::Error),
}
