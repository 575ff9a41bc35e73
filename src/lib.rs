//! This crate implements the reader and chunk scheduler side of a parallel
//! logical restore tool.
//!
//! # Data formats
//!
//! A dump is a directory of files produced by a separate dumper: metadata
//! documents (`@.json`, `<schema>.json`, `<schema>@<table>.json`, ...), DDL
//! scripts (`.sql`), and data chunks (`<schema>@<table>@<idx>.<ext>`). The
//! dumper may still be writing when a reader first opens the directory -
//! callers repeatedly [`rescan`](DumpReader::rescan) to "tail" it.
//!
//! The [`classify`] module turns a bare file name into a [`classify::FileKind`]
//! using the naming convention above. The [`model`] module is the in-memory
//! tree of [`model::Dump`] / [`model::Schema`] / [`model::Table`] /
//! [`model::View`] records built up from the entries the [`scanner::Scanner`]
//! observes. The [`work_queue::WorkQueue`] then hands out DDL scripts, data
//! chunks, deferred indexes and table analyses to the worker pool, in an
//! order governed by the [`scheduler::ChunkScheduler`].
//!
//! # Readiness
//!
//! An entity becomes "ready" once every manifest and script it depends on
//! has been observed. A dump as a whole transitions from `DUMPING` to
//! `COMPLETE` when its terminator manifest (`@.done.json`) appears; every
//! included schema must be ready by that point, or the reader has a bug.
//!
//! # What this crate does *not* do
//!
//! It does not execute SQL, retry over the network, checkpoint progress, or
//! translate schemas between database engines - those are the caller's
//! concerns. The directory backend, the manifest JSON shapes beyond the keys
//! this crate reads, and the include/exclude filtering policy are all
//! supplied by the caller.

pub mod classify;
pub mod controller;
pub mod directory;
pub mod error;
pub mod filter;
pub mod manifest;
pub mod model;
pub mod scanner;
pub mod scheduler;
pub mod splitter;
pub mod work_queue;

pub use controller::DumpReader;
pub use error::{DumpReaderError, TerminatorProbe};
pub use filter::{AllowAllFilter, Filter};
