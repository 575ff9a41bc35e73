//! Small inspection tool: open a dump directory, print what the reader
//! currently knows about it, and (with `--tail`) keep rescanning and
//! draining the work queue until the dump is complete and drained.
//!
//! Not part of the reader's core - a demo of driving [`dump_reader`] the
//! way a real loader would, without actually loading anything.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use dump_reader::directory::LocalDirectory;
use dump_reader::filter::AllowAllFilter;
use dump_reader::DumpReader;

#[derive(Parser)]
#[clap(name = "dump-reader-cli", about = "Inspect a logical dump directory")]
struct Opts {
    /// Path to the dump directory.
    path: String,

    /// Keep rescanning until the dump is complete and every table has been
    /// drained, instead of exiting after the first pass.
    #[clap(long)]
    tail: bool,

    /// Rescan interval while tailing, in milliseconds.
    #[clap(long, default_value = "500")]
    interval_ms: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let opts = Opts::parse();

    let dir = Box::new(LocalDirectory::new(&opts.path));
    let reader =
        DumpReader::open(dir, Box::new(AllowAllFilter)).context("failed to open dump directory")?;

    loop {
        drain_ready_work(&reader)?;

        println!(
            "status={:?} data_available={} work_available={} total_data_size={}",
            reader.status(),
            reader.data_available(),
            reader.work_available(),
            reader.total_data_size(),
        );

        let done = reader.is_complete() && !reader.data_available() && !reader.work_available();
        if done || !opts.tail {
            break;
        }

        thread::sleep(Duration::from_millis(opts.interval_ms));
        reader.rescan().context("rescan failed")?;
    }

    Ok(())
}

/// Drain every currently-available unit of work once, printing a line per
/// item. Skips the actual DDL/chunk file contents - this CLI only reports
/// on scheduling, it never talks to a database.
fn drain_ready_work(reader: &DumpReader) -> Result<()> {
    while let Some(work) = reader.next_schema()? {
        println!(
            "schema DDL ready: {} ({} tables, {} views)",
            work.schema,
            work.tables.len(),
            work.views.len()
        );
    }

    let in_flight: HashMap<(String, String), u64> = HashMap::new();
    while let Some(chunk) = reader.next_table_chunk(&in_flight)? {
        println!(
            "chunk ready: {}.{} idx={} total={} size={}",
            chunk.schema, chunk.table, chunk.chunk_index, chunk.chunks_total, chunk.chunk_size
        );
    }

    while let Some(index) = reader.next_deferred_index(|_| true) {
        println!(
            "deferred indexes ready: {}.{} ({} statements)",
            index.schema,
            index.table,
            index.indexes.len()
        );
    }

    while let Some(analyze) = reader.next_table_analyze() {
        println!("analyze ready: {}.{}", analyze.schema, analyze.table);
    }

    Ok(())
}
