#[macro_use]
extern crate log;

use std::fs::File;
use std::io::BufReader;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use cachesim::addr::AddressGeometry;
use cachesim::cli::{Args, TraceFormat};
use cachesim::engine::AccessEngine;
use cachesim::stats::print_box;
use cachesim::trace::{BinaryTraceReader, TextTraceReader, TraceRecord};

pub fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!(
        "cachesim {} ({})",
        cachesim::built_info::PKG_VERSION,
        cachesim::built_info::GIT_COMMIT_HASH.unwrap_or("unknown")
    );

    let geometry = AddressGeometry::new(
        args.line_size,
        args.num_lines,
        args.assoc,
        args.page_size,
    )
    .context("invalid cache geometry")?;

    let tid_to_domain = if args.tid_to_domain.is_empty() {
        vec![0; args.num_domains.max(1)]
    } else {
        args.tid_to_domain.clone()
    };

    let ways = (args.assoc) as usize;

    if args.parallel {
        let records = read_all_records(&args)?;
        let report = cachesim::parallel::run_sharded(
            &records,
            geometry,
            args.num_domains,
            ways,
            tid_to_domain,
            args.prefetch,
            args.count_compulsory,
            args.addr_translation,
            args.threads,
        )?;
        println!("{}", print_box("cachesim (parallel, approximate)", report));
        return Ok(());
    }

    let mut engine = AccessEngine::new(
        geometry,
        args.num_domains,
        ways,
        tid_to_domain,
        args.prefetch,
        args.count_compulsory,
        args.addr_translation,
    )?;

    let file = File::open(&args.trace_path)
        .with_context(|| format!("opening trace file {}", args.trace_path))?;
    let start = Instant::now();
    let mut lines = 0u64;

    match args.trace_format {
        TraceFormat::Binary => {
            let reader = BinaryTraceReader::new(BufReader::new(file), 0);
            for record in reader {
                let record = record?;
                lines += 1;
                run_record(&mut engine, record)?;
                log_progress(lines);
            }
        }
        TraceFormat::Text => {
            let reader = TextTraceReader::new(BufReader::new(file), 0);
            for record in reader {
                let record = record?;
                lines += 1;
                run_record(&mut engine, record)?;
                log_progress(lines);
            }
        }
    }

    let elapsed = start.elapsed();
    info!(
        "replayed {} records in {:.1} ms",
        lines,
        elapsed.as_secs_f64() * 1000.0
    );
    println!("{}", print_box("cachesim", engine.stats()));
    Ok(())
}

fn run_record(engine: &mut AccessEngine, record: TraceRecord) -> Result<()> {
    engine.validate_tid(record.tid)?;
    engine.mem_access(record.address, record.access, record.tid);
    Ok(())
}

fn log_progress(lines: u64) {
    if lines % cachesim::constants::PROGRESS_LOG_INTERVAL == 0 {
        debug!("replayed {lines} records so far");
    }
}

fn read_all_records(args: &Args) -> Result<Vec<TraceRecord>> {
    let file = File::open(&args.trace_path)
        .with_context(|| format!("opening trace file {}", args.trace_path))?;
    let reader = BufReader::new(file);
    let records: Result<Vec<TraceRecord>, _> = match args.trace_format {
        TraceFormat::Binary => BinaryTraceReader::new(reader, 0).collect(),
        TraceFormat::Text => TextTraceReader::new(reader, 0).collect(),
    };
    Ok(records?)
}
