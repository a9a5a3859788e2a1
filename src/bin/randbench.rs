//! Random-access micro-benchmark, grounded on
//! `original_source/tests/random.cpp`: draws addresses from a uniform or
//! normal distribution, feeds them through an [`AccessEngine`] in batches,
//! and reports throughput plus the resulting stats.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::Normal;

use cachesim::addr::{AddressGeometry, PageSize};
use cachesim::coherence::AccessKind;
use cachesim::engine::AccessEngine;
use cachesim::prefetch::PrefetchKind;
use cachesim::stats::print_box;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "verbatim")]
enum AddrDistribution {
    Uniform,
    Normal,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Random-access cache simulator benchmark")]
struct BenchArgs {
    /// Total cache lines per domain.
    #[arg(long, default_value_t = 1024)]
    cache_lines: u64,
    /// Set associativity.
    #[arg(long, default_value_t = 64)]
    assoc: u64,
    /// Hardware prefetcher model.
    #[arg(long, value_enum, default_value = "None")]
    prefetch: PrefetchKind,
    /// Track compulsory misses.
    #[arg(long, default_value_t = false)]
    compulsory: bool,
    /// Number of coherent cache domains.
    #[arg(long, default_value_t = 1)]
    num_caches: usize,
    /// Number of distinct simulated thread ids, round-robined over domains.
    #[arg(long, default_value_t = 4)]
    num_threads: u32,
    /// Number of 2000-access batches to run.
    #[arg(long, default_value_t = 1000)]
    iterations: u32,
    /// Address distribution.
    #[arg(long, value_enum, default_value = "Uniform")]
    distribution: AddrDistribution,
    /// Distribution range: upper bound for uniform, standard deviation for normal.
    #[arg(long, default_value_t = 1_000_000)]
    range: u64,
}

const BATCH: usize = 2000;

fn main() -> Result<()> {
    env_logger::init();
    let args = BenchArgs::parse();

    let geometry = AddressGeometry::new(64, args.cache_lines, args.assoc, PageSize::FourKiB)
        .context("invalid geometry")?;
    let tid_to_domain: Vec<usize> = (0..args.num_threads as usize)
        .map(|tid| tid % args.num_caches)
        .collect();

    let mut engine = AccessEngine::new(
        geometry,
        args.num_caches,
        args.assoc as usize,
        tid_to_domain,
        args.prefetch,
        args.compulsory,
        false,
    )?;

    let mut rng = SmallRng::seed_from_u64(0);
    let tid_gen = Uniform::new_inclusive(0, args.num_threads.saturating_sub(1).max(0));
    let rw_gen = Uniform::new_inclusive(0u8, 1u8);
    let addr_uniform = Uniform::new_inclusive(0u64, args.range);
    let addr_normal = Normal::new(1_000_000_000.0, args.range as f64).expect("valid normal params");

    let mut batch: Vec<(AccessKind, u64, u32)> = Vec::with_capacity(BATCH);
    let start = Instant::now();

    for _ in 0..args.iterations {
        batch.clear();
        for _ in 0..BATCH {
            let access = if rw_gen.sample(&mut rng) == 0 {
                AccessKind::Read
            } else {
                AccessKind::Write
            };
            let tid = tid_gen.sample(&mut rng);
            let raw_addr = match args.distribution {
                AddrDistribution::Uniform => addr_uniform.sample(&mut rng),
                AddrDistribution::Normal => addr_normal.sample(&mut rng).max(0.0) as u64,
            };
            batch.push((access, raw_addr << 6, tid));
        }
        for &(access, address, tid) in &batch {
            engine.mem_access(address, access, tid);
        }
    }

    let elapsed = start.elapsed();
    let accesses = BATCH as u64 * args.iterations as u64;
    println!("execution time: {:.3}s", elapsed.as_secs_f64());
    println!("accesses: {accesses}");
    println!("{}", print_box("randbench", engine.stats()));
    Ok(())
}
