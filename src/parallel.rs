//! Experimental sharded driver: splits a fully-buffered trace by cache set
//! and replays each shard on its own [`AccessEngine`] in a worker thread,
//! summing the resulting stats.
//!
//! The teacher's own parallel driver (`src/util/workers.rs`'s `WorkerGroup`)
//! runs repeated epochs behind a barrier/condvar so every worker sees every
//! other worker's writes each epoch — the right tool when workers share
//! mutable state every step. Here they don't: sharding by `(set % threads)`
//! means a given cache line's tag always lands in the same shard, so this
//! driver is just `std::thread::scope` fanning out independent engines and
//! joining, with none of the epoch machinery.
//!
//! It is still only approximate relative to a serial run: each shard keeps
//! its own [`crate::pagemap::PageMap`], so first-touch NUMA domain
//! assignment and the resulting local/remote read classification can differ
//! from what a single engine would have recorded for the same trace.

use crate::addr::AddressGeometry;
use crate::engine::AccessEngine;
use crate::error::CacheSimError;
use crate::prefetch::PrefetchKind;
use crate::stats::SystemStats;
use crate::trace::TraceRecord;

#[allow(clippy::too_many_arguments)]
pub fn run_sharded(
    records: &[TraceRecord],
    geometry: AddressGeometry,
    num_domains: usize,
    ways: usize,
    tid_to_domain: Vec<usize>,
    prefetch: PrefetchKind,
    count_compulsory: bool,
    addr_translation: bool,
    threads: usize,
) -> Result<SystemStats, CacheSimError> {
    let threads = threads.max(1);
    let mut shards: Vec<Vec<TraceRecord>> = vec![Vec::new(); threads];
    for record in records {
        let set = geometry.decode(record.address).set;
        shards[(set as usize) % threads].push(*record);
    }

    let results: Vec<Result<SystemStats, CacheSimError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = shards
            .into_iter()
            .filter(|shard| !shard.is_empty())
            .map(|shard| {
                let tid_to_domain = tid_to_domain.clone();
                scope.spawn(move || {
                    let mut engine = AccessEngine::new(
                        geometry,
                        num_domains,
                        ways,
                        tid_to_domain,
                        prefetch,
                        count_compulsory,
                        addr_translation,
                    )?;
                    for record in shard {
                        engine.validate_tid(record.tid)?;
                        engine.mem_access(record.address, record.access, record.tid);
                    }
                    Ok(*engine.stats())
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("shard worker panicked"))
            .collect()
    });

    let mut total = SystemStats::default();
    for shard_stats in results {
        total.merge(&shard_stats?);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addr::PageSize;
    use crate::coherence::AccessKind;

    #[test]
    fn shards_partition_by_set_and_sum_stats() {
        let geometry = AddressGeometry::new(64, 128, 4, PageSize::FourKiB).unwrap();
        let records: Vec<TraceRecord> = (0..64)
            .map(|i| TraceRecord {
                access: AccessKind::Read,
                address: i * 64,
                tid: 0,
            })
            .collect();
        let stats = run_sharded(
            &records,
            geometry,
            1,
            4,
            vec![0],
            PrefetchKind::None,
            false,
            false,
            4,
        )
        .unwrap();
        assert_eq!(stats.accesses, 64);
    }
}
