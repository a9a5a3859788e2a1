//! Orchestrates one memory access end to end: address translation,
//! first-touch NUMA recording, decode, hit/miss classification, the MOESI
//! transition table, LRU maintenance and prefetch dispatch.
//!
//! Grounded on `original_source/seq_prefetch_system.cpp`'s `memAccess`,
//! which is the fullest of the three `System` subclasses (it's the only
//! one that exercises compulsory-miss counting, address translation and a
//! stateful prefetcher together). The step order here — decode, compulsory
//! check, hit path (write-invalidate, LRU touch, prefetch-on-hit), miss
//! path (prefetch-on-miss *before* the remote scan, then scan, writeback
//! classification, MOESI transition, insert) — follows that function's
//! order exactly; see spec §4.6.
//!
//! `mem_access` itself never fails — the core loop isn't supposed to reject
//! a well-formed trace record mid-replay. Its one real precondition, that
//! `tid` has an entry in the thread-to-domain table, is the driver's job to
//! check upfront via `validate_tid` before calling in.

use crate::addr::AddressGeometry;
use crate::cache::{Cache, CacheLineState};
use crate::coherence::{AccessKind, CoherenceEngine, FillTraffic};
use crate::error::CacheSimError;
use crate::pagemap::PageMap;
use crate::prefetch::{PrefetchKind, Prefetcher};
use crate::stats::SystemStats;
use log::trace;

/// One simulated system: per-domain caches sharing one address geometry,
/// a first-touch NUMA page map, and an optional hardware prefetcher.
pub struct AccessEngine {
    geometry: AddressGeometry,
    caches: Vec<Cache>,
    page_map: PageMap,
    tid_to_domain: Vec<usize>,
    prefetcher: Option<Box<dyn Prefetcher>>,
    seen_lines: std::collections::HashSet<u64>,
    count_compulsory: bool,
    addr_translation: bool,
    stats: SystemStats,
}

impl AccessEngine {
    pub fn new(
        geometry: AddressGeometry,
        num_domains: usize,
        ways: usize,
        tid_to_domain: Vec<usize>,
        prefetch_kind: PrefetchKind,
        count_compulsory: bool,
        addr_translation: bool,
    ) -> Result<Self, CacheSimError> {
        if num_domains == 0 {
            return Err(CacheSimError::ConfigInvalid(
                "num_domains must be at least 1".into(),
            ));
        }
        let caches = (0..num_domains)
            .map(|_| Cache::new(geometry.num_sets(), ways))
            .collect();
        Ok(AccessEngine {
            geometry,
            caches,
            page_map: PageMap::new(geometry.page_mask()),
            tid_to_domain,
            prefetcher: Some(prefetch_kind.build()),
            seen_lines: std::collections::HashSet::new(),
            count_compulsory,
            addr_translation,
            stats: SystemStats::default(),
        })
    }

    pub fn geometry(&self) -> &AddressGeometry {
        &self.geometry
    }

    pub fn stats(&self) -> &SystemStats {
        &self.stats
    }

    pub fn num_domains(&self) -> usize {
        self.caches.len()
    }

    /// Checks whether `tid` has an entry in the thread-to-domain table.
    /// Callers driving a trace must call this before `mem_access`/
    /// `prefetch_read` — those never fail, so out-of-range tids must be
    /// rejected upfront rather than discovered mid-access.
    pub fn validate_tid(&self, tid: u32) -> Result<(), CacheSimError> {
        if (tid as usize) < self.tid_to_domain.len() {
            Ok(())
        } else {
            Err(CacheSimError::TidOutOfRange {
                tid,
                table_len: self.tid_to_domain.len(),
            })
        }
    }

    /// The public entry point: a real (non-prefetch) access from a trace.
    /// Never fails; callers are expected to have called `validate_tid` first.
    pub fn mem_access(&mut self, addr: u64, access: AccessKind, tid: u32) {
        self.mem_access_inner(addr, access, tid, false)
    }

    /// Called back by a [`Prefetcher`] to issue a synthetic read. Recursion
    /// is bounded to depth 1: the engine only invokes prefetcher callbacks
    /// for non-prefetch accesses, so a prefetch-issued access never itself
    /// triggers another prefetch.
    pub fn prefetch_read(&mut self, addr: u64, tid: u32) {
        // tid was already validated by the triggering non-prefetch access.
        self.mem_access_inner(addr, AccessKind::Read, tid, true);
    }

    fn mem_access_inner(&mut self, addr: u64, access: AccessKind, tid: u32, is_prefetch: bool) {
        debug_assert!(
            (tid as usize) < self.tid_to_domain.len(),
            "tid {tid} has no entry in the thread-to-domain table (len {})",
            self.tid_to_domain.len()
        );
        let local = self.tid_to_domain[tid as usize];

        let addr = if self.addr_translation {
            self.page_map.virt_to_phys(addr)
        } else {
            addr
        };

        if !is_prefetch {
            self.stats.accesses += 1;
        }

        let page = self.geometry.page_of(addr);
        self.page_map.record_first_touch(page, local);

        let decoded = self.geometry.decode(addr);
        let set = decoded.set;
        let tag = decoded.tag;

        let hit = self.caches[local].set(set).find_tag(tag).is_valid();

        if self.count_compulsory && !is_prefetch {
            let line = addr & !self.geometry.line_mask();
            if self.seen_lines.insert(line) {
                self.stats.compulsory += 1;
            }
        }

        if hit {
            if access == AccessKind::Write {
                self.caches[local]
                    .set_mut(set)
                    .change_state(tag, CacheLineState::Modified);
                crate::coherence::invalidate_all_peers(&mut self.caches, local, set, tag);
            }
            self.caches[local].set_mut(set).update_lru(tag);

            if !is_prefetch {
                self.stats.hits += 1;
                trace!("hit domain={local} set={set} tag={tag:#x}");
                let issued = self.run_on_hit(addr, tid);
                self.stats.prefetched += issued as u64;
            }
            return;
        }

        if !is_prefetch {
            let issued = self.run_on_miss(addr, tid);
            self.stats.prefetched += issued as u64;
        }

        let (peer_state, peer_index) = CoherenceEngine::scan_peers(&self.caches, local, set, tag);

        let (needs_writeback, evicted_tag) = self.caches[local].set(set).check_writeback();
        if needs_writeback && !is_prefetch {
            let evicted_addr = (set << self.geometry.set_shift()) | evicted_tag;
            let evicted_page = self.geometry.page_of(evicted_addr);
            let writer = self.page_map.domain_of(evicted_page);
            if writer == local {
                self.stats.local_writes += 1;
            } else {
                self.stats.remote_writes += 1;
            }
        }

        let local_traffic = self.page_map.domain_of(page) == local;
        let (new_state, traffic) = CoherenceEngine::transition(
            &mut self.caches,
            local,
            set,
            tag,
            peer_state,
            peer_index,
            access,
        );

        if !is_prefetch {
            match traffic {
                FillTraffic::LocalOrRemote if local_traffic => self.stats.local_reads += 1,
                FillTraffic::LocalOrRemote => self.stats.remote_reads += 1,
                FillTraffic::OtherCache => self.stats.othercache_reads += 1,
            }
            trace!("miss domain={local} set={set} tag={tag:#x} -> {new_state:?}");
        }

        self.caches[local].set_mut(set).insert_line(tag, new_state);
    }

    /// Runs the prefetcher's hit callback, temporarily taking ownership of
    /// it out of `self` so the callback can hold `&mut self` without
    /// aliasing `self.prefetcher`.
    fn run_on_hit(&mut self, addr: u64, tid: u32) -> u32 {
        let mut prefetcher = self.prefetcher.take().expect("prefetcher always present");
        let issued = prefetcher.on_hit(addr, tid, self);
        self.prefetcher = Some(prefetcher);
        issued
    }

    fn run_on_miss(&mut self, addr: u64, tid: u32) -> u32 {
        let mut prefetcher = self.prefetcher.take().expect("prefetcher always present");
        let issued = prefetcher.on_miss(addr, tid, self);
        self.prefetcher = Some(prefetcher);
        issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addr::PageSize;

    fn engine(num_domains: usize) -> AccessEngine {
        let geometry = AddressGeometry::new(64, 128, 4, PageSize::FourKiB).unwrap();
        AccessEngine::new(
            geometry,
            num_domains,
            4,
            vec![0; num_domains],
            PrefetchKind::None,
            false,
            false,
        )
        .unwrap()
    }

    #[test]
    fn compulsory_miss_counted_once_per_line() {
        let mut e = engine(1);
        e.count_compulsory = true;
        e.mem_access(0x1000, AccessKind::Read, 0);
        e.mem_access(0x1000, AccessKind::Read, 0);
        e.mem_access(0x1040, AccessKind::Read, 0);
        assert_eq!(e.stats().compulsory, 2);
        assert_eq!(e.stats().hits, 1);
    }

    #[test]
    fn single_domain_read_then_write_is_exclusive_then_modified() {
        let mut e = engine(1);
        e.mem_access(0x2000, AccessKind::Read, 0);
        assert_eq!(e.stats().local_reads, 1);
        assert_eq!(e.caches[0].set(0).find_tag(0x2000 & !0x3F), CacheLineState::Exclusive);
        e.mem_access(0x2000, AccessKind::Write, 0);
        assert_eq!(e.stats().hits, 1);
        assert_eq!(e.caches[0].set(0).find_tag(0x2000 & !0x3F), CacheLineState::Modified);
    }

    #[test]
    fn second_domain_read_after_modified_gets_shared_and_demotes_to_owned() {
        let mut e = engine(2);
        e.tid_to_domain = vec![0, 1];
        e.mem_access(0x2000, AccessKind::Write, 0);
        e.mem_access(0x2000, AccessKind::Read, 1);
        assert_eq!(e.stats().othercache_reads, 1);
        let tag = 0x2000 & !0x3F;
        assert_eq!(e.caches[1].set(0).find_tag(tag), CacheLineState::Shared);
        assert_eq!(e.caches[0].set(0).find_tag(tag), CacheLineState::Owned);
    }

    #[test]
    fn out_of_range_tid_fails_validation() {
        let e = engine(1);
        let err = e.validate_tid(5).unwrap_err();
        assert!(matches!(err, CacheSimError::TidOutOfRange { tid: 5, .. }));
        assert!(e.validate_tid(0).is_ok());
    }

    #[test]
    fn adjacent_prefetcher_issues_on_every_miss() {
        let geometry = AddressGeometry::new(64, 128, 4, PageSize::FourKiB).unwrap();
        let mut e = AccessEngine::new(
            geometry,
            1,
            4,
            vec![0],
            PrefetchKind::Adjacent,
            false,
            false,
        )
        .unwrap();
        e.mem_access(0x10000, AccessKind::Read, 0);
        // The original access plus its one prefetched line.
        assert_eq!(e.stats().prefetched, 1);
        let next = 0x10000 + e.geometry().line_step();
        let tag = e.geometry().decode(next).tag;
        let set = e.geometry().decode(next).set;
        assert_eq!(e.caches[0].set(set).find_tag(tag), CacheLineState::Exclusive);
    }
}
