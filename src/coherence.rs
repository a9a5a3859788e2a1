//! Peer-cache lookup and the MOESI transition table.
//!
//! Grounded on `original_source/system.cpp`'s `checkRemoteStates`/
//! `processMESI`, expanded from the original's MESI-only multi-cache path to
//! full MOESI (spec §4.4) — the original collapses Owned into Modified's
//! read-share case; this keeps Owned as its own state since the reduction to
//! the single-cache fast path only needs Exclusive/Modified anyway.

use crate::cache::{Cache, CacheLineState};
use smallvec::SmallVec;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
}

/// Which stat bucket a miss's fill traffic lands in. Eviction writebacks are
/// classified separately by the engine, not here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillTraffic {
    /// `local_reads` or `remote_reads`, chosen by `local_traffic`.
    LocalOrRemote,
    /// `othercache_reads` — a peer held the line.
    OtherCache,
}

pub struct CoherenceEngine;

impl CoherenceEngine {
    /// Scans every cache but `local_domain` for `(set, tag)`. Priority
    /// Owned > Exclusive > Modified short-circuits on first sight; a
    /// Shared sighting is remembered but scanning continues in case a
    /// later peer holds Owned.
    pub fn scan_peers(
        caches: &[Cache],
        local_domain: usize,
        set: u64,
        tag: u64,
    ) -> (CacheLineState, Option<usize>) {
        let mut shared_holder = None;
        for (i, cache) in caches.iter().enumerate() {
            if i == local_domain {
                continue;
            }
            match cache.set(set).find_tag(tag) {
                CacheLineState::Owned => return (CacheLineState::Owned, Some(i)),
                CacheLineState::Exclusive => return (CacheLineState::Exclusive, Some(i)),
                CacheLineState::Modified => return (CacheLineState::Modified, Some(i)),
                CacheLineState::Shared => {
                    if shared_holder.is_none() {
                        shared_holder = Some(i);
                    }
                }
                CacheLineState::Invalid => {}
            }
        }
        match shared_holder {
            Some(i) => (CacheLineState::Shared, Some(i)),
            None => (CacheLineState::Invalid, None),
        }
    }

    /// Applies the MOESI transition table for one miss, mutating peer
    /// caches as the table's side effects require, and returns the new
    /// local line state plus which stat bucket the fill traffic belongs in.
    ///
    /// `peer_state`/`peer_index` must come from `scan_peers` for this same
    /// `(set, tag)`; in single-cache mode callers pass `(Invalid, None)` and
    /// this collapses to the MESI fast path (Read -> Exclusive, Write ->
    /// Modified), matching spec §4.6's single-cache fast path.
    pub fn transition(
        caches: &mut [Cache],
        local_domain: usize,
        set: u64,
        tag: u64,
        peer_state: CacheLineState,
        peer_index: Option<usize>,
        access: AccessKind,
    ) -> (CacheLineState, FillTraffic) {
        use AccessKind::*;
        use CacheLineState::*;

        match (peer_state, access) {
            (Invalid, Read) => (Exclusive, FillTraffic::LocalOrRemote),
            (Invalid, Write) => (Modified, FillTraffic::LocalOrRemote),
            (Shared, Read) => (Shared, FillTraffic::LocalOrRemote),
            (Shared, Write) => {
                invalidate_all_peers(caches, local_domain, set, tag);
                (Modified, FillTraffic::OtherCache)
            }
            (Modified, Read) => {
                let holder = peer_index.expect("Modified peer_state implies a holder");
                caches[holder].set_mut(set).change_state(tag, Owned);
                (Shared, FillTraffic::OtherCache)
            }
            (Owned, Read) => {
                let holder = peer_index.expect("Owned peer_state implies a holder");
                caches[holder].set_mut(set).change_state(tag, Owned);
                (Shared, FillTraffic::OtherCache)
            }
            (Exclusive, Read) => {
                let holder = peer_index.expect("Exclusive peer_state implies a holder");
                caches[holder].set_mut(set).change_state(tag, Shared);
                (Shared, FillTraffic::OtherCache)
            }
            (Modified | Owned | Exclusive, Write) => {
                invalidate_all_peers(caches, local_domain, set, tag);
                (Modified, FillTraffic::OtherCache)
            }
        }
    }
}

/// Invalidates `(set, tag)` in every cache but `local_domain`. Used both for
/// a write hit (promoting to Modified) and a write miss into Shared/M/O/E.
pub fn invalidate_all_peers(caches: &mut [Cache], local_domain: usize, set: u64, tag: u64) {
    let holders: SmallVec<[usize; 8]> = caches
        .iter()
        .enumerate()
        .filter(|&(i, c)| i != local_domain && c.set(set).find_tag(tag).is_valid())
        .map(|(i, _)| i)
        .collect();
    for i in holders {
        caches[i].set_mut(set).change_state(tag, CacheLineState::Invalid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheLineState::*;

    fn two_caches() -> Vec<Cache> {
        vec![Cache::new(1, 4), Cache::new(1, 4)]
    }

    #[test]
    fn write_invalidates_all_peers_holding_shared() {
        let mut caches = two_caches();
        caches[1].set_mut(0).insert_line(0xAB, Shared);
        invalidate_all_peers(&mut caches, 0, 0, 0xAB);
        assert_eq!(caches[1].set(0).find_tag(0xAB), Invalid);
    }

    #[test]
    fn modified_read_demotes_holder_to_owned() {
        let mut caches = two_caches();
        caches[1].set_mut(0).insert_line(0x10, Modified);
        let (new_state, traffic) = CoherenceEngine::transition(
            &mut caches,
            0,
            0,
            0x10,
            Modified,
            Some(1),
            AccessKind::Read,
        );
        assert_eq!(new_state, Shared);
        assert_eq!(traffic, FillTraffic::OtherCache);
        assert_eq!(caches[1].set(0).find_tag(0x10), Owned);
    }

    #[test]
    fn scan_peers_prefers_owned_over_shared() {
        let mut caches = vec![Cache::new(1, 4), Cache::new(1, 4), Cache::new(1, 4)];
        caches[1].set_mut(0).insert_line(1, Shared);
        caches[2].set_mut(0).insert_line(1, Owned);
        let (state, idx) = CoherenceEngine::scan_peers(&caches, 0, 0, 1);
        assert_eq!(state, Owned);
        assert_eq!(idx, Some(2));
    }
}
