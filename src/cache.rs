//! Per-cache set-associative storage with true LRU.
//!
//! Grounded on `src/simulate/cache.rs`'s `SetAssociativeCache`, which already
//! wraps `lru::LruCache<u64, ()>` per set for O(1) true-LRU bookkeeping; this
//! module generalizes the stored value from `()` to [`CacheLineState`] so a
//! set can hold MOESI state per line instead of a bare presence bit.

use lru::LruCache;
use std::num::NonZeroUsize;

/// MOESI line state. `Invalid` is deliberately both "never held this tag"
/// and "held it, then downgraded" — the cache set doesn't distinguish them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CacheLineState {
    Modified,
    Owned,
    Exclusive,
    Shared,
    #[default]
    Invalid,
}

impl CacheLineState {
    pub fn is_valid(self) -> bool {
        self != CacheLineState::Invalid
    }
}

/// One set: exactly `ways` slots, true LRU order, tags of non-Invalid
/// entries unique within the set.
pub struct CacheSet {
    entries: LruCache<u64, CacheLineState>,
}

impl CacheSet {
    fn new(ways: usize) -> Self {
        CacheSet {
            entries: LruCache::new(NonZeroUsize::new(ways).expect("ways must be > 0")),
        }
    }

    /// Scans the set for `tag`; returns `Invalid` if absent or downgraded.
    /// Doesn't touch LRU order.
    pub fn find_tag(&self, tag: u64) -> CacheLineState {
        self.entries.peek(&tag).copied().unwrap_or_default()
    }

    /// If a non-Invalid entry with this tag exists, set its state. No-op
    /// otherwise. Doesn't touch LRU order — downgrading to Invalid leaves
    /// the stale entry exactly where it was.
    pub fn change_state(&mut self, tag: u64, new_state: CacheLineState) {
        if let Some(slot) = self.entries.peek_mut(&tag) {
            if slot.is_valid() {
                *slot = new_state;
            }
        }
    }

    /// Precondition: `tag` is present and non-Invalid. Moves it to MRU.
    pub fn update_lru(&mut self, tag: u64) {
        debug_assert!(self.find_tag(tag).is_valid(), "updateLRU on absent tag");
        self.entries.promote(&tag);
    }

    /// `true` iff the current LRU entry is Modified or Owned. The evicted
    /// tag is returned regardless, matching the slot that `insert_line`
    /// will actually replace. When the set isn't yet full there is no real
    /// eviction coming, so this reports `(false, 0)`.
    pub fn check_writeback(&self) -> (bool, u64) {
        if self.entries.len() < self.entries.cap().get() {
            return (false, 0);
        }
        match self.entries.peek_lru() {
            Some((&tag, &state)) => {
                let needs_writeback =
                    state == CacheLineState::Modified || state == CacheLineState::Owned;
                (needs_writeback, tag)
            }
            None => (false, 0),
        }
    }

    /// Evicts the LRU entry (if the set is full) and inserts `{tag, state}`
    /// at MRU. Precondition: `tag` isn't already present with a non-Invalid
    /// state — `lru::LruCache::put` would otherwise silently overwrite it.
    pub fn insert_line(&mut self, tag: u64, state: CacheLineState) {
        debug_assert!(
            !self.find_tag(tag).is_valid(),
            "insertLine on a tag already resident"
        );
        self.entries.put(tag, state);
    }
}

/// One domain's cache: `sets` sets x `ways` ways.
pub struct Cache {
    sets: Vec<CacheSet>,
    ways: usize,
}

impl Cache {
    pub fn new(num_sets: u64, ways: usize) -> Self {
        let sets = (0..num_sets).map(|_| CacheSet::new(ways)).collect();
        Cache { sets, ways }
    }

    pub fn ways(&self) -> usize {
        self.ways
    }

    pub fn num_sets(&self) -> usize {
        self.sets.len()
    }

    pub fn set(&self, idx: u64) -> &CacheSet {
        &self.sets[idx as usize]
    }

    pub fn set_mut(&mut self, idx: u64) -> &mut CacheSet {
        &mut self.sets[idx as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CacheLineState::*;

    #[test]
    fn fills_without_eviction_then_evicts_lru() {
        let mut cache = Cache::new(1, 4);
        for tag in 0..4 {
            let set = cache.set_mut(0);
            assert_eq!(set.check_writeback(), (false, 0));
            set.insert_line(tag, Exclusive);
        }
        // Fifth distinct tag must evict tag 0 (oldest, never bumped).
        let set = cache.set_mut(0);
        let (needs_wb, evicted) = set.check_writeback();
        assert!(!needs_wb); // Exclusive isn't dirty
        assert_eq!(evicted, 0);
        set.insert_line(4, Exclusive);
        assert_eq!(set.find_tag(0), Invalid);
        assert_eq!(set.find_tag(1), Exclusive);
    }

    #[test]
    fn update_lru_protects_from_eviction() {
        let mut cache = Cache::new(1, 2);
        let set = cache.set_mut(0);
        set.insert_line(0, Exclusive);
        set.insert_line(1, Exclusive);
        // Touch tag 0 so tag 1 becomes LRU instead.
        set.update_lru(0);
        let (_, evicted) = set.check_writeback();
        assert_eq!(evicted, 1);
    }

    #[test]
    fn writeback_needed_for_modified_or_owned_lru() {
        let mut cache = Cache::new(1, 1);
        let set = cache.set_mut(0);
        set.insert_line(0, Modified);
        let (needs_wb, evicted) = set.check_writeback();
        assert!(needs_wb);
        assert_eq!(evicted, 0);
    }

    #[test]
    fn change_state_is_noop_on_absent_or_invalid_tag() {
        let mut cache = Cache::new(1, 2);
        let set = cache.set_mut(0);
        set.change_state(42, Modified); // absent: no-op, and must not panic
        assert_eq!(set.find_tag(42), Invalid);
        set.insert_line(42, Shared);
        set.change_state(42, Modified);
        assert_eq!(set.find_tag(42), Modified);
    }
}
