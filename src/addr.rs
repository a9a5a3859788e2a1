//! Address decoding: geometry constants derived once from `line_size` /
//! `num_lines` / `assoc`, and the pure `(set, tag, page)` split.
//!
//! Grounded on `original_source/system.h`'s `SET_MASK`/`TAG_MASK`/`LINE_MASK`/
//! `SET_SHIFT` fields, computed once in the `System` constructor.

use crate::constants::{PAGE_MASK_2M, PAGE_MASK_4K};
use crate::error::CacheSimError;

/// Page granularity used to classify addresses into NUMA pages. The spec
/// allows either and calls the choice a build-time one; here it's a
/// construction parameter of `AddressGeometry`, which is strictly more
/// flexible and still lets a binary commit to one value for its lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
#[clap(rename_all = "verbatim")]
pub enum PageSize {
    FourKiB,
    TwoMiB,
}

impl PageSize {
    fn mask(self) -> u64 {
        match self {
            PageSize::FourKiB => PAGE_MASK_4K,
            PageSize::TwoMiB => PAGE_MASK_2M,
        }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::FourKiB
    }
}

/// Derived masks and shifts for one cache's address geometry. Two caches in
/// the same engine with different `line_size`/`num_sets` would each get
/// their own `AddressGeometry`, but in practice every cache in a run shares
/// one geometry (the CLI only exposes a single `--line-size`/`--num-lines`).
#[derive(Clone, Copy, Debug)]
pub struct AddressGeometry {
    line_mask: u64,
    set_shift: u32,
    set_mask: u64,
    tag_mask: u64,
    page_mask: u64,
    num_sets: u64,
}

impl AddressGeometry {
    /// `num_sets = num_lines / assoc`. Fails with `ConfigInvalid` unless
    /// `line_size` is a power of two, `num_lines` is a multiple of `assoc`,
    /// and `num_sets` is itself a power of two (spec §4.1).
    pub fn new(
        line_size: u64,
        num_lines: u64,
        assoc: u64,
        page_size: PageSize,
    ) -> Result<Self, CacheSimError> {
        if line_size == 0 || !line_size.is_power_of_two() {
            return Err(CacheSimError::ConfigInvalid(format!(
                "line_size {line_size} is not a power of two"
            )));
        }
        if assoc == 0 || num_lines % assoc != 0 {
            return Err(CacheSimError::ConfigInvalid(format!(
                "num_lines {num_lines} is not a multiple of assoc {assoc}"
            )));
        }
        let num_sets = num_lines / assoc;
        if num_sets == 0 || !num_sets.is_power_of_two() {
            return Err(CacheSimError::ConfigInvalid(format!(
                "num_lines/assoc ({num_sets}) is not a power of two"
            )));
        }

        let line_mask = line_size - 1;
        let set_shift = line_size.trailing_zeros();
        let set_mask = (num_sets - 1) << set_shift;
        let tag_mask = !(set_mask | line_mask);

        Ok(AddressGeometry {
            line_mask,
            set_shift,
            set_mask,
            tag_mask,
            page_mask: page_size.mask(),
            num_sets,
        })
    }

    pub fn num_sets(&self) -> u64 {
        self.num_sets
    }

    pub fn set_shift(&self) -> u32 {
        self.set_shift
    }

    pub fn line_mask(&self) -> u64 {
        self.line_mask
    }

    /// One line's worth of address stride in the set-index bit position —
    /// the increment the prefetchers use to walk to the "next line".
    pub fn line_step(&self) -> u64 {
        1 << self.set_shift
    }

    pub fn decode(&self, addr: u64) -> DecodedAddress {
        DecodedAddress {
            set: (addr & self.set_mask) >> self.set_shift,
            tag: addr & self.tag_mask,
            page: addr & self.page_mask,
        }
    }

    pub fn page_of(&self, addr: u64) -> u64 {
        addr & self.page_mask
    }

    pub fn page_mask(&self) -> u64 {
        self.page_mask
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedAddress {
    pub set: u64,
    pub tag: u64,
    pub page: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> AddressGeometry {
        // line_size=64, num_lines=128, assoc=4 => 32 sets, set_shift=6.
        AddressGeometry::new(64, 128, 4, PageSize::FourKiB).unwrap()
    }

    #[test]
    fn decodes_scenario_geometry() {
        let g = geometry();
        assert_eq!(g.num_sets(), 32);
        assert_eq!(g.set_shift(), 6);
        let d = g.decode(0x0001_0000_0000_0000);
        assert_eq!(d.set, 0);
    }

    #[test]
    fn rejects_non_power_of_two_line_size() {
        assert!(AddressGeometry::new(63, 128, 4, PageSize::FourKiB).is_err());
    }

    #[test]
    fn rejects_assoc_not_dividing_num_lines() {
        assert!(AddressGeometry::new(64, 130, 4, PageSize::FourKiB).is_err());
    }

    #[test]
    fn rejects_non_power_of_two_set_count() {
        // num_lines/assoc = 3, not a power of two.
        assert!(AddressGeometry::new(64, 96, 32, PageSize::FourKiB).is_err());
    }
}
