//! Hardware prefetch models. Each variant re-enters [`crate::engine::AccessEngine`]
//! with synthetic reads; recursion is bounded to depth 1 because the engine
//! only invokes these callbacks for non-prefetch accesses (spec §4.5).
//!
//! Grounded on `original_source/prefetch.h`/`prefetch.cpp`,
//! `adj_prefetch_system.cpp` and `seq_prefetch_system.cpp`. The strategy
//! dispatch (a `clap::ValueEnum` matched once into a trait object) is the
//! teacher's `TracingLoopChoice` pattern (`src/mark.rs`, `src/cli.rs`).

use crate::constants::SEQ_PREFETCH_DEGREE;
use crate::engine::AccessEngine;

/// CLI-selectable prefetcher kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum)]
#[clap(rename_all = "verbatim")]
pub enum PrefetchKind {
    #[default]
    None,
    Adjacent,
    Sequential,
}

impl PrefetchKind {
    pub fn build(self) -> Box<dyn Prefetcher> {
        match self {
            PrefetchKind::None => Box::new(NullPrefetcher),
            PrefetchKind::Adjacent => Box::new(AdjacentPrefetcher),
            PrefetchKind::Sequential => Box::new(SequentialStreamPrefetcher::new()),
        }
    }
}

/// Shared contract: both callbacks return the number of prefetch accesses
/// issued. Implementations are stateful per-engine, not per-thread.
pub trait Prefetcher: Send {
    fn on_hit(&mut self, addr: u64, tid: u32, engine: &mut AccessEngine) -> u32;
    fn on_miss(&mut self, addr: u64, tid: u32, engine: &mut AccessEngine) -> u32;
}

pub struct NullPrefetcher;

impl Prefetcher for NullPrefetcher {
    fn on_hit(&mut self, _addr: u64, _tid: u32, _engine: &mut AccessEngine) -> u32 {
        0
    }
    fn on_miss(&mut self, _addr: u64, _tid: u32, _engine: &mut AccessEngine) -> u32 {
        0
    }
}

pub struct AdjacentPrefetcher;

impl Prefetcher for AdjacentPrefetcher {
    fn on_hit(&mut self, addr: u64, tid: u32, engine: &mut AccessEngine) -> u32 {
        self.on_miss(addr, tid, engine)
    }

    fn on_miss(&mut self, addr: u64, tid: u32, engine: &mut AccessEngine) -> u32 {
        let next = addr + engine.geometry().line_step();
        engine.prefetch_read(next, tid);
        1
    }
}

/// Models AMD's L1 prefetcher (`original_source/seq_prefetch_system.cpp`).
pub struct SequentialStreamPrefetcher {
    last_miss: u64,
    last_prefetch: u64,
}

impl SequentialStreamPrefetcher {
    pub fn new() -> Self {
        SequentialStreamPrefetcher {
            last_miss: 0,
            last_prefetch: 0,
        }
    }
}

impl Default for SequentialStreamPrefetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Prefetcher for SequentialStreamPrefetcher {
    fn on_miss(&mut self, addr: u64, tid: u32, engine: &mut AccessEngine) -> u32 {
        let geometry = *engine.geometry();
        let this = geometry.decode(addr);
        let last = geometry.decode(self.last_miss);
        let mut issued = 0;
        if this.tag == last.tag && this.set == last.set + 1 {
            let line_step = geometry.line_step();
            for k in 1..=SEQ_PREFETCH_DEGREE {
                engine.prefetch_read(addr + k * line_step, tid);
                issued += 1;
            }
            self.last_prefetch = addr + line_step;
        }
        self.last_miss = addr;
        issued as u32
    }

    fn on_hit(&mut self, addr: u64, tid: u32, engine: &mut AccessEngine) -> u32 {
        let geometry = *engine.geometry();
        let this = geometry.decode(addr);
        let last = geometry.decode(self.last_prefetch);
        if this.tag == last.tag && this.set == last.set {
            let line_step = geometry.line_step();
            engine.prefetch_read(addr + SEQ_PREFETCH_DEGREE * line_step, tid);
            self.last_prefetch += line_step;
            1
        } else {
            0
        }
    }
}
