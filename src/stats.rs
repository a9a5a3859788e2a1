//! Run-wide counters and their textual report.
//!
//! Field set is grounded on `original_source/system.h`'s `SystemStats`
//! (hits/local_reads/remote_reads/othercache_reads/local_writes/
//! remote_writes/compulsory); `prefetched` is this crate's own addition
//! to make prefetcher effectiveness visible. The box-drawing report isn't
//! from the teacher — it's adapted from `JM4ier-mmu/src/cli.rs::print_box`,
//! the closest pack example for a human-readable summary dump.

use std::fmt;

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemStats {
    pub accesses: u64,
    pub hits: u64,
    pub local_reads: u64,
    pub remote_reads: u64,
    pub othercache_reads: u64,
    pub local_writes: u64,
    pub remote_writes: u64,
    pub compulsory: u64,
    pub prefetched: u64,
}

impl SystemStats {
    pub fn misses(&self) -> u64 {
        self.accesses.saturating_sub(self.hits)
    }

    pub fn hit_rate(&self) -> f64 {
        if self.accesses == 0 {
            0.0
        } else {
            self.hits as f64 / self.accesses as f64
        }
    }

    /// Adds `other`'s counters into `self`, for combining independent
    /// shards of a sharded run.
    pub fn merge(&mut self, other: &SystemStats) {
        self.accesses += other.accesses;
        self.hits += other.hits;
        self.local_reads += other.local_reads;
        self.remote_reads += other.remote_reads;
        self.othercache_reads += other.othercache_reads;
        self.local_writes += other.local_writes;
        self.remote_writes += other.remote_writes;
        self.compulsory += other.compulsory;
        self.prefetched += other.prefetched;
    }
}

impl fmt::Display for SystemStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "accesses:        {}", self.accesses)?;
        writeln!(f, "hits:            {}", self.hits)?;
        writeln!(f, "misses:          {}", self.misses())?;
        writeln!(f, "hit rate:        {:.4}", self.hit_rate())?;
        writeln!(f, "local reads:     {}", self.local_reads)?;
        writeln!(f, "remote reads:    {}", self.remote_reads)?;
        writeln!(f, "other-cache reads: {}", self.othercache_reads)?;
        writeln!(f, "local writes:    {}", self.local_writes)?;
        writeln!(f, "remote writes:   {}", self.remote_writes)?;
        writeln!(f, "compulsory misses: {}", self.compulsory)?;
        write!(f, "prefetched lines: {}", self.prefetched)
    }
}

/// Renders `content`'s `Display` output framed in a titled box, matching
/// the pack's `print_box` helper rather than any teacher idiom.
pub fn print_box(title: &str, content: impl fmt::Display) -> String {
    let content = format!("{}", content);
    let lines: Vec<_> = content.lines().collect();
    let width = lines
        .iter()
        .map(|l| l.len())
        .max()
        .unwrap_or(0)
        .max(4 + title.len())
        + 1;
    let mut buf = String::new();

    buf += "\u{256d}\u{2500}";
    buf += title;
    for _ in 0..(width - title.len()) {
        buf += "\u{2500}";
    }
    buf += "\u{256e}\n";

    for line in lines {
        buf += "\u{2502} ";
        buf += line;
        for _ in 0..(width - line.len()) {
            buf += " ";
        }
        buf += "\u{2502}\n";
    }
    buf += "\u{2570}";
    for _ in 0..=width {
        buf += "\u{2500}";
    }
    buf += "\u{256f}";
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_is_zero_with_no_accesses() {
        let stats = SystemStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn misses_is_accesses_minus_hits() {
        let stats = SystemStats {
            accesses: 10,
            hits: 7,
            ..Default::default()
        };
        assert_eq!(stats.misses(), 3);
        assert!((stats.hit_rate() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn print_box_frames_every_line() {
        let rendered = print_box("stats", "a\nbb");
        assert!(rendered.starts_with('\u{256d}'));
        assert!(rendered.contains('a'));
        assert!(rendered.contains("bb"));
    }
}
