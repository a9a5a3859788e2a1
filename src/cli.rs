//! Command-line surface. Shape and the `num_parser` base-prefixed integer
//! parser are taken verbatim from the teacher's own `cli.rs`; the
//! argument set is new, scoped to this domain.

use crate::addr::PageSize;
use crate::prefetch::PrefetchKind;
use clap::{Parser, ValueEnum};

static NUM_PARSER_ERR: &str = "Invalid number. Must be base-10, or start with 0x or 0b.";

fn num_parser(s: &str) -> Result<u64, &'static str> {
    match s.get(0..2) {
        Some("0x") => u64::from_str_radix(&s[2..], 16).map_err(|_| NUM_PARSER_ERR),
        Some("0b") => u64::from_str_radix(&s[2..], 2).map_err(|_| NUM_PARSER_ERR),
        _ => s.parse::<u64>().map_err(|_| NUM_PARSER_ERR),
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum, Debug, Default)]
#[clap(rename_all = "verbatim")]
pub enum TraceFormat {
    #[default]
    Binary,
    Text,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the trace file to replay.
    pub trace_path: String,

    /// Trace file encoding.
    #[arg(long, value_enum, default_value = "Binary")]
    pub trace_format: TraceFormat,

    /// Cache line size in bytes. Must be a power of two.
    #[arg(long, default_value_t = crate::constants::DEFAULT_LINE_SIZE, value_parser = num_parser)]
    pub line_size: u64,

    /// Total number of cache lines per domain.
    #[arg(long, default_value_t = crate::constants::DEFAULT_NUM_LINES, value_parser = num_parser)]
    pub num_lines: u64,

    /// Set associativity. `num_lines` must be a multiple of this.
    #[arg(long, default_value_t = crate::constants::DEFAULT_ASSOC, value_parser = num_parser)]
    pub assoc: u64,

    /// NUMA page granularity used for first-touch domain tracking.
    #[arg(long, value_enum, default_value = "FourKiB")]
    pub page_size: PageSize,

    /// Number of coherent cache domains to simulate.
    #[arg(long, default_value_t = 1)]
    pub num_domains: usize,

    /// Maps trace thread ids to domains: `tid_to_domain[tid] = domain`.
    /// Repeat the flag once per tid, in order. If left empty, the driver
    /// defaults it to an all-zero table of length `num_domains`.
    #[arg(long, value_delimiter = ',')]
    pub tid_to_domain: Vec<usize>,

    /// Hardware prefetcher model.
    #[arg(long, value_enum, default_value = "None")]
    pub prefetch: PrefetchKind,

    /// Track and report compulsory (first-reference) misses. Doubles the
    /// per-access bookkeeping cost.
    #[arg(long, default_value_t = false)]
    pub count_compulsory: bool,

    /// Route every address through a first-touch virtual-to-physical page
    /// remap before decoding it.
    #[arg(long, default_value_t = false)]
    pub addr_translation: bool,

    /// Shard the trace across worker threads instead of running it on a
    /// single engine. Approximate: coherence traffic is only tracked within
    /// a shard, not across shards.
    #[arg(long, default_value_t = false)]
    pub parallel: bool,

    /// Worker thread count for `--parallel`. Defaults to the number of
    /// logical CPUs.
    #[arg(long, default_value_t = num_cpus::get())]
    pub threads: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_binary_literals() {
        assert_eq!(num_parser("0x40").unwrap(), 64);
        assert_eq!(num_parser("0b1000").unwrap(), 8);
        assert_eq!(num_parser("128").unwrap(), 128);
        assert!(num_parser("not-a-number").is_err());
    }

    #[test]
    fn default_args_parse_with_only_a_trace_path() {
        let args = Args::parse_from(["cachesim", "trace.bin"]);
        assert_eq!(args.trace_path, "trace.bin");
        assert_eq!(args.line_size, crate::constants::DEFAULT_LINE_SIZE);
        assert_eq!(args.num_domains, 1);
        assert!(!args.parallel);
    }
}
