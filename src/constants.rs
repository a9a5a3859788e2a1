/// Default line size in bytes, used when the CLI doesn't override it.
pub const DEFAULT_LINE_SIZE: u64 = 64;
/// Default total cache capacity in lines.
pub const DEFAULT_NUM_LINES: u64 = 128;
/// Default associativity (ways per set).
pub const DEFAULT_ASSOC: u64 = 4;

/// 4 KiB pages, matching the common case in `original_source`.
pub const PAGE_MASK_4K: u64 = !0xFFFu64;
/// 2 MiB huge pages, the alternate geometry the spec allows at build time.
pub const PAGE_MASK_2M: u64 = !0x1F_FFFFu64;

/// Number of follow-on lines the sequential-stream prefetcher issues per
/// qualifying miss (`original_source/seq_prefetch_system.cpp`).
pub const SEQ_PREFETCH_DEGREE: u64 = 3;

/// How often the CLI driver logs progress while draining a trace.
pub const PROGRESS_LOG_INTERVAL: u64 = 1_000_000;
