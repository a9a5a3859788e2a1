use thiserror::Error;

/// Errors raised at construction, trace-record parse time, or by
/// `AccessEngine::validate_tid` when a driver checks a tid before handing it
/// to `mem_access`. `mem_access` itself never returns a `Result` — every one
/// of its preconditions (tid range included) is expected to already be
/// established by the caller and is checked with `debug_assert!` instead.
#[derive(Error, Debug)]
pub enum CacheSimError {
    #[error("invalid cache geometry: {0}")]
    ConfigInvalid(String),

    #[error("malformed trace record: {0}")]
    TraceMalformed(String),

    #[error("tid {tid} has no entry in the thread-to-domain table (len {table_len})")]
    TidOutOfRange { tid: u32, table_len: usize },
}
