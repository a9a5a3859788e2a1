#[macro_use]
extern crate log;

pub mod addr;
pub mod cache;
pub mod cli;
pub mod constants;
pub mod coherence;
pub mod engine;
pub mod error;
pub mod pagemap;
pub mod parallel;
pub mod prefetch;
pub mod stats;
pub mod trace;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub use crate::addr::{AddressGeometry, DecodedAddress, PageSize};
pub use crate::cli::Args;
pub use crate::engine::AccessEngine;
pub use crate::error::CacheSimError;
pub use crate::stats::SystemStats;
