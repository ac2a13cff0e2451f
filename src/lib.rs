//! Tunnel experiment statistics library
//!
//! Turns per-experiment relay, protocol and bitrate logs into time series,
//! running summaries, box-plot groups and loss counters.

pub mod aggregate;
pub mod core;
pub mod error;
pub mod reader;
pub mod registry;
pub mod stats;
pub mod ui;
pub mod utils;

pub use core::{run_analysis, RunOptions, RunSummary};
pub use error::{Result, StatsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
