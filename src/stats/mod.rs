//! Statistics collection and reporting module
//!
//! This module tracks solver throughput and block submissions:
//! - Edges processed, cycles closed, solutions and errors
//! - Accepted and attempted block submissions
//! - Hardware monitoring (CPU, memory, temperature)
//!
//! [`MiningCounters`] is shared with every solver thread; [`StatsReporter`]
//! logs the change in those counters on a fixed interval.

/// Submodule containing the statistics reporter implementation
pub mod reporter;

// Re-export main components
pub use reporter::{HardwareStats, IntervalReport, MiningCounters, MiningStats, StatsReporter};
