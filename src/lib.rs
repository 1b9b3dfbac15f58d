//! Cuckoo Miner - Cuckoo Cycle proof-of-work miner in Rust
//!
//! This crate provides a complete solo miner for Cuckoo Cycle chains:
//! - A multi-threaded cycle finder sharing one lock-free cuckoo table
//! - Independent cycle verification and target checks
//! - Long-polling block template client with retry and backoff
//! - Block assembly and submission
//! - Performance benchmarking and hardware monitoring

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Miner core implementation including the graph, solver and scheduling
pub mod miner;

/// Node communication: template polling and block submission
pub mod network;

/// Statistics collection and reporting functionality
pub mod stats;

/// Utility functions and error handling
pub mod utils;

/// Command-line interface definitions
pub mod cli;

/// Configuration management
pub mod config;

/// Shared type definitions
pub mod types;

// Core exports
pub use cli::Commands;
pub use config::Config;
pub use miner::{CuckooParams, EventBus, Notification, Scheduler, Work, Worker};
pub use network::{NodeClient, Poller};
pub use stats::{HardwareStats, MiningStats, StatsReporter};
pub use types::Solution;
pub use utils::{MinerError, init_logging};
