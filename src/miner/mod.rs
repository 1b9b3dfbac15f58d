// src/miner/mod.rs
//! Core mining functionality
//!
//! This module contains all components related to the mining process:
//! - The Cuckoo Cycle graph, verifier and shared solver table
//! - Work decoded from block templates, targets and block assembly
//! - Job scheduling, worker threads and the event bus tying them together

/// Cuckoo Cycle graph and solver state
pub mod algorithm;

/// Coinbase, merkle root, header and block serialisation
pub mod block;

/// Typed lifecycle events and the bus that carries them
pub mod event;

/// Mining job scheduler
///
/// Runs one job at a time, starting and joining a full set of workers per
/// job, and reacts to events from the work source and the submitter.
pub mod scheduler;

/// Compact difficulty targets
pub mod target;

/// Work built from a block template
pub mod work;

/// Worker thread implementation
///
/// Contains the per-thread edge insertion loop. Workers share a job's
/// cuckoo table and publish found solutions on the event bus.
pub mod worker;

// Re-export main components for cleaner imports
pub use self::algorithm::{CuckooParams, Graph, SolveState};
pub use self::block::{BlockCandidate, CoinbaseConfig};
pub use self::event::{EventBus, Notification};
pub use self::scheduler::Scheduler;
pub use self::target::Target;
pub use self::work::Work;
pub use self::worker::{Job, Worker, WorkerExit};
