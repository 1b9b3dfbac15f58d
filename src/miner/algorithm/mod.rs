// src/miner/algorithm/mod.rs
//! Cuckoo Cycle implementation
//!
//! This module contains the graph side of the proof of work:
//! - SipHash-2-4 keyed from the block header
//! - The bipartite edge generator and cycle verifier
//! - The shared cuckoo table used by the solver threads

/// SipHash-2-4 keyed by the SHA-256 of a block header
pub mod siphash;

/// Bipartite graph edge generation and cycle verification
///
/// The graph is never materialised; edges are regenerated from their nonce.
pub mod graph;

/// Shared per-job solver state
///
/// Holds the cuckoo table shared by all solver threads of a job, path
/// following and solution reconstruction.
pub mod solve;

pub use self::graph::{Edge, Graph};
pub use self::solve::SolveState;

use crate::utils::error::MinerError;
use thiserror::Error;

/// Cycle length of a valid proof on the network
pub const PROOF_SIZE: usize = 42;

/// Default graph size exponent (nodes per partition = 2^24)
pub const DEFAULT_EDGE_BITS: u8 = 24;

/// Hard cap on the length of a followed path
pub const MAX_PATH_LEN: usize = 4096;

/// Anomalies found while following a path through the cuckoo table
///
/// Both abort the edge being inserted; they are kept apart because they
/// point at different causes.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleError {
    /// The path ran into the cap without revisiting a node
    #[error("maximum path length {max} exceeded")]
    PathTooLong {
        /// Path cap that was hit
        max: usize,
    },

    /// The path looped back on itself, which the table must never contain
    #[error("illegal {0}-cycle")]
    IllegalCycle(usize),
}

/// Size parameters of a cuckoo graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CuckooParams {
    /// log2 of the number of nodes in each partition
    pub edge_bits: u8,
    /// Required cycle length
    pub proof_size: usize,
}

impl CuckooParams {
    /// Creates validated graph parameters
    ///
    /// # Arguments
    /// * `edge_bits` - log2 of the partition size, 1 to 30
    /// * `proof_size` - Cycle length, even and at least 4
    pub fn new(edge_bits: u8, proof_size: usize) -> Result<Self, MinerError> {
        if !(1..=30).contains(&edge_bits) {
            return Err(MinerError::ConfigError(format!(
                "edge_bits must be between 1 and 30, got {}",
                edge_bits
            )));
        }
        if proof_size < 4 || proof_size % 2 != 0 {
            return Err(MinerError::ConfigError(format!(
                "proof_size must be even and at least 4, got {}",
                proof_size
            )));
        }
        Ok(Self {
            edge_bits,
            proof_size,
        })
    }

    /// Number of nodes in each partition (N)
    pub fn partition_size(&self) -> u32 {
        1 << self.edge_bits
    }

    /// Mask applied to SipHash output to land inside a partition
    pub fn node_mask(&self) -> u32 {
        self.partition_size() - 1
    }

    /// Total number of nodes across both partitions (2N)
    pub fn node_count(&self) -> u32 {
        self.partition_size() << 1
    }

    /// Nonce range searched when no easiness is configured
    pub fn default_easiness(&self) -> u32 {
        self.node_count()
    }

    /// Checks an easiness against this graph
    pub fn check_easiness(&self, easiness: u32) -> Result<u32, MinerError> {
        if easiness == 0 || easiness > self.node_count() {
            return Err(MinerError::ConfigError(format!(
                "easiness must be in 1..={}, got {}",
                self.node_count(),
                easiness
            )));
        }
        Ok(easiness)
    }
}

impl Default for CuckooParams {
    fn default() -> Self {
        Self {
            edge_bits: DEFAULT_EDGE_BITS,
            proof_size: PROOF_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = CuckooParams::default();
        assert_eq!(params.partition_size(), 1 << 24);
        assert_eq!(params.node_count(), 1 << 25);
        assert_eq!(params.node_mask(), (1 << 24) - 1);
        assert_eq!(params.proof_size, 42);
    }

    #[test]
    fn test_params_validation() {
        assert!(CuckooParams::new(0, 42).is_err());
        assert!(CuckooParams::new(31, 42).is_err());
        assert!(CuckooParams::new(12, 3).is_err());
        assert!(CuckooParams::new(12, 2).is_err());
        assert!(CuckooParams::new(12, 6).is_ok());
    }

    #[test]
    fn test_easiness_bounds() {
        let params = CuckooParams::new(8, 6).unwrap();
        assert!(params.check_easiness(0).is_err());
        assert!(params.check_easiness(513).is_err());
        assert_eq!(params.check_easiness(512).unwrap(), 512);
    }
}
