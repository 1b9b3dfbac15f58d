// src/utils/error.rs
use crate::miner::algorithm::CycleError;
use crate::miner::block::BlockCandidate;
use serde_json;
use std::io;
use std::sync::Arc;
use thiserror::Error;
use url;

/// Main error type for the mining application
///
/// This enum represents all possible error conditions that can occur
/// while fetching work, solving graphs and submitting blocks. The poller
/// classifies these into recoverable and fatal lifecycle events.
#[derive(Error, Debug)]
pub enum MinerError {
    /// Structural anomaly found while following a path in the cuckoo table
    #[error("Graph anomaly: {0}")]
    Cycle(#[from] CycleError),

    /// Errors related to network connectivity (retried by the poller)
    #[error("Network connection error: {0}")]
    ConnectionError(String),

    /// The node rejected our RPC credentials (fatal)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// The node refused the request for this user (fatal)
    #[error("Permission denied: {0}")]
    PermissionError(String),

    /// JSON-RPC error object returned by the node
    #[error("RPC error {code}: {message}")]
    RpcError {
        /// JSON-RPC error code
        code: i64,
        /// Human readable message from the node
        message: String,
    },

    /// Errors in protocol handling or invalid protocol messages
    #[error("Protocol violation: {0}")]
    ProtocolError(String),

    /// Standard I/O operation errors
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    /// HTTP request/response errors
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Configuration file or parameter errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Thread communication channel errors
    #[error("Thread communication error: {0}")]
    ChannelError(String),

    /// Malformed input such as bad hex or an undecodable difficulty
    #[error("Invalid input: {0}")]
    InputError(String),

    /// Async task execution errors
    #[error("Task execution error: {0}")]
    TaskError(String),
}

/// Converts crossbeam channel send errors for block candidates into MinerError
///
/// Raised when the submission task has gone away while the scheduler
/// still holds a solved block.
impl From<crossbeam_channel::SendError<Arc<BlockCandidate>>> for MinerError {
    fn from(e: crossbeam_channel::SendError<Arc<BlockCandidate>>) -> Self {
        MinerError::ChannelError(format!("Candidate send failed: {}", e))
    }
}

/// Converts hex decoding errors into MinerError
///
/// Used when invalid hex data is encountered in block templates
/// (previous hash, bits, transaction data) or in configured scripts.
impl From<hex::FromHexError> for MinerError {
    fn from(e: hex::FromHexError) -> Self {
        MinerError::InputError(format!("Hex conversion failed: {}", e))
    }
}

impl From<std::num::ParseIntError> for MinerError {
    fn from(e: std::num::ParseIntError) -> Self {
        MinerError::InputError(format!("Integer parse failed: {}", e))
    }
}

/// Converts async task join errors into MinerError
impl From<tokio::task::JoinError> for MinerError {
    fn from(e: tokio::task::JoinError) -> Self {
        MinerError::TaskError(format!("Async task failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_error_wraps() {
        let err: MinerError = CycleError::IllegalCycle(6).into();
        assert!(matches!(err, MinerError::Cycle(CycleError::IllegalCycle(6))));
        assert_eq!(err.to_string(), "Graph anomaly: illegal 6-cycle");
    }

    #[test]
    fn test_hex_error_is_input_error() {
        let err: MinerError = hex::decode("zz").unwrap_err().into();
        assert!(matches!(err, MinerError::InputError(_)));
    }
}
