// src/network/mod.rs
//! Network communication components
//!
//! This module handles all interaction with the upstream node:
//! - `NodeClient`: JSON-RPC `getblocktemplate` / `submitblock` over HTTP
//! - `Poller`: the long-polling fetch loop that turns templates into work
//! - `BlockTemplate`: the decoded template

/// Node RPC client implementation
///
/// Handles communication with a local node for solo mining. Classifies
/// failures so the poller can tell retryable errors from fatal ones.
pub mod node;

/// Template fetch loop with long-poll, backoff and shutdown
pub mod poller;

/// Block template types
pub mod template;

// Re-export main components for cleaner imports
pub use node::{NodeClient, NodeConfig, submit_candidates};
pub use poller::{Poller, PollerState, TemplateSource};
pub use template::BlockTemplate;
