// src/network/template.rs
//! Block template as returned by `getblocktemplate`

use serde::{Deserialize, Serialize};

/// Work offered by the node for the next block
///
/// Only the fields the miner uses are decoded; unknown fields are ignored.
/// Masternode and payload fields are absent on plain bitcoin-style daemons.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockTemplate {
    /// Block version
    pub version: u32,
    /// Hash of the current tip (display byte order)
    pub previousblockhash: String,
    /// Transactions to include after the coinbase
    #[serde(default)]
    pub transactions: Vec<TemplateTransaction>,
    /// Total coinbase value in base units (subsidy plus fees)
    pub coinbasevalue: u64,
    /// Identifier to pass back for a long-poll request
    #[serde(default)]
    pub longpollid: Option<String>,
    /// Current time suggested for the header
    pub curtime: u32,
    /// Compact difficulty target as 8 hex digits
    pub bits: String,
    /// Height of the block being built
    pub height: u64,
    /// Secondary payments that must be added to the coinbase
    #[serde(default)]
    pub masternode: Vec<Masternode>,
    /// Whether `masternode` payments are active
    #[serde(default)]
    pub masternode_payments_started: bool,
    /// Extra payload appended to the coinbase as a special transaction
    #[serde(default)]
    pub coinbase_payload: Option<String>,
}

/// A non-coinbase transaction from the template
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateTransaction {
    /// Raw transaction hex
    pub data: String,
    /// Transaction hash (display byte order)
    pub hash: String,
    /// Fee paid, in base units
    #[serde(default)]
    pub fee: u64,
}

/// A secondary payment output required by the template
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Masternode {
    /// Payee address, informational only
    #[serde(default)]
    pub payee: String,
    /// Output script hex
    pub script: String,
    /// Amount in base units
    pub amount: u64,
}
