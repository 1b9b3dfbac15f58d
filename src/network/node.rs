// src/network/node.rs
use crate::miner::block::{BlockCandidate, CoinbaseConfig};
use crate::miner::event::{EventBus, Notification};
use crate::network::poller::TemplateSource;
use crate::network::template::BlockTemplate;
use crate::utils::error::MinerError;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// How long the submitter waits for a candidate before re-checking its channel
const SUBMIT_POLL: Duration = Duration::from_secs(1);

/// Configuration for connecting to a node's RPC interface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// URL of the node's RPC endpoint (e.g., "http://127.0.0.1:10617")
    pub rpc_url: String,
    /// Username for RPC authentication
    #[serde(default)]
    pub rpc_user: String,
    /// Password for RPC authentication
    #[serde(default)]
    pub rpc_password: String,
    /// Hex output script that receives mining rewards
    pub payout_script: String,
    /// Extra hex bytes appended to the coinbase input script
    #[serde(default)]
    pub coinbase_script: Option<String>,
    /// Version bits to set in every block header
    #[serde(default)]
    pub vote_bits: Vec<u8>,
    /// Pause after a failed request, in seconds
    #[serde(default = "default_retry_pause_secs")]
    pub retry_pause_secs: u64,
    /// Pause between polls when long-polling is unavailable, in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Timeout for ordinary requests, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Timeout for long-poll requests, in seconds
    #[serde(default = "default_longpoll_timeout_secs")]
    pub longpoll_timeout_secs: u64,
}

fn default_retry_pause_secs() -> u64 {
    10
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_longpoll_timeout_secs() -> u64 {
    600
}

impl NodeConfig {
    /// Decodes the payout and extra coinbase scripts
    pub fn coinbase_config(&self) -> Result<CoinbaseConfig, MinerError> {
        let payout_script = hex::decode(&self.payout_script)?;
        if payout_script.is_empty() {
            return Err(MinerError::ConfigError("payout_script is empty".into()));
        }
        let coinbase_script = match &self.coinbase_script {
            Some(script) => hex::decode(script)?,
            None => Vec::new(),
        };
        if let Some(bit) = self.vote_bits.iter().find(|&&bit| bit >= 32) {
            return Err(MinerError::ConfigError(format!(
                "vote bit {} does not fit a 32-bit version",
                bit
            )));
        }
        Ok(CoinbaseConfig {
            payout_script,
            coinbase_script,
            vote_bits: self.vote_bits.clone(),
        })
    }

    /// Pause after a failed request
    pub fn retry_pause(&self) -> Duration {
        Duration::from_secs(self.retry_pause_secs)
    }

    /// Pause between plain polls
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Client for interacting with a node's RPC interface
pub struct NodeClient {
    /// Configuration for the node connection
    config: NodeConfig,
    /// HTTP client for making RPC requests
    client: Client,
    /// Id of the next JSON-RPC request
    request_id: AtomicU64,
}

impl NodeClient {
    /// Creates a new NodeClient with the given configuration
    ///
    /// # Arguments
    /// * `config` - Node configuration containing RPC connection details
    pub fn new(config: NodeConfig) -> Self {
        NodeClient {
            config,
            client: Client::new(),
            request_id: AtomicU64::new(1),
        }
    }

    /// Node configuration
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Requests a block template from the node
    ///
    /// # Arguments
    /// * `longpollid` - Id from the previous template; the node holds the
    ///   request until the tip changes
    ///
    /// # Returns
    /// * `Ok(BlockTemplate)` - The decoded template
    /// * `Err(MinerError)` - Transport, HTTP status or RPC failure
    pub async fn get_block_template(
        &self,
        longpollid: Option<&str>,
    ) -> Result<BlockTemplate, MinerError> {
        let mut request = json!({ "capabilities": ["coinbasetxn", "workid", "longpoll"] });
        let timeout = match longpollid {
            Some(id) => {
                request["longpollid"] = json!(id);
                Duration::from_secs(self.config.longpoll_timeout_secs)
            }
            None => Duration::from_secs(self.config.request_timeout_secs),
        };

        let result = self
            .rpc_call("getblocktemplate", json!([request]), timeout)
            .await?;
        serde_json::from_value(result)
            .map_err(|e| MinerError::ProtocolError(format!("Bad block template: {}", e)))
    }

    /// Submits a solved block to the node
    ///
    /// # Arguments
    /// * `block_hex` - Serialised block
    ///
    /// # Returns
    /// * `Ok(None)` - The node accepted the block
    /// * `Ok(Some(reason))` - The node rejected the block
    /// * `Err(MinerError)` - The request itself failed
    pub async fn submit_block(&self, block_hex: &str) -> Result<Option<String>, MinerError> {
        let timeout = Duration::from_secs(self.config.request_timeout_secs);
        let result = self
            .rpc_call("submitblock", json!([block_hex]), timeout)
            .await?;
        Ok(match result {
            Value::Null => None,
            Value::String(reason) => Some(reason),
            other => Some(other.to_string()),
        })
    }

    /// Makes an RPC call to the node
    ///
    /// # Arguments
    /// * `method` - The RPC method to call
    /// * `params` - Parameters for the RPC call
    /// * `timeout` - Request timeout
    ///
    /// # Returns
    /// * `Ok(Value)` - The `result` member of the response
    /// * `Err(MinerError)` - Classified transport, status or RPC error
    async fn rpc_call(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, MinerError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let response = self
            .client
            .post(&self.config.rpc_url)
            .basic_auth(&self.config.rpc_user, Some(&self.config.rpc_password))
            .timeout(timeout)
            .json(&json!({
                "jsonrpc": "1.0",
                "id": id,
                "method": method,
                "params": params
            }))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        check_status(status)?;

        let body: Value = response.json().await.map_err(|e| {
            MinerError::ProtocolError(format!("Unreadable {} response (HTTP {}): {}", method, status, e))
        })?;
        parse_response(body)
    }
}

impl TemplateSource for NodeClient {
    async fn fetch_template(&self, longpollid: Option<String>) -> Result<BlockTemplate, MinerError> {
        self.get_block_template(longpollid.as_deref()).await
    }
}

/// Maps a failed send to a retryable connection error where possible
fn transport_error(error: reqwest::Error) -> MinerError {
    if error.is_connect() || error.is_timeout() {
        MinerError::ConnectionError(error.to_string())
    } else {
        MinerError::HttpError(error)
    }
}

/// Rejects statuses that carry no JSON-RPC body worth reading
fn check_status(status: StatusCode) -> Result<(), MinerError> {
    match status {
        StatusCode::UNAUTHORIZED => Err(MinerError::AuthenticationError(
            "RPC credentials rejected".into(),
        )),
        StatusCode::FORBIDDEN => Err(MinerError::PermissionError(
            "RPC access forbidden".into(),
        )),
        _ => Ok(()),
    }
}

/// Extracts `result`, or turns a non-null `error` into [`MinerError::RpcError`]
fn parse_response(mut body: Value) -> Result<Value, MinerError> {
    let error = body.get_mut("error").map(Value::take).unwrap_or(Value::Null);
    if !error.is_null() {
        return Err(MinerError::RpcError {
            code: error["code"].as_i64().unwrap_or(0),
            message: error["message"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string()),
        });
    }

    match body.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(MinerError::ProtocolError("Missing result member".into())),
    }
}

/// Submits found blocks until every candidate sender is gone
///
/// Candidates arrive on a crossbeam channel fed by the scheduler. Each
/// submission outcome is published as [`Notification::PowTrue`] or
/// [`Notification::PowFalse`].
pub async fn submit_candidates(
    client: &NodeClient,
    receiver: Receiver<Arc<BlockCandidate>>,
    bus: EventBus,
) -> Result<(), MinerError> {
    loop {
        let rx = receiver.clone();
        let candidate = match tokio::task::spawn_blocking(move || rx.recv_timeout(SUBMIT_POLL)).await? {
            Ok(candidate) => candidate,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        };

        let outcome = match candidate.to_hex() {
            Ok(block_hex) => client.submit_block(&block_hex).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(None) => {
                log::info!("Block at height {} accepted", candidate.work.height());
                bus.publish(Notification::PowTrue);
            }
            Ok(Some(reason)) => {
                log::warn!("Block at height {} rejected: {}", candidate.work.height(), reason);
                bus.publish(Notification::PowFalse);
            }
            Err(e) => {
                log::error!("Block submission failed: {}", e);
                bus.publish(Notification::PowFalse);
            }
        }
    }
}
