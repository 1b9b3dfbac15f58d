// src/config/config.rs
use crate::{
    miner::algorithm::{CuckooParams, DEFAULT_EDGE_BITS, PROOF_SIZE},
    network::node::NodeConfig,
    utils::error::MinerError,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Main configuration structure for the mining application
///
/// Contains the graph parameters, worker configuration and the node to
/// mine against.
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Number of solver threads per job (0 = number of CPU cores)
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// log2 of the nodes in each graph partition
    #[serde(default = "default_edge_bits")]
    pub edge_bits: u8,

    /// Required cycle length
    #[serde(default = "default_proof_size")]
    pub proof_size: usize,

    /// Nonces searched per graph (default: every node, 2^(edge_bits + 1))
    #[serde(default)]
    pub easiness: Option<u32>,

    /// Seconds between statistics reports
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,

    /// Node to fetch work from and submit blocks to
    pub node: NodeConfig,
}

fn default_worker_threads() -> usize {
    num_cpus::get()
}

fn default_edge_bits() -> u8 {
    DEFAULT_EDGE_BITS
}

fn default_proof_size() -> usize {
    PROOF_SIZE
}

fn default_report_interval_secs() -> u64 {
    15
}

impl Config {
    /// Loads configuration from a file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Ok(Config)` - Successfully loaded configuration
    /// * `Err(MinerError)` - If file couldn't be read or parsed
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, MinerError> {
        let path = path.into();
        let config_str = std::fs::read_to_string(&path).map_err(|e| {
            MinerError::ConfigError(format!(
                "Failed to read config at {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::parse(&config_str)
    }

    /// Parses configuration from TOML text
    pub fn parse(config_str: &str) -> Result<Self, MinerError> {
        toml::from_str(config_str)
            .map_err(|e| MinerError::ConfigError(format!("Invalid config format: {}", e)))
    }

    /// Checks every setting that can be checked without the node
    pub fn validate(&self) -> Result<(), MinerError> {
        let url = Url::parse(&self.node.rpc_url).map_err(|e| {
            MinerError::ConfigError(format!("Invalid rpc_url '{}': {}", self.node.rpc_url, e))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(MinerError::ConfigError(format!(
                "rpc_url must use http or https, got '{}'",
                url.scheme()
            )));
        }

        self.easiness()?;
        self.node.coinbase_config()?;

        if self.report_interval_secs == 0 {
            return Err(MinerError::ConfigError(
                "report_interval_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Validated graph parameters
    pub fn params(&self) -> Result<CuckooParams, MinerError> {
        CuckooParams::new(self.edge_bits, self.proof_size)
    }

    /// Configured easiness, or the full nonce range of the graph
    pub fn easiness(&self) -> Result<u32, MinerError> {
        let params = self.params()?;
        params.check_easiness(self.easiness.unwrap_or(params.default_easiness()))
    }

    /// Solver threads, resolving 0 to the number of CPU cores
    pub fn threads(&self) -> usize {
        match self.worker_threads {
            0 => num_cpus::get(),
            n => n,
        }
    }

    /// Interval between statistics reports
    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }

    /// Generates a configuration template string
    ///
    /// # Returns
    /// String containing a commented TOML configuration template
    pub fn generate_template() -> String {
        let mut template = String::new();
        template.push_str("# Cuckoo Miner Configuration\n\n");
        template.push_str("# Number of solver threads (0 = auto-detect)\n");
        template.push_str("worker_threads = 0\n");
        template.push_str("# Graph size: 2^edge_bits nodes per partition\n");
        template.push_str(&format!("edge_bits = {}\n", DEFAULT_EDGE_BITS));
        template.push_str("# Required cycle length\n");
        template.push_str(&format!("proof_size = {}\n", PROOF_SIZE));
        template.push_str("# Nonces searched per graph (default: 2^(edge_bits + 1))\n");
        template.push_str("# easiness = 16777216\n");
        template.push_str("# Seconds between statistics reports\n");
        template.push_str("report_interval_secs = 15\n\n");

        template.push_str("# Node mining configuration\n");
        template.push_str("[node]\n");
        template.push_str("rpc_url = \"http://127.0.0.1:10617\"\n");
        template.push_str("rpc_user = \"rpcuser\"\n");
        template.push_str("rpc_password = \"password\"\n");
        template.push_str("# Output script paid by the coinbase (hex)\n");
        template.push_str(
            "payout_script = \"76a914000000000000000000000000000000000000000088ac\"\n",
        );
        template.push_str("# Extra coinbase input bytes (hex)\n");
        template.push_str("# coinbase_script = \"2f637563636f6f2f\"\n");
        template.push_str("# Version bits to vote for in every header\n");
        template.push_str("# vote_bits = [1]\n");
        template.push_str("retry_pause_secs = 10\n");
        template.push_str("poll_interval_secs = 5\n");
        template.push_str("request_timeout_secs = 30\n");
        template.push_str("longpoll_timeout_secs = 600\n");

        template
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_round_trips() {
        let config = Config::parse(&Config::generate_template()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.worker_threads, 0);
        assert!(config.threads() >= 1);
        assert_eq!(config.params().unwrap(), CuckooParams::default());
        assert_eq!(config.easiness().unwrap(), 1 << 25);
        assert_eq!(config.report_interval(), Duration::from_secs(15));
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let config = Config::parse(
            r#"
            [node]
            rpc_url = "http://localhost:10617"
            payout_script = "51"
            "#,
        )
        .unwrap();
        assert_eq!(config.edge_bits, DEFAULT_EDGE_BITS);
        assert_eq!(config.proof_size, PROOF_SIZE);
        assert_eq!(config.worker_threads, num_cpus::get());
        assert!(config.easiness.is_none());
        assert_eq!(config.node.retry_pause_secs, 10);
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let base = r#"
            [node]
            rpc_url = "http://localhost:10617"
            payout_script = "51"
        "#;

        let mut config = Config::parse(base).unwrap();
        config.node.rpc_url = "not a url".into();
        assert!(matches!(config.validate(), Err(MinerError::ConfigError(_))));

        let mut config = Config::parse(base).unwrap();
        config.node.rpc_url = "ftp://localhost".into();
        assert!(config.validate().is_err());

        let mut config = Config::parse(base).unwrap();
        config.edge_bits = 8;
        config.easiness = Some(513);
        assert!(config.validate().is_err());
        config.easiness = Some(300);
        assert!(config.validate().is_ok());

        let mut config = Config::parse(base).unwrap();
        config.proof_size = 7;
        assert!(config.validate().is_err());

        let mut config = Config::parse(base).unwrap();
        config.node.payout_script = "zz".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_vote_bits() {
        let config = Config::parse(
            r#"
            [node]
            rpc_url = "http://localhost:10617"
            payout_script = "51"
            vote_bits = [0, 5]
            "#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.node.coinbase_config().unwrap().vote_bits, vec![0, 5]);

        let mut config = config;
        config.node.vote_bits.push(40);
        assert!(matches!(config.validate(), Err(MinerError::ConfigError(_))));
    }

    #[test]
    fn test_missing_node_section() {
        assert!(matches!(
            Config::parse("worker_threads = 2"),
            Err(MinerError::ConfigError(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/cuckoo-miner.toml"),
            Err(MinerError::ConfigError(_))
        ));
    }
}
