// src/cli/commands.rs
use crate::miner::algorithm::{DEFAULT_EDGE_BITS, PROOF_SIZE};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cuckoo Miner CLI - Cuckoo Cycle proof-of-work miner in Rust
#[derive(Parser, Debug)]
#[command(name = "cuckoo-miner-rs")]
#[command(version, about, long_about = None)]
pub struct Commands {
    /// The action to perform (start mining, run benchmarks, or generate config)
    #[command(subcommand)]
    pub action: Action,
}

/// Top-level commands for the miner application
#[derive(Subcommand, Debug)]
pub enum Action {
    /// Start mining against a node
    Start(StartOptions),

    /// Measure solver throughput on synthetic work
    Benchmark(BenchmarkOptions),

    /// Generate configuration file template
    Config(ConfigOptions),
}

/// Options for starting the mining operation
#[derive(Parser, Debug)]
pub struct StartOptions {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Number of worker threads to use (overrides config)
    #[arg(short, long)]
    pub workers: Option<usize>,
}

/// Options for running solver benchmarks
#[derive(Parser, Debug)]
pub struct BenchmarkOptions {
    /// log2 of the nodes in each graph partition
    #[arg(short, long, default_value_t = DEFAULT_EDGE_BITS)]
    pub edge_bits: u8,

    /// Required cycle length
    #[arg(short, long, default_value_t = PROOF_SIZE)]
    pub proof_size: usize,

    /// Duration of benchmark in seconds
    #[arg(short, long, default_value_t = 60)]
    pub duration: u64,

    /// Number of threads to use
    #[arg(short, long, default_value_t = num_cpus::get())]
    pub threads: usize,
}

/// Options for generating configuration files
#[derive(Parser, Debug)]
pub struct ConfigOptions {
    /// Output file path
    #[arg(short, long, default_value = "config.toml")]
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start() {
        let cli = Commands::parse_from(["cuckoo-miner-rs", "start", "-c", "miner.toml", "-w", "3"]);
        match cli.action {
            Action::Start(opts) => {
                assert_eq!(opts.config, PathBuf::from("miner.toml"));
                assert_eq!(opts.workers, Some(3));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_benchmark_defaults() {
        let cli = Commands::parse_from(["cuckoo-miner-rs", "benchmark", "--edge-bits", "16"]);
        match cli.action {
            Action::Benchmark(opts) => {
                assert_eq!(opts.edge_bits, 16);
                assert_eq!(opts.proof_size, PROOF_SIZE);
                assert_eq!(opts.duration, 60);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
