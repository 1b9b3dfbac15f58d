// src/config/mod.rs
//! Configuration management for the cuckoo miner
//!
//! This module handles all configuration-related functionality including:
//! - Loading and parsing configuration files
//! - Validating graph parameters and the node connection
//! - Generating configuration templates
//!
//! The configuration uses TOML format.

/// Core configuration implementation
///
/// Contains the [`Config`] struct that defines the miner's configuration
/// structure and behavior.
pub mod config;

// Re-export key items for easy access
pub use config::Config;

use crate::utils::error::MinerError;
use std::path::PathBuf;

/// Loads and validates miner configuration from a TOML file
///
/// # Arguments
/// * `path` - Path to the configuration file (anything convertible to PathBuf)
///
/// # Returns
/// * `Ok(Config)` - Successfully loaded configuration
/// * `Err(MinerError)` - If the file couldn't be read, parsed or validated
pub fn load(path: impl Into<PathBuf>) -> Result<Config, MinerError> {
    let config = Config::load(path)?;
    config.validate()?;
    Ok(config)
}

/// Generates a commented configuration template
pub fn generate_template() -> String {
    Config::generate_template()
}
