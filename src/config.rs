//! Configuration for rollsync

use crate::error::{Error, Result};
use crate::signature::{DEFAULT_BLOCK_SIZE, MIN_BLOCK_SIZE};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tool configuration, loadable from a TOML file.
///
/// CLI flags override whatever the file says; the delta core itself
/// never reads configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Block size for signature generation
    pub block_size: u16,

    /// Verbose logging level (0-3)
    pub verbose: u8,

    /// Output logs as JSON
    pub json_logs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            verbose: 0,
            json_logs: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading config {}", path.display()), e))?;
        let config: Config = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configured values against the supported ranges.
    pub fn validate(&self) -> Result<()> {
        if self.block_size < MIN_BLOCK_SIZE {
            return Err(Error::config(format!(
                "block_size {} below minimum {}",
                self.block_size, MIN_BLOCK_SIZE
            )));
        }
        Ok(())
    }
}
