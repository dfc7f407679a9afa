//! Configuration types for the HRMS client core.

use crate::error::{HrmsError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Name of the configuration file inside the client root.
pub const CONFIG_FILE: &str = "hrms.toml";

/// Comprehensive configuration for the HRMS client.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Query cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Global search configuration.
    #[serde(default)]
    pub search: SearchConfig,

    /// Access gate persistence configuration.
    #[serde(default)]
    pub gate: GateConfig,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| HrmsError::Config(format!("failed to read config: {}", e)))?;
            toml::from_str(&content)
                .map_err(|e| HrmsError::Config(format!("failed to parse config: {}", e)))
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, root: &Path) -> Result<()> {
        let path = root.join(CONFIG_FILE);
        let content = toml::to_string_pretty(self)
            .map_err(|e| HrmsError::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(&path, content)
            .map_err(|e| HrmsError::Config(format!("failed to write config: {}", e)))?;
        Ok(())
    }
}

/// Query cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// Retries for a failed read before the error reaches the caller (default: 3).
    pub default_retries: u32,

    /// Delay before the first retry in milliseconds (default: 1000).
    /// Each further retry doubles the delay.
    pub retry_base_delay_ms: u64,

    /// Upper bound for the retry delay in milliseconds (default: 30000).
    pub retry_max_delay_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_retries: 3,
            retry_base_delay_ms: 1000,
            retry_max_delay_ms: 30_000,
        }
    }
}

impl CacheConfig {
    /// Returns the backoff before retry number `attempt` (zero-based).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let millis = self
            .retry_base_delay_ms
            .saturating_mul(factor)
            .min(self.retry_max_delay_ms);
        Duration::from_millis(millis)
    }
}

/// Global search configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchConfig {
    /// Quiet period after the last keystroke before a search is sent (default: 300).
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

impl SearchConfig {
    /// Returns the debounce quiet period as a Duration.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Access gate persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GateConfig {
    /// File holding the gate record, relative to the client root (default: gate.toml).
    pub file_name: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            file_name: "gate.toml".to_string(),
        }
    }
}
