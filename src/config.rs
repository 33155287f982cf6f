// Node configuration

use crate::core::{Amount, COIN};
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Ledger parameters for one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Leading zero hex digits required when the node starts
    pub initial_target: u32,
    /// Block reward when the node starts
    pub initial_reward: Amount,
    /// Amount the reward drops by
    pub reward_decrement: Amount,
    /// Reward drops whenever the chain length is a multiple of this
    pub reward_interval: usize,
    /// Mining time (ms) above which the target is lowered
    pub slow_mining_ms: u64,
    /// Value of the start-up grant each node issues itself
    pub startup_grant: Amount,
    /// Mempool transactions taken into a block besides the coinbase
    pub max_block_transactions: usize,
    /// Directory for the block archive; no archive when unset
    pub data_dir: Option<PathBuf>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            initial_target: 3,
            initial_reward: 625 * COIN / 100,
            reward_decrement: COIN / 10,
            reward_interval: 5,
            slow_mining_ms: 180_000,
            startup_grant: 10 * COIN,
            max_block_transactions: 4,
            data_dir: None,
        }
    }
}

impl LedgerConfig {
    /// Load a config from a JSON file; missing fields take defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            LedgerError::Config(format!("Failed to read {}: {}", path.as_ref().display(), e))
        })?;
        let config: LedgerConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.initial_target == 0 || self.initial_target > 64 {
            return Err(LedgerError::Config(format!(
                "initial_target must be in 1..=64, got {}",
                self.initial_target
            )));
        }
        if self.reward_interval == 0 {
            return Err(LedgerError::Config("reward_interval must be positive".to_string()));
        }
        if self.max_block_transactions == 0 {
            return Err(LedgerError::Config(
                "max_block_transactions must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.initial_target, 3);
        assert_eq!(config.initial_reward, 625_000_000);
        assert_eq!(config.reward_decrement, 10_000_000);
        assert_eq!(config.startup_grant, 10 * COIN);
        assert_eq!(config.max_block_transactions, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: LedgerConfig = serde_json::from_str(r#"{"initial_target": 1}"#).unwrap();
        assert_eq!(config.initial_target, 1);
        assert_eq!(config.slow_mining_ms, 180_000);
    }

    #[test]
    fn test_validate_rejects_zero_target() {
        let config = LedgerConfig {
            initial_target: 0,
            ..LedgerConfig::default()
        };
        assert!(matches!(config.validate(), Err(LedgerError::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = LedgerConfig::load("/nonexistent/ledger.json");
        assert!(matches!(result, Err(LedgerError::Config(_))));
    }
}
