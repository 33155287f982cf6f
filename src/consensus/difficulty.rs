// Difficulty and reward adjustment

use crate::config::LedgerConfig;
use crate::consensus::pow::MAX_TARGET;
use crate::core::{format_coins, Amount, Block};

/// Per-node mining parameters, adjusted after every accepted block
///
/// Not part of consensus: peers adjust independently and may diverge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiningPolicy {
    /// Leading zero hex digits required of the next candidate
    pub target: u32,
    /// Coinbase value of the next candidate
    pub reward: Amount,
    reward_decrement: Amount,
    reward_interval: usize,
    slow_mining_ms: u64,
}

impl MiningPolicy {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            target: config.initial_target.clamp(1, MAX_TARGET),
            reward: config.initial_reward,
            reward_decrement: config.reward_decrement,
            reward_interval: config.reward_interval.max(1),
            slow_mining_ms: config.slow_mining_ms,
        }
    }

    /// Adjust after `block` was appended, making the chain `chain_len` long
    pub fn adjust(&mut self, block: &Block, chain_len: usize) {
        if block.mining_time > self.slow_mining_ms {
            self.target = self.target.saturating_sub(1).max(1);
            log::info!("Difficulty decreased, new target = {}", self.target);
        } else {
            self.target = (self.target + 1).min(MAX_TARGET);
            log::info!("Difficulty increased, new target = {}", self.target);
        }

        if chain_len % self.reward_interval == 0 {
            self.reward = self.reward.saturating_sub(self.reward_decrement);
            log::info!("Mining reward reduced to {}", format_coins(self.reward));
        }
    }
}
