// Proof of Work implementation

use crate::core::{leading_zero_digits, now_millis, Block};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Highest meaningful target: a SHA256 hex digest has 64 digits
pub const MAX_TARGET: u32 = 64;

/// Difficulty target: required count of leading zero hex digits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target(pub u32);

impl Target {
    /// Required zero prefix length
    pub fn leading_zeros(&self) -> usize {
        self.0 as usize
    }

    /// Check if a hex hash meets this target
    pub fn is_valid_hash(&self, hash: &str) -> bool {
        leading_zero_digits(hash) >= self.leading_zeros()
    }
}

/// Flag raised to stop an in-flight mining task
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Signal the mining task to stop
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a mining run ended
#[derive(Debug)]
pub enum MiningOutcome {
    /// A qualifying hash was found; the block carries hash and mining time
    Mined(Block),
    /// The cancel flag was raised before a hash was published
    Aborted,
}

/// Mining result
#[derive(Debug)]
pub struct MiningResult {
    pub outcome: MiningOutcome,
    /// Number of hashes computed
    pub attempts: u64,
    /// Time taken
    pub duration: Duration,
}

impl MiningResult {
    /// Calculate hash rate (hashes per second)
    pub fn hash_rate(&self) -> f64 {
        self.attempts as f64 / self.duration.as_secs_f64().max(f64::EPSILON)
    }

    /// The mined block, if mining succeeded
    pub fn block(&self) -> Option<&Block> {
        match &self.outcome {
            MiningOutcome::Mined(block) => Some(block),
            MiningOutcome::Aborted => None,
        }
    }
}

/// Proof of Work miner for one candidate block
pub struct Miner {
    cancel: CancelFlag,
}

impl Miner {
    /// Create a miner that stops when `cancel` is raised
    pub fn new(cancel: CancelFlag) -> Self {
        Self { cancel }
    }

    /// Search serially for a nonce whose header hash meets the block's target
    ///
    /// Every attempt refreshes the timestamp. The cancel flag is checked
    /// before each attempt is evaluated and again before the result is
    /// published. The task yields between attempts.
    pub async fn mine(&self, mut block: Block) -> MiningResult {
        let start_time = Instant::now();
        let target = Target(block.target);
        let mut attempts = 0u64;

        if block.nonce == 0 {
            block.nonce = 1;
        }

        loop {
            block.timestamp = now_millis();
            let hash = block.calculate_hash();
            attempts += 1;

            if self.cancel.is_cancelled() {
                return Self::aborted(attempts, start_time);
            }

            if target.is_valid_hash(&hash) {
                if self.cancel.is_cancelled() {
                    return Self::aborted(attempts, start_time);
                }

                let elapsed = start_time.elapsed();
                block.mining_time = elapsed.as_millis() as u64;
                block.hash_header_block = hash;
                return MiningResult {
                    outcome: MiningOutcome::Mined(block),
                    attempts,
                    duration: elapsed,
                };
            }

            block.nonce += 1;

            // Progress indicator every 100k attempts
            if attempts % 100_000 == 0 {
                let elapsed = start_time.elapsed();
                log::debug!(
                    "Mining block {}: {} attempts ({:.1} KH/s)",
                    block.id,
                    attempts,
                    attempts as f64 / elapsed.as_secs_f64() / 1000.0
                );
            }

            tokio::task::yield_now().await;
        }
    }

    fn aborted(attempts: u64, start_time: Instant) -> MiningResult {
        MiningResult {
            outcome: MiningOutcome::Aborted,
            attempts,
            duration: start_time.elapsed(),
        }
    }

    /// Verify that a block's stored hash is its header hash and meets its target
    pub fn verify(block: &Block) -> bool {
        block.is_mined() && block.calculate_hash() == block.hash_header_block
    }
}
