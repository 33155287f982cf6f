// Consensus and validation logic

pub mod pow;
pub mod validation;
pub mod difficulty;

pub use pow::{CancelFlag, Miner, MiningOutcome, MiningResult, Target, MAX_TARGET};
pub use validation::{BlockValidator, TransactionValidator, ValidationError};
pub use difficulty::MiningPolicy;
