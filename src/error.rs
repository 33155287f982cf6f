// Error types for ledger operations

use crate::consensus::ValidationError;
use thiserror::Error;

/// Errors returned by ledger, wallet and node operations
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Key generation, signing or key/signature decoding failed
    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: u64, required: u64 },

    /// A wallet output could not be located in the accepted chain
    #[error("no output for {address} found in transaction {tx_id}")]
    ReferenceNotFound { tx_id: String, address: String },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("unknown recipient: {0}")]
    UnknownRecipient(String),

    #[error("no pending transaction with id {0}")]
    DraftNotFound(String),

    #[error("no candidate block")]
    NoCandidateBlock,

    #[error("block {0} is already in the chain")]
    BlockAlreadyAccepted(String),

    #[error("block {0} has not been mined")]
    BlockNotMined(String),

    #[error("invalid block: {0}")]
    InvalidBlock(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("node {0} is not running")]
    NodeStopped(String),
}

impl LedgerError {
    /// Business-rule failures caused by user input rather than infrastructure
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            LedgerError::InsufficientFunds { .. }
                | LedgerError::ReferenceNotFound { .. }
                | LedgerError::InvalidAmount(_)
                | LedgerError::UnknownRecipient(_)
                | LedgerError::DraftNotFound(_)
                | LedgerError::NoCandidateBlock
                | LedgerError::BlockAlreadyAccepted(_)
                | LedgerError::BlockNotMined(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
