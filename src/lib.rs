// Didactic proof-of-work UTXO ledger
// Node actors exchanging transactions and blocks over an in-process network

pub mod cli;
pub mod config;
pub mod consensus;
pub mod core;
pub mod error;
pub mod ledger;
pub mod network;
pub mod presenter;
pub mod storage;
pub mod wallet;

// Re-exports for convenience
pub use cli::{Cli, CliHandler};
pub use config::LedgerConfig;
pub use self::core::{Block, Transaction, TxInput, TxOutput, ScriptSig};
pub use consensus::{Miner, MiningPolicy, BlockValidator, TransactionValidator, ValidationError};
pub use error::{LedgerError, Result};
pub use ledger::Ledger;
pub use network::{LocalNetwork, Node, NodeCommand, NodeHandle, Transport};
pub use presenter::{LogPresenter, Presenter, ScriptedPresenter};
pub use storage::{BlockArchive, Chain, Mempool};
pub use wallet::{KeyPair, Wallet};
