// Wallet and transaction building

mod keystore;
mod wallet;
mod tx_builder;

pub use keystore::KeyPair;
pub use wallet::Wallet;
pub use tx_builder::{check_spendable, sign_transaction, TransactionBuilder};
