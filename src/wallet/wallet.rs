// Node wallet: key pair, running balance and owned outputs

use crate::core::{format_coins, Amount, Transaction, TxOutput};
use crate::wallet::KeyPair;

/// A node's wallet
///
/// `value` is a cached balance that always equals the sum of the owned
/// outputs. Outputs are keyed by the id of the transaction that created them
/// and keep insertion order, which drives coin selection.
#[derive(Debug, Clone)]
pub struct Wallet {
    keys: KeyPair,
    value: Amount,
    outputs: Vec<(String, TxOutput)>,
}

impl Wallet {
    /// Create an empty wallet for a key pair
    pub fn new(keys: KeyPair) -> Self {
        Self {
            keys,
            value: 0,
            outputs: Vec::new(),
        }
    }

    pub fn keys(&self) -> &KeyPair {
        &self.keys
    }

    pub fn address(&self) -> &str {
        &self.keys.address
    }

    /// Cached balance
    pub fn balance(&self) -> Amount {
        self.value
    }

    /// Owned outputs in insertion order
    pub fn outputs(&self) -> impl Iterator<Item = (&str, &TxOutput)> {
        self.outputs.iter().map(|(id, out)| (id.as_str(), out))
    }

    pub fn get_output(&self, tx_id: &str) -> Option<&TxOutput> {
        self.outputs
            .iter()
            .find(|(id, _)| id == tx_id)
            .map(|(_, out)| out)
    }

    /// Take ownership of an output and credit its value
    ///
    /// An output already held under the same transaction id is replaced and
    /// its value debited first.
    pub fn add_output(&mut self, tx_id: &str, output: TxOutput) {
        self.value += output.value;

        if let Some(slot) = self.outputs.iter_mut().find(|(id, _)| id == tx_id) {
            log::warn!(
                "Wallet already holds an output of transaction {}, replacing it",
                tx_id
            );
            self.value -= slot.1.value;
            slot.1 = output;
        } else {
            self.outputs.push((tx_id.to_string(), output));
        }
    }

    /// Release an output and debit its value
    pub fn remove_output(&mut self, tx_id: &str) -> Option<TxOutput> {
        let pos = self.outputs.iter().position(|(id, _)| id == tx_id)?;
        let (_, output) = self.outputs.remove(pos);
        self.value -= output.value;
        Some(output)
    }

    /// Apply one transaction of an accepted block
    ///
    /// Spent outputs are released when this wallet is the sender; outputs
    /// paying this wallet are taken. Must run exactly once per accepted block.
    pub fn apply_transaction(&mut self, tx: &Transaction) {
        if tx.sender_hash == self.keys.address {
            for input in &tx.inputs {
                if self.remove_output(&input.prev_tx_id).is_none() {
                    log::warn!(
                        "Transaction {} spends {} which this wallet does not hold",
                        tx.id,
                        input.prev_tx_id
                    );
                }
            }
        }

        for output in &tx.outputs {
            if output.script_pub_key == self.keys.address {
                self.add_output(&tx.id, output.clone());
            }
        }

        log::debug!("Wallet {} balance: {}", self.keys.address, format_coins(self.value));
    }
}
