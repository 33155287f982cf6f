// Transaction data structures

use crate::core::{short_id, now_millis, Amount, ScriptSig, COINBASE_SENDER, SYSTEM_SENDER};
use serde::{Deserialize, Serialize};

/// Current transaction format version
pub const TX_VERSION: u32 = 1;

/// Transaction input - references an output of a previous transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    /// Id of the transaction being spent from
    pub prev_tx_id: String,
    /// Index of the output in that transaction
    pub output_index: u32,
    /// Signature set (scriptSig) - proves ownership
    pub script_sig: ScriptSig,
}

impl TxInput {
    /// Create a new unsigned input
    pub fn new(prev_tx_id: String, output_index: u32) -> Self {
        Self {
            prev_tx_id,
            output_index,
            script_sig: ScriptSig::empty(),
        }
    }
}

/// Transaction output - specifies amount and owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    /// Amount in base units
    pub value: Amount,
    /// Owning address (scriptPubKey)
    pub script_pub_key: String,
}

impl TxOutput {
    /// Create a new transaction output
    pub fn new(value: Amount, script_pub_key: impl Into<String>) -> Self {
        Self {
            value,
            script_pub_key: script_pub_key.into(),
        }
    }
}

/// Transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Opaque unique identifier
    pub id: String,
    /// Transaction version
    pub version: u32,
    /// Sender address, or a system sentinel
    pub sender_hash: String,
    /// Creation (or signing) time in Unix milliseconds
    pub timestamp: u64,
    /// Transaction inputs
    pub inputs: Vec<TxInput>,
    /// Transaction outputs
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    /// Create a new transaction with a fresh id
    pub fn new(sender_hash: impl Into<String>, inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        Self {
            id: short_id(),
            version: TX_VERSION,
            sender_hash: sender_hash.into(),
            timestamp: now_millis(),
            inputs,
            outputs,
        }
    }

    /// Create the start-up grant a node issues itself
    pub fn system_grant(value: Amount, recipient: &str) -> Self {
        Self::new(SYSTEM_SENDER, vec![], vec![TxOutput::new(value, recipient)])
    }

    /// Create a coinbase transaction (mining reward)
    pub fn coinbase(reward: Amount, miner: &str) -> Self {
        Self::new(COINBASE_SENDER, vec![], vec![TxOutput::new(reward, miner)])
    }

    /// Check if this is a coinbase transaction
    pub fn is_coinbase(&self) -> bool {
        self.sender_hash == COINBASE_SENDER && self.inputs.is_empty()
    }

    /// Canonical header digest: id|version|sender|timestamp
    pub fn header_digest(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.id, self.version, self.sender_hash, self.timestamp
        )
    }

    /// Digest signed for one input: header|IN|prev_tx_id|output_index
    pub fn input_digest(&self, input: &TxInput) -> String {
        format!(
            "{}|IN|{}|{}",
            self.header_digest(),
            input.prev_tx_id,
            input.output_index
        )
    }

    /// Calculate total output value
    pub fn total_output_value(&self) -> Amount {
        self.outputs.iter().map(|out| out.value).sum()
    }

    /// Value of outputs not paid back to the sender
    pub fn outgoing_value(&self) -> Amount {
        self.outputs
            .iter()
            .filter(|out| out.script_pub_key != self.sender_hash)
            .map(|out| out.value)
            .sum()
    }

    /// Value of outputs paid back to the sender (change)
    pub fn change_value(&self) -> Amount {
        self.outputs
            .iter()
            .filter(|out| out.script_pub_key == self.sender_hash)
            .map(|out| out.value)
            .sum()
    }

    /// Index of the first output owned by an address
    pub fn output_index_for(&self, address: &str) -> Option<u32> {
        self.outputs
            .iter()
            .position(|out| out.script_pub_key == address)
            .map(|i| i as u32)
    }

    /// Check whether every input carries at least one signature
    pub fn is_signed(&self) -> bool {
        self.inputs.iter().all(|input| !input.script_sig.is_empty())
    }
}
