// Serialization of ledger values for the transport

use crate::core::{Block, Transaction};
use crate::error::Result;

/// Trait for values exchanged between nodes
///
/// Payloads are JSON and round-trip every field exactly.
pub trait Serializable: Sized {
    fn serialize(&self) -> Result<Vec<u8>>;
    fn deserialize(data: &[u8]) -> Result<Self>;
}

fn to_payload<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn from_payload<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(data)?)
}

impl Serializable for Transaction {
    fn serialize(&self) -> Result<Vec<u8>> {
        to_payload(self)
    }

    fn deserialize(data: &[u8]) -> Result<Self> {
        from_payload(data)
    }
}

impl Serializable for Block {
    fn serialize(&self) -> Result<Vec<u8>> {
        to_payload(self)
    }

    fn deserialize(data: &[u8]) -> Result<Self> {
        from_payload(data)
    }
}

impl Serializable for String {
    fn serialize(&self) -> Result<Vec<u8>> {
        to_payload(self)
    }

    fn deserialize(data: &[u8]) -> Result<Self> {
        from_payload(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ScriptSig, TxInput, TxOutput};
    use crate::error::LedgerError;

    #[test]
    fn test_block_payload_preserves_fields() {
        let mut input = TxInput::new("prev".to_string(), 1);
        input.script_sig = ScriptSig::single("pk".to_string(), "sig".to_string());
        let tx = Transaction::new("alice", vec![input], vec![TxOutput::new(4, "bob")]);

        let mut block = Block::new("miner", "prev-hash", 3);
        block.transactions = vec![Transaction::coinbase(625, "miner"), tx];
        block.merkle_root = block.merkle();
        block.nonce = 77;
        block.hash_header_block = block.calculate_hash();
        block.mining_time = 1500;

        let payload = block.serialize().unwrap();
        let decoded = Block::deserialize(&payload).unwrap();

        assert_eq!(block, decoded);
        assert_eq!(decoded.calculate_hash(), block.hash_header_block);
    }

    #[test]
    fn test_malformed_payload() {
        let result = Transaction::deserialize(b"{not json");
        assert!(matches!(result, Err(LedgerError::Serialization(_))));
    }
}
