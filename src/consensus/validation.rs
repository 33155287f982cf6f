// Transaction and block validation

use crate::core::{is_system_sender, verify_digest, Block, Transaction};
use thiserror::Error;

/// Reasons a received block is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Merkle root doesn't match calculated value
    #[error("merkle root mismatch: stored {stored}, calculated {calculated}")]
    InvalidMerkleRoot { stored: String, calculated: String },

    /// Stored header hash doesn't match the recomputed one
    #[error("header hash mismatch: stored {stored}, calculated {calculated}")]
    InvalidHeaderHash { stored: String, calculated: String },

    /// Block does not extend the local chain tip
    #[error("previous hash {found} does not match chain tip {expected}")]
    PrevHashMismatch { expected: String, found: String },
}

/// Block validator
pub struct BlockValidator;

impl BlockValidator {
    /// Validate a block against the local chain tip
    ///
    /// Checks the Merkle root and header hash recomputations, then linkage
    /// to `tip_hash` when the chain is non-empty. Contained transactions are
    /// not re-verified here.
    pub fn validate_block(block: &Block, tip_hash: Option<&str>) -> Result<(), ValidationError> {
        let calculated_merkle = block.merkle();
        if calculated_merkle != block.merkle_root {
            return Err(ValidationError::InvalidMerkleRoot {
                stored: block.merkle_root.clone(),
                calculated: calculated_merkle,
            });
        }

        let calculated_hash = block.calculate_hash();
        if calculated_hash != block.hash_header_block {
            return Err(ValidationError::InvalidHeaderHash {
                stored: block.hash_header_block.clone(),
                calculated: calculated_hash,
            });
        }

        if let Some(tip) = tip_hash {
            if block.hash_prev_block != tip {
                return Err(ValidationError::PrevHashMismatch {
                    expected: tip.to_string(),
                    found: block.hash_prev_block.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Transaction validator (for mempool acceptance)
pub struct TransactionValidator;

impl TransactionValidator {
    /// Verify every recorded input signature of a transaction
    ///
    /// System-issued transactions are trusted. Any mismatch or decoding
    /// failure rejects the transaction.
    pub fn verify_transaction(tx: &Transaction) -> bool {
        if is_system_sender(&tx.sender_hash) {
            return true;
        }

        if !tx.is_signed() {
            log::debug!("Transaction {} has an unsigned input", tx.id);
            return false;
        }

        for input in &tx.inputs {
            let digest = tx.input_digest(input);
            for (pubkey, signature) in input.script_sig.entries() {
                match verify_digest(&digest, signature, pubkey) {
                    Ok(true) => {}
                    Ok(false) => {
                        log::debug!("Signature mismatch on transaction {}", tx.id);
                        return false;
                    }
                    Err(e) => {
                        log::debug!("Signature check failed on transaction {}: {}", tx.id, e);
                        return false;
                    }
                }
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{sign_digest, ScriptSig, TxInput, TxOutput};
    use crate::wallet::KeyPair;

    fn signed_tx(kp: &KeyPair) -> Transaction {
        let mut tx = Transaction::new(
            kp.address.clone(),
            vec![TxInput::new("prev".to_string(), 0)],
            vec![TxOutput::new(4, "bob")],
        );
        let digest = tx.input_digest(&tx.inputs[0]);
        let sig = sign_digest(&digest, &kp.secret_key).unwrap();
        tx.inputs[0].script_sig = ScriptSig::single(kp.pubkey_hex(), sig);
        tx
    }

    fn sealed_block(prev: &str) -> Block {
        let mut block = Block::new("miner", prev, 1);
        block.transactions.push(Transaction::coinbase(100, "miner"));
        block.merkle_root = block.merkle();
        block.hash_header_block = block.calculate_hash();
        block
    }

    #[test]
    fn test_verify_signed_transaction() {
        let kp = KeyPair::generate();
        assert!(TransactionValidator::verify_transaction(&signed_tx(&kp)));
    }

    #[test]
    fn test_forged_signature_rejected() {
        let kp = KeyPair::generate();
        let forger = KeyPair::generate();
        let mut tx = signed_tx(&kp);

        // Signature by another key recorded under the real key
        let digest = tx.input_digest(&tx.inputs[0]);
        let forged = sign_digest(&digest, &forger.secret_key).unwrap();
        tx.inputs[0].script_sig = ScriptSig::single(kp.pubkey_hex(), forged);

        assert!(!TransactionValidator::verify_transaction(&tx));
    }

    #[test]
    fn test_tampered_transaction_rejected() {
        let kp = KeyPair::generate();
        let mut tx = signed_tx(&kp);
        tx.timestamp += 1;
        assert!(!TransactionValidator::verify_transaction(&tx));
    }

    #[test]
    fn test_missing_signature_rejected() {
        let kp = KeyPair::generate();
        let mut tx = signed_tx(&kp);
        tx.inputs[0].script_sig = ScriptSig::empty();
        assert!(!TransactionValidator::verify_transaction(&tx));
    }

    #[test]
    fn test_garbage_signature_rejected() {
        let kp = KeyPair::generate();
        let mut tx = signed_tx(&kp);
        tx.inputs[0].script_sig = ScriptSig::single(kp.pubkey_hex(), "zz".to_string());
        assert!(!TransactionValidator::verify_transaction(&tx));
    }

    #[test]
    fn test_system_transactions_trusted() {
        assert!(TransactionValidator::verify_transaction(&Transaction::system_grant(10, "a")));
        assert!(TransactionValidator::verify_transaction(&Transaction::coinbase(10, "a")));
    }

    #[test]
    fn test_validate_block_linkage() {
        let block = sealed_block("tip-hash");

        assert!(BlockValidator::validate_block(&block, None).is_ok());
        assert!(BlockValidator::validate_block(&block, Some("tip-hash")).is_ok());
        assert!(matches!(
            BlockValidator::validate_block(&block, Some("other")),
            Err(ValidationError::PrevHashMismatch { .. })
        ));
    }

    #[test]
    fn test_validate_block_bad_hash() {
        let mut block = sealed_block("tip");
        block.nonce += 1;
        assert!(matches!(
            BlockValidator::validate_block(&block, Some("tip")),
            Err(ValidationError::InvalidHeaderHash { .. })
        ));
    }

    #[test]
    fn test_validate_block_bad_merkle() {
        let mut block = sealed_block("tip");
        block.transactions.push(Transaction::coinbase(5, "intruder"));
        assert!(matches!(
            BlockValidator::validate_block(&block, Some("tip")),
            Err(ValidationError::InvalidMerkleRoot { .. })
        ));
    }
}
