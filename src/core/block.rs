// Block data structures

use crate::core::{sha256_hex, short_id, now_millis, leading_zero_digits, Transaction};
use serde::{Deserialize, Serialize};

/// Current block format version
pub const BLOCK_VERSION: u32 = 1;

/// Block - header fields plus the ordered transaction list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Opaque unique identifier
    pub id: String,
    /// Miner address
    pub sender: String,
    /// Block version
    pub version: u32,
    /// Block timestamp (Unix ms), refreshed on every mining attempt
    pub timestamp: u64,
    /// Header hash of the previous block (or the genesis sentinel)
    pub hash_prev_block: String,
    /// Nonce for proof-of-work
    pub nonce: u64,
    /// Required count of leading zero hex digits
    pub target: u32,
    /// Merkle root of all transactions in the block
    pub merkle_root: String,
    /// Header hash found by mining (empty until mined)
    pub hash_header_block: String,
    /// Transactions in this block, coinbase first
    pub transactions: Vec<Transaction>,
    /// Elapsed milliseconds of the successful search
    pub mining_time: u64,
}

impl Block {
    /// Create a new, unmined block with a fresh id
    pub fn new(sender: impl Into<String>, hash_prev_block: impl Into<String>, target: u32) -> Self {
        Self {
            id: short_id(),
            sender: sender.into(),
            version: BLOCK_VERSION,
            timestamp: now_millis(),
            hash_prev_block: hash_prev_block.into(),
            nonce: 0,
            target,
            merkle_root: String::new(),
            hash_header_block: String::new(),
            transactions: Vec::new(),
            mining_time: 0,
        }
    }

    /// Calculate Merkle root from transactions
    ///
    /// Leaves hash `id|timestamp|sender|version`; each level hashes the
    /// concatenation of adjacent pairs, duplicating the last hash on odd
    /// counts. An empty list has an empty root.
    pub fn calculate_merkle_root(transactions: &[Transaction]) -> String {
        if transactions.is_empty() {
            return String::new();
        }

        let mut hashes: Vec<String> = transactions
            .iter()
            .map(|tx| {
                let leaf = format!(
                    "{}|{}|{}|{}",
                    tx.id, tx.timestamp, tx.sender_hash, tx.version
                );
                sha256_hex(leaf.as_bytes())
            })
            .collect();

        while hashes.len() > 1 {
            let mut next_level = Vec::with_capacity(hashes.len().div_ceil(2));

            for chunk in hashes.chunks(2) {
                let left = &chunk[0];
                let right = chunk.get(1).unwrap_or(left);

                let mut combined = String::with_capacity(left.len() + right.len());
                combined.push_str(left);
                combined.push_str(right);
                next_level.push(sha256_hex(combined.as_bytes()));
            }

            hashes = next_level;
        }

        hashes.remove(0)
    }

    /// Merkle root of this block's current transaction list
    pub fn merkle(&self) -> String {
        Self::calculate_merkle_root(&self.transactions)
    }

    /// Calculate the header hash from the current header fields
    pub fn calculate_hash(&self) -> String {
        let header = format!(
            "{}|{}|{}|{}|{}|{}|{}",
            self.version,
            self.id,
            self.timestamp,
            self.hash_prev_block,
            self.nonce,
            self.target,
            self.merkle_root
        );
        sha256_hex(header.as_bytes())
    }

    /// Check whether the stored hash is present and meets the block's target
    pub fn is_mined(&self) -> bool {
        !self.hash_header_block.is_empty()
            && leading_zero_digits(&self.hash_header_block) >= self.target as usize
    }

    /// The coinbase transaction, if the block has one in first position
    pub fn coinbase(&self) -> Option<&Transaction> {
        self.transactions.first().filter(|tx| tx.is_coinbase())
    }

    /// Check whether the block contains a transaction
    pub fn contains_transaction(&self, tx_id: &str) -> bool {
        self.transactions.iter().any(|tx| tx.id == tx_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TxOutput;

    fn tx(sender: &str) -> Transaction {
        Transaction::new(sender, vec![], vec![TxOutput::new(1, "x")])
    }

    fn header_block() -> Block {
        let mut block = Block::new("miner", "prev", 2);
        block.id = "blk00001".to_string();
        block.timestamp = 1234567890;
        block.merkle_root = "root".to_string();
        block
    }

    #[test]
    fn test_block_hash_deterministic() {
        let block = header_block();
        let hash = block.calculate_hash();
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, header_block().calculate_hash());
    }

    #[test]
    fn test_block_hash_changes_with_each_field() {
        let base = header_block().calculate_hash();

        let mut b = header_block();
        b.nonce += 1;
        assert_ne!(base, b.calculate_hash());

        let mut b = header_block();
        b.timestamp += 1;
        assert_ne!(base, b.calculate_hash());

        let mut b = header_block();
        b.id = "blk00002".to_string();
        assert_ne!(base, b.calculate_hash());

        let mut b = header_block();
        b.hash_prev_block = "other".to_string();
        assert_ne!(base, b.calculate_hash());

        let mut b = header_block();
        b.target = 3;
        assert_ne!(base, b.calculate_hash());

        let mut b = header_block();
        b.merkle_root = "toor".to_string();
        assert_ne!(base, b.calculate_hash());

        let mut b = header_block();
        b.version = 2;
        assert_ne!(base, b.calculate_hash());
    }

    #[test]
    fn test_merkle_root_empty() {
        assert_eq!(Block::calculate_merkle_root(&[]), "");
    }

    #[test]
    fn test_merkle_root_single_tx() {
        let t = tx("a");
        let leaf = format!("{}|{}|{}|{}", t.id, t.timestamp, t.sender_hash, t.version);
        let merkle = Block::calculate_merkle_root(std::slice::from_ref(&t));
        assert_eq!(merkle, sha256_hex(leaf.as_bytes()));
    }

    #[test]
    fn test_merkle_root_order_sensitive() {
        let txs = vec![tx("a"), tx("b"), tx("c")];
        let root = Block::calculate_merkle_root(&txs);
        assert_eq!(root, Block::calculate_merkle_root(&txs));

        let mut swapped = txs.clone();
        swapped.swap(0, 1);
        assert_ne!(root, Block::calculate_merkle_root(&swapped));

        let mut reversed = txs.clone();
        reversed.reverse();
        assert_ne!(root, Block::calculate_merkle_root(&reversed));
    }

    #[test]
    fn test_merkle_root_odd_duplicates_last() {
        let a = tx("a");
        let b = tx("b");
        let c = tx("c");
        let three = Block::calculate_merkle_root(&[a.clone(), b.clone(), c.clone()]);
        let four = Block::calculate_merkle_root(&[a, b, c.clone(), c]);
        assert_eq!(three, four);
    }

    #[test]
    fn test_is_mined() {
        let mut block = header_block();
        assert!(!block.is_mined());

        block.hash_header_block = "00ab".to_string();
        assert!(block.is_mined());

        block.target = 3;
        assert!(!block.is_mined());
    }

    #[test]
    fn test_coinbase_lookup() {
        let mut block = header_block();
        assert!(block.coinbase().is_none());

        block.transactions.push(Transaction::coinbase(10, "miner"));
        block.transactions.push(tx("a"));
        assert!(block.coinbase().is_some());
        assert!(block.contains_transaction(&block.transactions[1].id.clone()));
    }
}
