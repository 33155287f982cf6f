// Append-only chain of accepted blocks

use crate::core::{Amount, Block, Transaction};

/// Accepted blocks in acceptance order
#[derive(Debug, Clone, Default)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn tip(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Header hash of the last accepted block
    pub fn tip_hash(&self) -> Option<&str> {
        self.tip().map(|b| b.hash_header_block.as_str())
    }

    pub fn contains_block(&self, block_id: &str) -> bool {
        self.blocks.iter().any(|b| b.id == block_id)
    }

    pub fn contains_transaction(&self, tx_id: &str) -> bool {
        self.blocks.iter().any(|b| b.contains_transaction(tx_id))
    }

    /// All confirmed transactions, oldest block first
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.blocks.iter().flat_map(|b| b.transactions.iter())
    }

    /// Index of the first output of transaction `tx_id` owned by `address`
    pub fn find_output_index(&self, tx_id: &str, address: &str) -> Option<u32> {
        self.transactions()
            .filter(|tx| tx.id == tx_id)
            .find_map(|tx| tx.output_index_for(address))
    }

    /// Value of output `index` of confirmed transaction `tx_id`
    pub fn output_value(&self, tx_id: &str, index: u32) -> Option<Amount> {
        self.transactions()
            .find(|tx| tx.id == tx_id)
            .and_then(|tx| tx.outputs.get(index as usize))
            .map(|out| out.value)
    }

    pub fn ids(&self) -> Vec<String> {
        self.blocks.iter().map(|b| b.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
