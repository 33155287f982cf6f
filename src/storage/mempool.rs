// Pool of unconfirmed transactions

use crate::core::{Amount, Transaction};

/// Unconfirmed transactions, unique by id, ordered oldest first
#[derive(Debug, Clone, Default)]
pub struct Mempool {
    transactions: Vec<Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transaction; returns false if its id is already pooled
    pub fn add(&mut self, tx: Transaction) -> bool {
        if self.contains(&tx.id) {
            return false;
        }

        // Insert after every transaction with an equal or older timestamp
        let pos = self
            .transactions
            .partition_point(|t| t.timestamp <= tx.timestamp);
        self.transactions.insert(pos, tx);
        true
    }

    /// Remove a transaction by id
    pub fn remove(&mut self, tx_id: &str) -> Option<Transaction> {
        let pos = self.transactions.iter().position(|t| t.id == tx_id)?;
        Some(self.transactions.remove(pos))
    }

    pub fn contains(&self, tx_id: &str) -> bool {
        self.transactions.iter().any(|t| t.id == tx_id)
    }

    pub fn get(&self, tx_id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == tx_id)
    }

    /// Up to `count` oldest transactions
    pub fn oldest(&self, count: usize) -> Vec<Transaction> {
        self.transactions.iter().take(count).cloned().collect()
    }

    /// Value an address has already committed to others in pooled transactions
    pub fn committed_by(&self, address: &str) -> Amount {
        self.transactions
            .iter()
            .filter(|t| t.sender_hash == address)
            .map(|t| t.outgoing_value())
            .sum()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn ids(&self) -> Vec<String> {
        self.transactions.iter().map(|t| t.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
