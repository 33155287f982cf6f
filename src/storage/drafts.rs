// Staging area for transactions not yet broadcast

use crate::core::Transaction;

/// Node-local drafted transactions
#[derive(Debug, Clone, Default)]
pub struct PendingDrafts {
    drafts: Vec<Transaction>,
}

impl PendingDrafts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tx: Transaction) {
        self.drafts.push(tx);
    }

    /// Take a draft out of the staging area
    pub fn take(&mut self, tx_id: &str) -> Option<Transaction> {
        let pos = self.drafts.iter().position(|t| t.id == tx_id)?;
        Some(self.drafts.remove(pos))
    }

    pub fn get(&self, tx_id: &str) -> Option<&Transaction> {
        self.drafts.iter().find(|t| t.id == tx_id)
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.drafts
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }
}
