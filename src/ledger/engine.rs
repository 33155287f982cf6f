// Ledger engine: drafting, signing, assembly and block acceptance

use crate::config::LedgerConfig;
use crate::consensus::{BlockValidator, Miner, MiningPolicy, TransactionValidator, ValidationError};
use crate::core::{Amount, Block, Transaction, GENESIS_PREV_PREFIX};
use crate::error::{LedgerError, Result};
use crate::storage::{BlockArchive, Chain, Mempool, PendingDrafts};
use crate::wallet::{check_spendable, sign_transaction, KeyPair, TransactionBuilder, Wallet};
use std::collections::HashSet;

/// Outcome of offering a peer transaction to the mempool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// Already pooled or confirmed; nothing changed
    Duplicate,
    /// Signature verification failed
    Rejected,
}

/// All ledger state owned by one node
pub struct Ledger {
    config: LedgerConfig,
    wallet: Wallet,
    mempool: Mempool,
    chain: Chain,
    drafts: PendingDrafts,
    policy: MiningPolicy,
    archive: Option<BlockArchive>,
}

impl Ledger {
    /// Create a ledger for a key pair
    ///
    /// Opens a block archive under `data_dir/<address>` when configured.
    pub fn new(keys: KeyPair, config: LedgerConfig) -> Result<Self> {
        config.validate()?;

        let archive = match &config.data_dir {
            Some(dir) => Some(BlockArchive::new(dir.join(&keys.address))?),
            None => None,
        };

        Ok(Self {
            policy: MiningPolicy::new(&config),
            wallet: Wallet::new(keys),
            mempool: Mempool::new(),
            chain: Chain::new(),
            drafts: PendingDrafts::new(),
            archive,
            config,
        })
    }

    /// Attach a block archive
    pub fn with_archive(mut self, archive: BlockArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn address(&self) -> &str {
        self.wallet.address()
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn drafts(&self) -> &PendingDrafts {
        &self.drafts
    }

    pub fn policy(&self) -> &MiningPolicy {
        &self.policy
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn archive(&self) -> Option<&BlockArchive> {
        self.archive.as_ref()
    }

    /// Issue the start-up grant to this node and pool it
    pub fn issue_startup_grant(&mut self) -> Transaction {
        let grant = Transaction::system_grant(self.config.startup_grant, self.wallet.address());
        self.mempool.add(grant.clone());
        log::info!("Issued start-up grant {} to {}", grant.id, self.wallet.address());
        grant
    }

    /// Owned outputs already spent by this wallet's pooled or drafted inputs
    fn reserved_outputs(&self) -> HashSet<String> {
        let address = self.wallet.address();
        self.mempool
            .transactions()
            .iter()
            .filter(|tx| tx.sender_hash == address)
            .chain(self.drafts.transactions())
            .flat_map(|tx| tx.inputs.iter().map(|input| input.prev_tx_id.clone()))
            .collect()
    }

    /// Draft an unsigned transaction into the pending drafts
    ///
    /// Outputs spent by pending transactions are not selected again.
    pub fn draft_transaction(&mut self, amount: Amount, recipient: &str) -> Result<Transaction> {
        let tx = TransactionBuilder::new(&self.wallet, &self.chain)
            .reserving(self.reserved_outputs())
            .build(recipient, amount)?;
        self.drafts.push(tx.clone());
        log::info!("Drafted transaction {} paying {} units to {}", tx.id, amount, recipient);
        Ok(tx)
    }

    /// Drop a pending draft
    pub fn delete_draft(&mut self, tx_id: &str) -> Result<Transaction> {
        self.drafts
            .take(tx_id)
            .ok_or_else(|| LedgerError::DraftNotFound(tx_id.to_string()))
    }

    /// Sign a pending draft and move it into the mempool
    ///
    /// Returns the signed transaction for broadcast. The draft stays pending
    /// if the wallet cannot cover it on top of its own pooled spends.
    pub fn sign_and_submit(&mut self, tx_id: &str) -> Result<Transaction> {
        let draft = self
            .drafts
            .get(tx_id)
            .ok_or_else(|| LedgerError::DraftNotFound(tx_id.to_string()))?;

        check_spendable(draft, &self.wallet, &self.mempool)?;

        let mut tx = draft.clone();
        sign_transaction(&mut tx, self.wallet.keys())?;

        self.drafts.take(tx_id);
        self.mempool.add(tx.clone());
        log::info!("Signed and pooled transaction {}", tx.id);
        Ok(tx)
    }

    /// Verify a transaction's input signatures
    pub fn verify_transaction(&self, tx: &Transaction) -> bool {
        TransactionValidator::verify_transaction(tx)
    }

    /// Offer a transaction received from a peer to the mempool
    ///
    /// Transactions already confirmed in the chain are not pooled again.
    pub fn receive_transaction(&mut self, tx: Transaction) -> Admission {
        if self.chain.contains_transaction(&tx.id) {
            log::debug!("Transaction {} is already confirmed", tx.id);
            return Admission::Duplicate;
        }
        if !self.verify_transaction(&tx) {
            log::warn!("Rejected invalid transaction {}", tx.id);
            return Admission::Rejected;
        }
        if !self.mempool.add(tx) {
            return Admission::Duplicate;
        }
        Admission::Accepted
    }

    /// Previous-block hash for the next candidate
    pub fn next_prev_hash(&self) -> String {
        match self.chain.tip_hash() {
            Some(hash) => hash.to_string(),
            None => format!(
                "{} {}",
                GENESIS_PREV_PREFIX,
                chrono::Local::now().format("%Y-%m-%d")
            ),
        }
    }

    /// Assemble a candidate block from the oldest pooled transactions
    ///
    /// The coinbase paying this node comes first; the Merkle root is set.
    pub fn assemble_block(&self) -> Block {
        let mut block = Block::new(
            self.wallet.address(),
            self.next_prev_hash(),
            self.policy.target,
        );

        let coinbase = Transaction::coinbase(self.policy.reward, self.wallet.address());
        block.transactions.push(coinbase);
        block
            .transactions
            .extend(self.mempool.oldest(self.config.max_block_transactions));
        block.merkle_root = block.merkle();

        log::info!(
            "Assembled block {} with {} transactions (target {})",
            block.id,
            block.transactions.len() - 1,
            block.target
        );
        block
    }

    /// Check a block's Merkle root, header hash and linkage to the tip
    pub fn verify_block(&self, block: &Block) -> std::result::Result<(), ValidationError> {
        BlockValidator::validate_block(block, self.chain.tip_hash())
    }

    /// Verify and accept a block
    ///
    /// Removes its transactions from the mempool, appends it, applies it to
    /// the wallet and adjusts difficulty and reward. A rejected block leaves
    /// all state untouched.
    pub fn accept_block(&mut self, block: Block) -> Result<()> {
        self.verify_block(&block)?;

        for tx in &block.transactions {
            self.mempool.remove(&tx.id);
        }

        for tx in &block.transactions {
            self.wallet.apply_transaction(tx);
        }

        let height = self.chain.len() as u32;
        if let Some(archive) = &self.archive {
            if let Err(e) = archive.store_block(height, &block) {
                log::error!("Failed to archive block {}: {}", block.id, e);
            }
        }

        self.chain.push(block);
        if let Some(accepted) = self.chain.tip() {
            self.policy.adjust(accepted, self.chain.len());
            log::info!(
                "Accepted block {} at height {} ({})",
                accepted.id,
                height,
                accepted.hash_header_block
            );
        }

        Ok(())
    }

    /// Accept this node's own mined candidate before broadcasting it
    pub fn publish_candidate(&mut self, candidate: &Block) -> Result<()> {
        if self.chain.contains_block(&candidate.id) {
            return Err(LedgerError::BlockAlreadyAccepted(candidate.id.clone()));
        }
        if !Miner::verify(candidate) {
            return Err(LedgerError::BlockNotMined(candidate.id.clone()));
        }
        self.accept_block(candidate.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{CancelFlag, MiningOutcome};
    use crate::core::COIN;

    fn fast_config() -> LedgerConfig {
        LedgerConfig {
            initial_target: 1,
            ..LedgerConfig::default()
        }
    }

    fn ledger() -> Ledger {
        Ledger::new(KeyPair::generate(), fast_config()).unwrap()
    }

    async fn mine(block: Block) -> Block {
        match Miner::new(CancelFlag::new()).mine(block).await.outcome {
            MiningOutcome::Mined(block) => block,
            MiningOutcome::Aborted => panic!("mining aborted"),
        }
    }

    #[test]
    fn test_startup_grant_pooled() {
        let mut node = ledger();
        let grant = node.issue_startup_grant();

        assert!(node.mempool().contains(&grant.id));
        assert_eq!(grant.outputs[0].value, 10 * COIN);
        assert_eq!(grant.outputs[0].script_pub_key, node.address());
        assert_eq!(node.wallet().balance(), 0);
    }

    #[test]
    fn test_assemble_block_coinbase_first() {
        let mut node = ledger();
        for _ in 0..6 {
            node.issue_startup_grant();
        }

        let block = node.assemble_block();

        assert_eq!(block.transactions.len(), 5); // coinbase + 4 oldest
        let coinbase = block.coinbase().expect("coinbase first");
        assert_eq!(coinbase.outputs.len(), 1);
        assert_eq!(coinbase.outputs[0].script_pub_key, node.address());
        assert_eq!(coinbase.outputs[0].value, node.policy().reward);
        assert_eq!(block.merkle_root, block.merkle());
        assert!(block.hash_prev_block.starts_with(GENESIS_PREV_PREFIX));
        assert_eq!(block.target, 1);
    }

    #[test]
    fn test_assemble_empty_mempool() {
        let node = ledger();
        let block = node.assemble_block();
        assert_eq!(block.transactions.len(), 1);
        assert!(!block.merkle_root.is_empty());
    }

    #[test]
    fn test_publish_requires_mined_block() {
        let mut node = ledger();
        let block = node.assemble_block();

        assert!(matches!(
            node.publish_candidate(&block),
            Err(LedgerError::BlockNotMined(_))
        ));
        assert!(node.chain().is_empty());
    }

    #[tokio::test]
    async fn test_publish_rejects_duplicate() {
        let mut node = ledger();
        let block = mine(node.assemble_block()).await;

        node.publish_candidate(&block).unwrap();
        assert!(matches!(
            node.publish_candidate(&block),
            Err(LedgerError::BlockAlreadyAccepted(_))
        ));
        assert_eq!(node.chain().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_block_leaves_state_untouched() {
        let mut a = ledger();
        let mut b = ledger();
        a.issue_startup_grant();

        let first = mine(b.assemble_block()).await;
        b.publish_candidate(&first).unwrap();

        // Block built on an empty chain does not extend b's tip
        let stale = mine(a.assemble_block()).await;
        let target_before = b.policy().target;

        assert!(matches!(
            b.accept_block(stale),
            Err(LedgerError::InvalidBlock(ValidationError::PrevHashMismatch { .. }))
        ));
        assert_eq!(b.chain().len(), 1);
        assert_eq!(b.policy().target, target_before);
    }

    #[tokio::test]
    async fn test_tampered_block_rejected() {
        let mut a = ledger();
        let mut b = ledger();

        let mut block = mine(a.assemble_block()).await;
        block.transactions[0].outputs[0].value += 1;
        block.nonce += 1;

        assert!(matches!(
            b.accept_block(block.clone()),
            Err(LedgerError::InvalidBlock(ValidationError::InvalidHeaderHash { .. }))
        ));
        assert!(a.accept_block(block).is_err());
        assert!(b.chain().is_empty());
    }

    #[tokio::test]
    async fn test_end_to_end_transfer() {
        let mut a = ledger();
        let mut b = ledger();

        // A's grant reaches B's mempool; B mines it so A starts with exactly 10
        let grant = a.issue_startup_grant();
        assert_eq!(b.receive_transaction(grant), Admission::Accepted);

        let first = mine(b.assemble_block()).await;
        b.publish_candidate(&first).unwrap();
        a.accept_block(first).unwrap();

        assert_eq!(a.wallet().balance(), 10 * COIN);
        let b_before = b.wallet().balance();
        assert!(a.mempool().is_empty());
        assert!(b.mempool().is_empty());

        // A drafts and signs 4 to B
        let draft = a.draft_transaction(4 * COIN, b.address()).unwrap();
        assert_eq!(a.drafts().len(), 1);
        assert!(!a.mempool().contains(&draft.id));

        let signed = a.sign_and_submit(&draft.id).unwrap();
        assert!(a.drafts().is_empty());
        assert!(a.mempool().contains(&signed.id));

        assert!(b.verify_transaction(&signed));
        assert_eq!(b.receive_transaction(signed.clone()), Admission::Accepted);

        // A mines the block carrying the transfer, both accept it
        let reward = a.policy().reward;
        let second = mine(a.assemble_block()).await;
        assert!(second.contains_transaction(&signed.id));
        a.publish_candidate(&second).unwrap();
        b.accept_block(second).unwrap();

        assert_eq!(a.wallet().balance(), 10 * COIN - 4 * COIN + reward);
        assert_eq!(b.wallet().balance(), b_before + 4 * COIN);
        assert!(!a.mempool().contains(&signed.id));
        assert!(!b.mempool().contains(&signed.id));
        assert_eq!(a.chain().len(), 2);
        assert_eq!(a.chain().tip_hash(), b.chain().tip_hash());
    }

    #[tokio::test]
    async fn test_pending_outputs_not_reselected() {
        let mut a = ledger();
        let reward = a.policy().reward;
        a.issue_startup_grant();
        let block = mine(a.assemble_block()).await;
        a.publish_candidate(&block).unwrap();
        assert_eq!(a.wallet().balance(), 10 * COIN + reward);

        // The second draft must not spend the output the first one took
        let first = a.draft_transaction(4 * COIN, "bob").unwrap();
        a.sign_and_submit(&first.id).unwrap();
        let second = a.draft_transaction(2 * COIN, "bob").unwrap();
        a.sign_and_submit(&second.id).unwrap();
        assert!(second
            .inputs
            .iter()
            .all(|input| first.inputs.iter().all(|i| i.prev_tx_id != input.prev_tx_id)));

        let block = mine(a.assemble_block()).await;
        assert!(block.contains_transaction(&first.id));
        assert!(block.contains_transaction(&second.id));
        a.publish_candidate(&block).unwrap();

        assert_eq!(a.wallet().balance(), 10 * COIN + reward - 6 * COIN + reward);
    }

    #[tokio::test]
    async fn test_drafted_outputs_reserved_until_deleted() {
        let mut a = ledger();
        a.issue_startup_grant();
        let block = mine(a.assemble_block()).await;
        a.publish_candidate(&block).unwrap();

        // Spends both owned outputs
        let first = a.draft_transaction(10 * COIN + 1, "bob").unwrap();
        assert_eq!(first.inputs.len(), 2);
        assert!(matches!(
            a.draft_transaction(COIN, "bob"),
            Err(LedgerError::InsufficientFunds { available: 0, .. })
        ));

        a.delete_draft(&first.id).unwrap();
        let retry = a.draft_transaction(COIN, "bob").unwrap();
        assert_eq!(retry.outputs[0].value, COIN);
    }

    #[tokio::test]
    async fn test_confirmed_transaction_not_pooled_again() {
        let mut a = ledger();
        let mut b = ledger();

        let grant = a.issue_startup_grant();
        assert_eq!(b.receive_transaction(grant.clone()), Admission::Accepted);
        let block = mine(b.assemble_block()).await;
        b.publish_candidate(&block).unwrap();
        a.accept_block(block).unwrap();

        assert_eq!(b.receive_transaction(grant.clone()), Admission::Duplicate);
        assert_eq!(a.receive_transaction(grant.clone()), Admission::Duplicate);
        assert!(!b.mempool().contains(&grant.id));
        assert!(!b.assemble_block().contains_transaction(&grant.id));
    }

    #[test]
    fn test_forged_peer_transaction_rejected() {
        let mut b = ledger();
        let mut tx = Transaction::new(
            "someone",
            vec![crate::core::TxInput::new("x".to_string(), 0)],
            vec![crate::core::TxOutput::new(1, "b")],
        );
        tx.inputs[0].script_sig = crate::core::ScriptSig::single(
            KeyPair::generate().pubkey_hex(),
            "3006020101020101".to_string(),
        );

        assert_eq!(b.receive_transaction(tx), Admission::Rejected);
        assert!(b.mempool().is_empty());
    }

    #[test]
    fn test_delete_draft() {
        let mut a = ledger();
        assert!(matches!(a.delete_draft("nope"), Err(LedgerError::DraftNotFound(_))));
    }

    #[tokio::test]
    async fn test_accepted_blocks_archived() {
        let mut a = ledger().with_archive(BlockArchive::memory().unwrap());
        let block = mine(a.assemble_block()).await;
        a.publish_candidate(&block).unwrap();

        let archive = a.archive().unwrap();
        assert_eq!(archive.get_chain_height().unwrap(), 1);
        assert_eq!(archive.get_tip().unwrap(), Some(block.hash_header_block));
    }
}
