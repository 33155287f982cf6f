// Node actor: one inbox, one ledger, at most one mining task

use crate::config::LedgerConfig;
use crate::consensus::{CancelFlag, Miner, MiningOutcome, MiningResult};
use crate::core::{format_coins, parse_coins, Block};
use crate::error::{LedgerError, Result};
use crate::ledger::{render_block_summary, Admission, Ledger};
use crate::network::hub::Transport;
use crate::network::message::{Envelope, Message};
use crate::presenter::{Presenter, FIELD_BALANCE, FIELD_BLOCKCHAIN, FIELD_MEMPOOL};
use crate::wallet::KeyPair;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Work items processed by a node, one at a time
#[derive(Debug)]
pub enum NodeCommand {
    /// Broadcast from a peer
    Deliver(Envelope),
    /// Ask the user for a draft and stage it
    CreateTransaction,
    /// Sign a chosen draft, pool and broadcast it
    SendTransaction,
    /// Drop a chosen draft
    DeleteTransaction,
    /// Report whether a chosen mempool transaction verifies
    VerifyTransaction,
    /// Assemble a new candidate block
    CreateBlock,
    /// Start proof-of-work on the candidate
    MineBlock,
    /// Accept and broadcast the mined candidate
    SendBlock,
    Snapshot(oneshot::Sender<NodeSnapshot>),
    Shutdown,
}

/// Point-in-time view of a node's state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSnapshot {
    pub name: String,
    pub address: String,
    pub balance: u64,
    pub mempool: Vec<String>,
    pub chain: Vec<String>,
    pub tip_hash: Option<String>,
    pub drafts: Vec<String>,
    /// Peer name to address
    pub known_nodes: BTreeMap<String, String>,
    pub target: u32,
    pub reward: u64,
    pub candidate: Option<String>,
    pub candidate_mined: bool,
    pub mining: bool,
}

/// Finished mining task: candidate id and result
type MiningEvent = (String, MiningResult);

/// Cloneable sender side of a node's inbox
#[derive(Debug, Clone)]
pub struct NodeHandle {
    name: String,
    inbox: mpsc::UnboundedSender<NodeCommand>,
}

impl NodeHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw inbox sender, for transports
    pub fn inbox(&self) -> mpsc::UnboundedSender<NodeCommand> {
        self.inbox.clone()
    }

    pub fn send(&self, command: NodeCommand) -> Result<()> {
        self.inbox
            .send(command)
            .map_err(|_| LedgerError::NodeStopped(self.name.clone()))
    }

    pub async fn snapshot(&self) -> Result<NodeSnapshot> {
        let (reply, response) = oneshot::channel();
        self.send(NodeCommand::Snapshot(reply))?;
        response
            .await
            .map_err(|_| LedgerError::NodeStopped(self.name.clone()))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(NodeCommand::Shutdown)
    }
}

/// Ledger node driven by peer broadcasts, user commands and mining results
pub struct Node {
    name: String,
    ledger: Ledger,
    presenter: Box<dyn Presenter>,
    transport: Arc<dyn Transport>,
    known_nodes: BTreeMap<String, String>,
    candidate: Option<Block>,
    /// Candidate id and cancel flag of the running mining task
    mining: Option<(String, CancelFlag)>,
    inbox: mpsc::UnboundedReceiver<NodeCommand>,
    mining_tx: mpsc::UnboundedSender<MiningEvent>,
    mining_rx: mpsc::UnboundedReceiver<MiningEvent>,
}

impl Node {
    /// Create a node and the handle feeding its inbox
    pub fn new(
        name: impl Into<String>,
        ledger: Ledger,
        presenter: Box<dyn Presenter>,
        transport: Arc<dyn Transport>,
    ) -> (Self, NodeHandle) {
        let name = name.into();
        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        let (mining_tx, mining_rx) = mpsc::unbounded_channel();

        let node = Self {
            name: name.clone(),
            ledger,
            presenter,
            transport,
            known_nodes: BTreeMap::new(),
            candidate: None,
            mining: None,
            inbox,
            mining_tx,
            mining_rx,
        };
        let handle = NodeHandle {
            name,
            inbox: inbox_tx,
        };
        (node, handle)
    }

    /// Create a node with a fresh key pair
    pub fn generate(
        name: impl Into<String>,
        config: LedgerConfig,
        presenter: Box<dyn Presenter>,
        transport: Arc<dyn Transport>,
    ) -> Result<(Self, NodeHandle)> {
        let ledger = Ledger::new(KeyPair::generate(), config)?;
        Ok(Self::new(name, ledger, presenter, transport))
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Announce this node, then process work until shut down
    pub async fn run(mut self) {
        self.start();

        loop {
            tokio::select! {
                command = self.inbox.recv() => match command {
                    Some(NodeCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some((candidate_id, result)) = self.mining_rx.recv() => {
                    self.on_mining_finished(candidate_id, result);
                }
            }
        }

        self.cancel_mining();
        log::info!("Node {} stopped", self.name);
    }

    fn start(&mut self) {
        log::info!("Node {} started with address {}", self.name, self.ledger.address());
        self.presenter
            .log(&format!("Address: {}", self.ledger.address()));

        let grant = self.ledger.issue_startup_grant();
        self.broadcast(Message::Address(self.ledger.address().to_string()));
        self.broadcast(Message::SystemTransaction(grant));
        self.update_fields();
    }

    fn handle_command(&mut self, command: NodeCommand) {
        match command {
            NodeCommand::Deliver(envelope) => self.on_delivery(envelope),
            NodeCommand::CreateTransaction => self.create_transaction(),
            NodeCommand::SendTransaction => self.send_transaction(),
            NodeCommand::DeleteTransaction => self.delete_transaction(),
            NodeCommand::VerifyTransaction => self.verify_transaction(),
            NodeCommand::CreateBlock => self.create_block(),
            NodeCommand::MineBlock => {
                let result = self.mine_block();
                self.report(result);
            }
            NodeCommand::SendBlock => {
                let result = self.send_block();
                self.report(result);
            }
            NodeCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            NodeCommand::Shutdown => {}
        }
    }

    fn on_delivery(&mut self, envelope: Envelope) {
        let message = match envelope.decode() {
            Ok(message) => message,
            Err(e) => {
                log::warn!(
                    "Node {} dropped malformed {} from {}: {}",
                    self.name,
                    envelope.topic,
                    envelope.sender_id,
                    e
                );
                return;
            }
        };
        log::debug!("Node {} received {} from {}", self.name, envelope.topic, envelope.sender_id);

        match message {
            Message::Address(address) => {
                self.presenter
                    .log(&format!("Node {} has address {}", envelope.sender_id, address));
                self.known_nodes.insert(envelope.sender_id, address);
            }
            Message::SystemTransaction(tx) | Message::Transaction(tx) => {
                let id = tx.id.clone();
                match self.ledger.receive_transaction(tx) {
                    Admission::Accepted => {
                        self.presenter.log(&format!(
                            "Transaction {} from {} added to the mempool",
                            id, envelope.sender_id
                        ));
                        self.update_fields();
                    }
                    Admission::Duplicate => {
                        log::debug!("Node {} already pools transaction {}", self.name, id);
                    }
                    Admission::Rejected => {
                        self.presenter.log(&format!(
                            "Transaction {} from {} rejected: invalid signature",
                            id, envelope.sender_id
                        ));
                    }
                }
            }
            Message::Block(block) => self.on_peer_block(block, &envelope.sender_id),
        }
    }

    fn on_peer_block(&mut self, block: Block, from: &str) {
        let id = block.id.clone();
        if let Err(e) = self.ledger.accept_block(block.clone()) {
            log::warn!("Node {} rejected block {} from {}: {}", self.name, id, from, e);
            self.presenter
                .log(&format!("Block {} from {} rejected: {}", id, from, e));
            return;
        }

        // The search on the old candidate can no longer extend the tip
        self.cancel_mining();
        self.presenter.log(&format!("Block {} from {} accepted", id, from));
        self.presenter.show_block_summary(&self.summarize(&block));
        self.candidate = Some(block);
        self.update_fields();
    }

    fn create_transaction(&mut self) {
        if self.known_nodes.is_empty() {
            self.presenter
                .report_result("No known nodes to send to", false);
            return;
        }

        let recipients: Vec<String> = self.known_nodes.keys().cloned().collect();
        let Some(request) = self.presenter.request_transaction_draft(&recipients) else {
            return;
        };

        let result = parse_coins(&request.amount).and_then(|amount| {
            let address = self
                .known_nodes
                .get(&request.recipient)
                .ok_or_else(|| LedgerError::UnknownRecipient(request.recipient.clone()))?;
            let tx = self.ledger.draft_transaction(amount, address)?;
            Ok(format!(
                "Transaction {} drafted: {} to {}",
                tx.id,
                format_coins(amount),
                request.recipient
            ))
        });
        self.report(result);
    }

    fn send_transaction(&mut self) {
        let Some(tx_id) = self.choose(self.draft_ids()) else {
            return;
        };

        let result = self.ledger.sign_and_submit(&tx_id).map(|tx| {
            self.broadcast(Message::Transaction(tx));
            format!("Transaction {} signed and broadcast", tx_id)
        });
        self.report(result);
        self.update_fields();
    }

    fn delete_transaction(&mut self) {
        let Some(tx_id) = self.choose(self.draft_ids()) else {
            return;
        };

        let result = self
            .ledger
            .delete_draft(&tx_id)
            .map(|_| format!("Transaction {} deleted", tx_id));
        self.report(result);
    }

    fn verify_transaction(&mut self) {
        let Some(tx_id) = self.choose(self.ledger.mempool().ids()) else {
            return;
        };
        let Some(tx) = self.ledger.mempool().get(&tx_id) else {
            return;
        };

        if self.ledger.verify_transaction(tx) {
            self.presenter
                .report_result(&format!("Transaction {} is VALID", tx_id), true);
        } else {
            self.presenter
                .report_result(&format!("Transaction {} is INVALID", tx_id), false);
        }
    }

    fn create_block(&mut self) {
        self.cancel_mining();
        let block = self.ledger.assemble_block();
        self.presenter.report_result(
            &format!(
                "Block {} created with {} transactions",
                block.id,
                block.transactions.len() - 1
            ),
            true,
        );
        self.candidate = Some(block);
    }

    fn mine_block(&mut self) -> Result<String> {
        let candidate = self.candidate.as_ref().ok_or(LedgerError::NoCandidateBlock)?;
        if self.ledger.chain().contains_block(&candidate.id) {
            return Err(LedgerError::BlockAlreadyAccepted(candidate.id.clone()));
        }
        if let Some((mining_id, _)) = &self.mining {
            return Ok(format!("Already mining block {}", mining_id));
        }

        let block = candidate.clone();
        let id = block.id.clone();
        let cancel = CancelFlag::new();
        let miner = Miner::new(cancel.clone());
        let events = self.mining_tx.clone();

        tokio::spawn(async move {
            let candidate_id = block.id.clone();
            let result = miner.mine(block).await;
            let _ = events.send((candidate_id, result));
        });

        self.mining = Some((id.clone(), cancel));
        Ok(format!("Mining block {}", id))
    }

    fn on_mining_finished(&mut self, candidate_id: String, result: MiningResult) {
        let current = matches!(&self.mining, Some((id, _)) if *id == candidate_id);
        if current {
            self.mining = None;
        }

        let attempts = result.attempts;
        let rate = result.hash_rate();

        match result.outcome {
            MiningOutcome::Mined(block) => {
                let is_candidate = self.candidate.as_ref().map(|c| c.id.as_str()) == Some(block.id.as_str());
                if !current || !is_candidate || self.ledger.chain().contains_block(&block.id) {
                    log::debug!("Node {} discarded stale mining result {}", self.name, block.id);
                    return;
                }

                self.presenter.report_result(
                    &format!(
                        "Block {} mined: nonce {}, hash {} ({} attempts, {:.0} H/s)",
                        block.id,
                        block.nonce,
                        block.hash_header_block,
                        attempts,
                        rate
                    ),
                    true,
                );
                self.candidate = Some(block);
            }
            MiningOutcome::Aborted => {
                self.presenter
                    .log(&format!("Mining of block {} aborted", candidate_id));
            }
        }
    }

    fn send_block(&mut self) -> Result<String> {
        let candidate = self.candidate.clone().ok_or(LedgerError::NoCandidateBlock)?;
        self.ledger.publish_candidate(&candidate)?;

        self.presenter.show_block_summary(&self.summarize(&candidate));
        let id = candidate.id.clone();
        self.broadcast(Message::Block(candidate));
        self.update_fields();
        Ok(format!("Block {} accepted and broadcast", id))
    }

    fn cancel_mining(&mut self) {
        if let Some((id, cancel)) = self.mining.take() {
            cancel.cancel();
            log::debug!("Node {} cancelled mining of {}", self.name, id);
        }
    }

    fn draft_ids(&self) -> Vec<String> {
        self.ledger
            .drafts()
            .transactions()
            .iter()
            .map(|tx| tx.id.clone())
            .collect()
    }

    fn choose(&mut self, candidates: Vec<String>) -> Option<String> {
        if candidates.is_empty() {
            self.presenter.report_result("No transactions to choose from", false);
            return None;
        }
        self.presenter.request_transaction_choice(&candidates)
    }

    fn report(&self, result: Result<String>) {
        match result {
            Ok(message) => self.presenter.report_result(&message, true),
            Err(e) => {
                if !e.is_user_error() {
                    log::error!("Node {}: {}", self.name, e);
                }
                self.presenter.report_result(&e.to_string(), false);
            }
        }
    }

    fn broadcast(&self, message: Message) {
        let topic = message.topic();
        match message.into_envelope(&self.name) {
            Ok(envelope) => {
                self.transport
                    .broadcast(&envelope.sender_id, envelope.topic, envelope.payload)
            }
            Err(e) => log::error!("Node {} failed to encode {}: {}", self.name, topic, e),
        }
    }

    fn name_of(&self, address: &str) -> String {
        if address == self.ledger.address() {
            return self.name.clone();
        }
        self.known_nodes
            .iter()
            .find(|(_, known)| known.as_str() == address)
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| address.to_string())
    }

    fn summarize(&self, block: &Block) -> String {
        let chain = self.ledger.chain();
        render_block_summary(
            block,
            |address| self.name_of(address),
            |input| chain.output_value(&input.prev_tx_id, input.output_index),
        )
    }

    fn update_fields(&self) {
        self.presenter
            .update_field(FIELD_BALANCE, &format_coins(self.ledger.wallet().balance()));
        self.presenter
            .update_field(FIELD_MEMPOOL, &self.ledger.mempool().len().to_string());
        self.presenter
            .update_field(FIELD_BLOCKCHAIN, &self.ledger.chain().len().to_string());
    }

    fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            name: self.name.clone(),
            address: self.ledger.address().to_string(),
            balance: self.ledger.wallet().balance(),
            mempool: self.ledger.mempool().ids(),
            chain: self.ledger.chain().ids(),
            tip_hash: self.ledger.chain().tip_hash().map(str::to_string),
            drafts: self.draft_ids(),
            known_nodes: self.known_nodes.clone(),
            target: self.ledger.policy().target,
            reward: self.ledger.policy().reward,
            candidate: self.candidate.as_ref().map(|c| c.id.clone()),
            candidate_mined: self.candidate.as_ref().is_some_and(Block::is_mined),
            mining: self.mining.is_some(),
        }
    }
}

/// Poll a node until `predicate` holds on its snapshot
pub async fn wait_for<F>(handle: &NodeHandle, timeout: std::time::Duration, predicate: F) -> Result<NodeSnapshot>
where
    F: Fn(&NodeSnapshot) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let snapshot = handle.snapshot().await?;
        if predicate(&snapshot) || tokio::time::Instant::now() >= deadline {
            return Ok(snapshot);
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}
