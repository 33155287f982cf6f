// CLI commands

use crate::config::LedgerConfig;
use crate::core::{format_coins, Block};
use crate::error::{LedgerError, Result};
use crate::ledger::render_block_summary;
use crate::network::{wait_for, LocalNetwork, Node, NodeCommand, NodeSnapshot, Transport};
use crate::presenter::{Choice, ScriptedPresenter};
use crate::storage::BlockArchive;
use crate::wallet::KeyPair;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const ROUND_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Parser)]
#[command(name = "pow-ledger")]
#[command(about = "Didactic proof-of-work UTXO ledger", long_about = None)]
pub struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run nodes on an in-process network and trade coins between them
    Demo {
        /// Number of nodes
        #[arg(short, long, default_value = "3")]
        nodes: usize,
        /// Mining rounds; each round one node mines and then pays its neighbour
        #[arg(short, long, default_value = "3")]
        rounds: usize,
        /// Initial target (leading zero hex digits)
        #[arg(short, long)]
        target: Option<u32>,
        /// Archive accepted blocks under this directory
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Generate a key pair
    Keygen,

    /// Derive the address of a secret key
    Address {
        /// Secret key as hex
        secret: String,
    },

    /// Print the effective configuration
    Config,

    /// Block archive commands
    #[command(subcommand)]
    Block(BlockCommands),
}

#[derive(Subcommand)]
pub enum BlockCommands {
    /// Get block by header hash or height
    Get {
        /// Archive directory of one node
        archive: PathBuf,
        /// Block hash or height
        id: String,
    },

    /// Get archived chain height
    Height {
        archive: PathBuf,
    },

    /// Get header hash of the last archived block
    BestBlock {
        archive: PathBuf,
    },
}

/// CLI handler
pub struct CliHandler {
    config: LedgerConfig,
}

impl CliHandler {
    /// Create a handler, loading the configuration file if given
    pub fn new(config_path: Option<&PathBuf>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                LedgerConfig::load(path)?
            }
            None => LedgerConfig::default(),
        };
        Ok(Self { config })
    }

    /// Handle CLI command
    pub async fn handle(&mut self, cli: Cli) -> Result<()> {
        match cli.command {
            Commands::Demo {
                nodes,
                rounds,
                target,
                data_dir,
            } => {
                if let Some(target) = target {
                    self.config.initial_target = target;
                }
                if data_dir.is_some() {
                    self.config.data_dir = data_dir;
                }
                self.config.validate()?;
                self.demo(nodes, rounds).await
            }
            Commands::Keygen => {
                let keys = KeyPair::generate();
                println!("Address: {}", keys.address);
                println!("Public key: {}", keys.pubkey_hex());
                println!("Secret key: {}", keys.secret_hex());
                Ok(())
            }
            Commands::Address { secret } => {
                let keys = KeyPair::from_secret_hex(&secret)?;
                println!("{}", keys.address);
                Ok(())
            }
            Commands::Config => {
                let json = serde_json::to_string_pretty(&self.config)?;
                println!("{}", json);
                Ok(())
            }
            Commands::Block(cmd) => self.handle_block(cmd),
        }
    }

    /// Run the in-process demo network
    async fn demo(&self, count: usize, rounds: usize) -> Result<()> {
        if count < 2 {
            return Err(LedgerError::Config("demo needs at least 2 nodes".to_string()));
        }

        let network = LocalNetwork::new();
        let transport: Arc<dyn Transport> = Arc::new(network.clone());

        // Register every inbox before any node announces itself
        let mut pending = Vec::with_capacity(count);
        for i in 1..=count {
            let name = format!("node{}", i);
            let presenter = ScriptedPresenter::new(name.clone());
            let (node, handle) = Node::generate(
                name.clone(),
                self.config.clone(),
                Box::new(presenter.clone()),
                transport.clone(),
            )?;
            network.register(&name, handle.inbox());
            pending.push((node, handle, presenter));
        }

        let mut nodes = Vec::with_capacity(count);
        for (node, handle, presenter) in pending {
            node.spawn();
            nodes.push((handle, presenter));
        }

        for (handle, _) in &nodes {
            wait_for(handle, ROUND_TIMEOUT, |s| {
                s.known_nodes.len() == count - 1 && s.mempool.len() >= count
            })
            .await?;
        }
        println!("Nodes online: {}", network.names().join(", "));

        for round in 0..rounds {
            let (miner, miner_view) = &nodes[round % count];
            let height = round + 1;

            miner.send(NodeCommand::CreateBlock)?;
            miner.send(NodeCommand::MineBlock)?;
            let mined = wait_for(miner, ROUND_TIMEOUT, |s| s.candidate_mined && !s.mining).await?;
            if !mined.candidate_mined {
                return Err(LedgerError::Config(format!(
                    "{} did not mine within {:?}; lower the target",
                    miner.name(),
                    ROUND_TIMEOUT
                )));
            }
            miner.send(NodeCommand::SendBlock)?;

            for (handle, _) in &nodes {
                wait_for(handle, ROUND_TIMEOUT, |s| s.chain.len() >= height).await?;
            }
            if let Some(summary) = miner_view.summaries().last() {
                println!("Round {}: {} mined", height, miner.name());
                println!("{}", summary);
            }

            // The miner pays one coin to its neighbour
            let recipient = nodes[(round + 1) % count].0.name().to_string();
            miner_view.queue_draft("1", &recipient);
            miner.send(NodeCommand::CreateTransaction)?;
            miner.snapshot().await?;
            if let Some((_, true)) = miner_view.last_result() {
                miner_view.queue_choice(Choice::Last);
                miner.send(NodeCommand::SendTransaction)?;
                miner.snapshot().await?;
            }
            if let Some((message, success)) = miner_view.last_result() {
                let status = if success { "ok" } else { "failed" };
                println!("{} -> {}: {} ({})", miner.name(), recipient, message, status);
            }
        }

        println!();
        for (handle, _) in &nodes {
            let snapshot = handle.snapshot().await?;
            Self::print_snapshot(&snapshot);
            handle.shutdown()?;
            network.unregister(handle.name());
        }

        Ok(())
    }

    fn print_snapshot(snapshot: &NodeSnapshot) {
        println!("{} ({})", snapshot.name, snapshot.address);
        println!("  Balance: {}", format_coins(snapshot.balance));
        println!("  Blockchain: {} blocks", snapshot.chain.len());
        println!("  MemPool: {} transactions", snapshot.mempool.len());
        println!("  Next target: {}, reward: {}", snapshot.target, format_coins(snapshot.reward));
    }

    /// Handle block commands
    fn handle_block(&self, cmd: BlockCommands) -> Result<()> {
        match cmd {
            BlockCommands::Get { archive, id } => {
                let archive = BlockArchive::new(archive)?;

                // Try parsing as height first
                if let Ok(height) = id.parse::<u32>() {
                    if let Some(block) = archive.get_block_by_height(height)? {
                        Self::print_block(&archive, &block)?;
                        return Ok(());
                    }
                }

                match archive.get_block(&id)? {
                    Some(block) => {
                        Self::print_block(&archive, &block)?;
                        Ok(())
                    }
                    None => Err(LedgerError::Config(format!("Block not found: {}", id))),
                }
            }
            BlockCommands::Height { archive } => {
                let archive = BlockArchive::new(archive)?;
                println!("Blockchain height: {}", archive.get_chain_height()?);
                Ok(())
            }
            BlockCommands::BestBlock { archive } => {
                let archive = BlockArchive::new(archive)?;
                match archive.get_tip()? {
                    Some(hash) => println!("Best block: {}", hash),
                    None => println!("No blocks in chain"),
                }
                Ok(())
            }
        }
    }

    fn print_block(archive: &BlockArchive, block: &Block) -> Result<()> {
        let chain = archive.load_chain()?;
        let summary = render_block_summary(
            block,
            |address| address.to_string(),
            |input| chain.output_value(&input.prev_tx_id, input.output_index),
        );
        println!("{}", summary);
        Ok(())
    }
}
