// Broadcast topics and message envelopes

use crate::core::{Block, Serializable, Transaction};
use crate::error::Result;

/// Broadcast topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// A node announcing its address
    Address,
    /// A start-up grant
    SystemTransaction,
    /// A signed user transaction
    Transaction,
    /// A mined block
    Block,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Address => "ADDRESS",
            Topic::SystemTransaction => "SYSTEM_TRANSACTION",
            Topic::Transaction => "TRANSACTION",
            Topic::Block => "BLOCK",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broadcast payload as delivered to a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub topic: Topic,
    /// Name of the broadcasting node
    pub sender_id: String,
    /// JSON-encoded body
    pub payload: Vec<u8>,
}

/// Decoded envelope body
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Address(String),
    SystemTransaction(Transaction),
    Transaction(Transaction),
    Block(Block),
}

impl Message {
    pub fn topic(&self) -> Topic {
        match self {
            Message::Address(_) => Topic::Address,
            Message::SystemTransaction(_) => Topic::SystemTransaction,
            Message::Transaction(_) => Topic::Transaction,
            Message::Block(_) => Topic::Block,
        }
    }

    /// Encode the body for broadcast
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Message::Address(address) => address.serialize(),
            Message::SystemTransaction(tx) | Message::Transaction(tx) => tx.serialize(),
            Message::Block(block) => block.serialize(),
        }
    }

    /// Wrap into an envelope from `sender_id`
    pub fn into_envelope(self, sender_id: &str) -> Result<Envelope> {
        Ok(Envelope {
            topic: self.topic(),
            sender_id: sender_id.to_string(),
            payload: self.encode()?,
        })
    }
}

impl Envelope {
    /// Decode the body according to the topic
    pub fn decode(&self) -> Result<Message> {
        let message = match self.topic {
            Topic::Address => Message::Address(String::deserialize(&self.payload)?),
            Topic::SystemTransaction => {
                Message::SystemTransaction(Transaction::deserialize(&self.payload)?)
            }
            Topic::Transaction => Message::Transaction(Transaction::deserialize(&self.payload)?),
            Topic::Block => Message::Block(Block::deserialize(&self.payload)?),
        };
        Ok(message)
    }
}
