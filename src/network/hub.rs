// In-process transport routing broadcasts between node inboxes

use crate::network::message::{Envelope, Topic};
use crate::network::node::NodeCommand;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc::UnboundedSender;

/// Broadcast side of a node's peer transport
pub trait Transport: Send + Sync {
    /// Deliver `payload` on `topic` to every peer except `from`
    fn broadcast(&self, from: &str, topic: Topic, payload: Vec<u8>);
}

/// Loopback network of nodes living in the same process
#[derive(Clone, Default)]
pub struct LocalNetwork {
    peers: Arc<RwLock<HashMap<String, UnboundedSender<NodeCommand>>>>,
}

impl LocalNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node inbox under its name
    pub fn register(&self, name: &str, inbox: UnboundedSender<NodeCommand>) {
        let mut peers = self.peers.write().unwrap_or_else(|e| e.into_inner());
        if peers.insert(name.to_string(), inbox).is_some() {
            log::warn!("Replaced inbox of node {}", name);
        }
        log::debug!("Node {} joined the local network", name);
    }

    pub fn unregister(&self, name: &str) {
        let mut peers = self.peers.write().unwrap_or_else(|e| e.into_inner());
        peers.remove(name);
    }

    /// Registered node names, sorted
    pub fn names(&self) -> Vec<String> {
        let peers = self.peers.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = peers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Transport for LocalNetwork {
    fn broadcast(&self, from: &str, topic: Topic, payload: Vec<u8>) {
        let peers = self.peers.read().unwrap_or_else(|e| e.into_inner());
        let mut delivered = 0;

        for (name, inbox) in peers.iter().filter(|(name, _)| name.as_str() != from) {
            let envelope = Envelope {
                topic,
                sender_id: from.to_string(),
                payload: payload.clone(),
            };
            match inbox.send(NodeCommand::Deliver(envelope)) {
                Ok(()) => delivered += 1,
                Err(_) => log::debug!("Node {} stopped; dropped {} from {}", name, topic, from),
            }
        }

        log::debug!("Broadcast {} from {} to {} peers", topic, from, delivered);
    }
}
