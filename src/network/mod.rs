// Node actors and the in-process broadcast transport

mod message;
mod hub;
mod node;

pub use message::{Envelope, Message, Topic};
pub use hub::{LocalNetwork, Transport};
pub use node::{wait_for, Node, NodeCommand, NodeHandle, NodeSnapshot};
