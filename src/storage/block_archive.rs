// Block archive using sled

use crate::core::{Block, Serializable};
use crate::storage::Chain;
use crate::error::Result;
use sled::Db;
use std::path::Path;

/// Persistent record of the blocks a node accepted
pub struct BlockArchive {
    db: Db,
}

impl BlockArchive {
    /// Open (or create) an archive at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Create an in-memory archive (for testing)
    pub fn memory() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    /// Record an accepted block at `height` and make it the tip
    pub fn store_block(&self, height: u32, block: &Block) -> Result<()> {
        let serialized = block.serialize()?;
        let hash = block.hash_header_block.as_bytes();

        self.db.insert(Self::block_key(hash), serialized)?;
        self.db.insert(Self::height_key(height), hash)?;
        self.db.insert(b"tip", hash)?;
        self.db.insert(b"height", &(height + 1).to_le_bytes())?;
        self.db.flush()?;

        Ok(())
    }

    /// Get a block by header hash
    pub fn get_block(&self, hash: &str) -> Result<Option<Block>> {
        match self.db.get(Self::block_key(hash.as_bytes()))? {
            Some(data) => Ok(Some(Block::deserialize(&data)?)),
            None => Ok(None),
        }
    }

    /// Get block by height
    pub fn get_block_by_height(&self, height: u32) -> Result<Option<Block>> {
        match self.db.get(Self::height_key(height))? {
            Some(hash) => self.get_block(&String::from_utf8_lossy(&hash)),
            None => Ok(None),
        }
    }

    /// Header hash of the last stored block
    pub fn get_tip(&self) -> Result<Option<String>> {
        Ok(self
            .db
            .get(b"tip")?
            .map(|data| String::from_utf8_lossy(&data).into_owned()))
    }

    /// Rebuild the chain from the height index
    pub fn load_chain(&self) -> Result<Chain> {
        let mut chain = Chain::new();
        for height in 0..self.get_chain_height()? {
            if let Some(block) = self.get_block_by_height(height)? {
                chain.push(block);
            }
        }
        Ok(chain)
    }

    /// Number of stored blocks
    pub fn get_chain_height(&self) -> Result<u32> {
        match self.db.get(b"height")? {
            Some(data) if data.len() == 4 => {
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(&data);
                Ok(u32::from_le_bytes(bytes))
            }
            _ => Ok(0), // No blocks stored yet
        }
    }

    // Helper: create key for block storage
    fn block_key(hash: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(hash.len() + 1);
        key.push(b'b'); // 'b' for block
        key.extend_from_slice(hash);
        key
    }

    // Helper: create key for height index
    fn height_key(height: u32) -> Vec<u8> {
        let mut key = Vec::with_capacity(5);
        key.push(b'h'); // 'h' for height
        key.extend_from_slice(&height.to_be_bytes());
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Transaction;

    fn sealed_block(prev: &str) -> Block {
        let mut block = Block::new("miner", prev, 1);
        block.transactions.push(Transaction::coinbase(100, "miner"));
        block.merkle_root = block.merkle();
        block.hash_header_block = block.calculate_hash();
        block
    }

    #[test]
    fn test_store_and_get_block() {
        let archive = BlockArchive::memory().unwrap();
        let block = sealed_block("genesis");

        archive.store_block(0, &block).unwrap();

        let retrieved = archive.get_block(&block.hash_header_block).unwrap().unwrap();
        assert_eq!(block, retrieved);
    }

    #[test]
    fn test_height_index_and_tip() {
        let archive = BlockArchive::memory().unwrap();
        assert_eq!(archive.get_chain_height().unwrap(), 0);
        assert!(archive.get_tip().unwrap().is_none());

        let first = sealed_block("genesis");
        let second = sealed_block(&first.hash_header_block);
        archive.store_block(0, &first).unwrap();
        archive.store_block(1, &second).unwrap();

        assert_eq!(archive.get_chain_height().unwrap(), 2);
        assert_eq!(archive.get_tip().unwrap(), Some(second.hash_header_block.clone()));
        assert_eq!(archive.get_block_by_height(0).unwrap(), Some(first.clone()));
        assert!(archive.get_block_by_height(5).unwrap().is_none());

        let chain = archive.load_chain().unwrap();
        assert_eq!(chain.ids(), vec![first.id.clone(), second.id.clone()]);
    }
}
