// Storage layer: mempool, chain, drafts and the optional block archive

mod mempool;
mod chain;
mod drafts;
mod block_archive;

pub use mempool::Mempool;
pub use chain::Chain;
pub use drafts::PendingDrafts;
pub use block_archive::BlockArchive;
