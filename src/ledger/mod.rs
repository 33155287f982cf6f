// Ledger engine and block summaries

mod engine;
mod summary;

pub use engine::{Admission, Ledger};
pub use summary::{format_timestamp, render_block_summary};
