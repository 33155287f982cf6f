// Human-readable block summaries

use crate::core::{format_coins, Amount, Block, Transaction, TxInput};
use std::fmt::Write;

/// Format a Unix millisecond timestamp as UTC
pub fn format_timestamp(millis: u64) -> String {
    match chrono::DateTime::from_timestamp_millis(millis as i64) {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string(),
        None => millis.to_string(),
    }
}

/// Render a block for display
///
/// `name_of` maps an address (or sentinel) to a display name and
/// `input_value` resolves the value of the output an input spends.
pub fn render_block_summary<F, V>(block: &Block, name_of: F, input_value: V) -> String
where
    F: Fn(&str) -> String,
    V: Fn(&TxInput) -> Option<Amount>,
{
    let mut out = String::new();

    let _ = writeln!(out, "Block {}", block.id);
    let _ = writeln!(out, "  Version:      {}", block.version);
    let _ = writeln!(out, "  Miner:        {}", name_of(&block.sender));
    let _ = writeln!(out, "  Timestamp:    {}", format_timestamp(block.timestamp));
    let _ = writeln!(out, "  Previous:     {}", block.hash_prev_block);
    let _ = writeln!(out, "  Target:       {}", block.target);
    let _ = writeln!(out, "  Nonce:        {}", block.nonce);
    let _ = writeln!(out, "  Merkle root:  {}", block.merkle_root);
    let _ = writeln!(out, "  Header hash:  {}", block.hash_header_block);
    let _ = writeln!(out, "  Mining time:  {} ms", block.mining_time);
    let _ = writeln!(out, "  Transactions: {}", block.transactions.len());

    for tx in &block.transactions {
        render_transaction(&mut out, tx, &name_of, &input_value);
    }

    out
}

fn render_transaction<F, V>(out: &mut String, tx: &Transaction, name_of: &F, input_value: &V)
where
    F: Fn(&str) -> String,
    V: Fn(&TxInput) -> Option<Amount>,
{
    let expenses: Option<Amount> = tx.inputs.iter().map(|input| input_value(input)).sum();
    let expenses = match expenses {
        Some(value) => format_coins(value),
        None => "unknown".to_string(),
    };

    let _ = writeln!(out, "  - Transaction {} (v{})", tx.id, tx.version);
    let _ = writeln!(out, "      Sender:    {}", name_of(&tx.sender_hash));
    let _ = writeln!(out, "      Timestamp: {}", format_timestamp(tx.timestamp));
    let _ = writeln!(out, "      Inputs:    {}", tx.inputs.len());
    let _ = writeln!(out, "      Outputs:   {}", tx.outputs.len());
    let _ = writeln!(out, "      Total expenses: {}", expenses);
    let _ = writeln!(out, "      Total outputs:  {}", format_coins(tx.total_output_value()));
    let _ = writeln!(out, "      Sent:      {}", format_coins(tx.outgoing_value()));
    let _ = writeln!(out, "      Change:    {}", format_coins(tx.change_value()));
}
