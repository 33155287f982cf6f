// Basic types shared by the ledger data model

use crate::error::{LedgerError, Result};
use std::time::{SystemTime, UNIX_EPOCH};

/// Amount in base units (1 coin = 100,000,000 units)
pub type Amount = u64;

/// Base units per coin
pub const COIN: Amount = 100_000_000;

/// Sender of the start-up grant each node issues itself
pub const SYSTEM_SENDER: &str = "SYSTEM";

/// Sender of block reward transactions
pub const COINBASE_SENDER: &str = "SYSTEM_COINBASE";

/// Prefix of the previous-block hash used by the first block of a chain
pub const GENESIS_PREV_PREFIX: &str = "ON BRINK OF COLLAPSE";

/// Check whether a sender hash denotes system-issued value
pub fn is_system_sender(sender_hash: &str) -> bool {
    sender_hash == SYSTEM_SENDER || sender_hash == COINBASE_SENDER
}

/// Current Unix time in milliseconds
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Short random identifier used for transactions and blocks
pub fn short_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Parse a decimal coin amount ("4", "0.25") into base units
pub fn parse_coins(input: &str) -> Result<Amount> {
    let trimmed = input.trim();
    let invalid = || LedgerError::InvalidAmount(input.to_string());

    let (whole, frac) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if frac.len() > 8 || !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let whole_units = if whole.is_empty() {
        0
    } else {
        whole.parse::<u64>().map_err(|_| invalid())?
    };
    let frac_units = if frac.is_empty() {
        0
    } else {
        format!("{:0<8}", frac).parse::<u64>().map_err(|_| invalid())?
    };

    let amount = whole_units
        .checked_mul(COIN)
        .and_then(|w| w.checked_add(frac_units))
        .ok_or_else(invalid)?;

    if amount == 0 {
        return Err(LedgerError::InvalidAmount(format!("{} (must be positive)", input)));
    }
    Ok(amount)
}

/// Render base units as a coin string
pub fn format_coins(amount: Amount) -> String {
    let whole = amount / COIN;
    let frac = amount % COIN;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:08}", frac);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}
