// Transaction builder

use crate::core::{sign_digest, Amount, ScriptSig, Transaction, TxInput, TxOutput, now_millis};
use crate::error::{LedgerError, Result};
use crate::storage::{Chain, Mempool};
use crate::wallet::{KeyPair, Wallet};
use std::collections::HashSet;

/// Transaction builder over a wallet and the accepted chain
pub struct TransactionBuilder<'a> {
    wallet: &'a Wallet,
    chain: &'a Chain,
    /// Owned outputs already spent by pending transactions, by tx id
    reserved: HashSet<String>,
}

impl<'a> TransactionBuilder<'a> {
    /// Create a new transaction builder
    pub fn new(wallet: &'a Wallet, chain: &'a Chain) -> Self {
        Self {
            wallet,
            chain,
            reserved: HashSet::new(),
        }
    }

    /// Skip outputs whose transaction ids are already spent by pending inputs
    pub fn reserving(mut self, reserved: HashSet<String>) -> Self {
        self.reserved = reserved;
        self
    }

    /// Build an unsigned transaction paying `amount` to `recipient`
    pub fn build(&self, recipient: &str, amount: Amount) -> Result<Transaction> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount("amount must be positive".to_string()));
        }

        let sender = self.wallet.address();
        let (selected, total_input) = self.select_outputs(amount)?;

        // Resolve each selected output to its position in the chain
        let mut inputs = Vec::with_capacity(selected.len());
        for tx_id in selected {
            let output_index = self
                .chain
                .find_output_index(&tx_id, sender)
                .ok_or_else(|| LedgerError::ReferenceNotFound {
                    tx_id: tx_id.clone(),
                    address: sender.to_string(),
                })?;
            inputs.push(TxInput::new(tx_id, output_index));
        }

        // Payment output
        let mut outputs = vec![TxOutput::new(amount, recipient)];

        // Change output (if any)
        let change = total_input - amount;
        if change > 0 {
            outputs.push(TxOutput::new(change, sender));
        }

        Ok(Transaction::new(sender, inputs, outputs))
    }

    /// Select unreserved owned outputs in insertion order until they cover `target`
    fn select_outputs(&self, target: Amount) -> Result<(Vec<String>, Amount)> {
        let mut selected = Vec::new();
        let mut total = 0;

        let unspent = self
            .wallet
            .outputs()
            .filter(|(tx_id, _)| !self.reserved.contains(*tx_id));

        for (tx_id, output) in unspent {
            selected.push(tx_id.to_string());
            total += output.value;

            if total >= target {
                return Ok((selected, total));
            }
        }

        Err(LedgerError::InsufficientFunds {
            available: total,
            required: target,
        })
    }
}

/// Check that a wallet can cover a transaction on top of its own pending spends
///
/// Outputs paid back to the sender are not counted.
pub fn check_spendable(tx: &Transaction, wallet: &Wallet, mempool: &Mempool) -> Result<()> {
    let required = tx.outgoing_value();
    let committed = mempool.committed_by(wallet.address());
    let available = wallet.balance().saturating_sub(committed);

    if required > available {
        return Err(LedgerError::InsufficientFunds {
            available,
            required,
        });
    }
    Ok(())
}

/// Stamp the transaction with the current time and sign every input
pub fn sign_transaction(tx: &mut Transaction, keypair: &KeyPair) -> Result<()> {
    tx.timestamp = now_millis();

    let pubkey = keypair.pubkey_hex();
    let mut script_sigs = Vec::with_capacity(tx.inputs.len());
    for input in &tx.inputs {
        let digest = tx.input_digest(input);
        let signature = sign_digest(&digest, &keypair.secret_key)?;
        script_sigs.push(ScriptSig::single(pubkey.clone(), signature));
    }

    for (input, script_sig) in tx.inputs.iter_mut().zip(script_sigs) {
        input.script_sig = script_sig;
    }

    Ok(())
}
