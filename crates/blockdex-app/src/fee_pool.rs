//! The block fee pool and validator distribution.
//!
//! Flat message fees are committed per transaction hash; trade fees arrive
//! from the matching phase. EndBlock drains the pool and splits it across
//! the validator accounts.

use blockdex_ledger::Ledger;
use blockdex_types::{Address, Coins, Result, TxHash};

/// Fees accumulated during the current block.
#[derive(Debug, Default)]
pub struct FeePool {
    /// `(tx_hash, fee)` per successful transaction, in delivery order.
    committed: Vec<(TxHash, Coins)>,
    block_fee: Coins,
}

impl FeePool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a delivered transaction's fee under its hash.
    pub fn commit_fee(&mut self, tx_hash: TxHash, symbol: &str, amount: i64) {
        if amount == 0 {
            return;
        }
        let mut coins = Coins::new();
        coins.add(symbol, amount);
        self.block_fee.extend(&coins);
        self.committed.push((tx_hash, coins));
    }

    /// Fold a matching-phase fee straight into the block fee.
    pub fn add_trade_fee(&mut self, fee: &Coins) {
        self.block_fee.extend(fee);
    }

    #[must_use]
    pub fn block_fee(&self) -> &Coins {
        &self.block_fee
    }

    /// Take everything accumulated this block.
    pub fn drain(&mut self) -> Coins {
        self.committed.clear();
        std::mem::take(&mut self.block_fee)
    }
}

/// Credit the block fee to the validator accounts: an equal integer split
/// per symbol, remainder to the first validator by sorted address. Returns
/// the validators that received anything.
pub fn distribute_block_fee(
    ledger: &mut Ledger,
    validators: &[Address],
    block_fee: &Coins,
) -> Result<Vec<Address>> {
    if validators.is_empty() || block_fee.is_empty() {
        return Ok(Vec::new());
    }
    let n = validators.len() as i64;
    let mut credited = Vec::new();
    for (symbol, amount) in block_fee.iter() {
        let share = amount / n;
        let remainder = amount % n;
        for (i, validator) in validators.iter().enumerate() {
            let amt = if i == 0 { share + remainder } else { share };
            if amt > 0 {
                ledger.add_available(validator, symbol, amt)?;
                if !credited.contains(validator) {
                    credited.push(*validator);
                }
            }
        }
    }
    Ok(credited)
}
