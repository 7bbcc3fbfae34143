//! The balance ledger.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use blockdex_types::{Address, ExchangeError, Result};

/// The three balance buckets for one (account, symbol) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    pub available: i64,
    pub locked: i64,
    pub frozen: i64,
}

impl Balances {
    #[must_use]
    pub fn total(&self) -> i64 {
        self.available + self.locked + self.frozen
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.available == 0 && self.locked == 0 && self.frozen == 0
    }
}

/// Pure balance state: `(account, symbol) → Balances`.
///
/// Iteration-facing methods return sorted data so everything derived from
/// the ledger (store records, hashes, publication snapshots) is
/// deterministic.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    accounts: HashMap<Address, BTreeMap<String, Balances>>,
}

impl Ledger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, addr: &Address, symbol: &str) -> Balances {
        self.accounts
            .get(addr)
            .and_then(|assets| assets.get(symbol))
            .copied()
            .unwrap_or_default()
    }

    fn entry(&mut self, addr: &Address, symbol: &str) -> &mut Balances {
        self.accounts
            .entry(*addr)
            .or_default()
            .entry(symbol.to_string())
            .or_default()
    }

    // =================================================================
    // Atomic operations
    // =================================================================

    /// Credit `amount` to the available bucket.
    pub fn add_available(&mut self, addr: &Address, symbol: &str, amount: i64) -> Result<()> {
        check_positive(symbol, amount)?;
        let entry = self.entry(addr, symbol);
        entry.available = checked_add(entry.available, amount)?;
        Ok(())
    }

    /// Debit `amount` from the available bucket.
    pub fn sub_available(&mut self, addr: &Address, symbol: &str, amount: i64) -> Result<()> {
        check_positive(symbol, amount)?;
        let entry = self.entry(addr, symbol);
        if entry.available < amount {
            return Err(insufficient(symbol, amount, entry.available));
        }
        entry.available -= amount;
        Ok(())
    }

    /// Encumber `amount` behind a live order.
    pub fn move_available_to_locked(
        &mut self,
        addr: &Address,
        symbol: &str,
        amount: i64,
    ) -> Result<()> {
        check_positive(symbol, amount)?;
        let entry = self.entry(addr, symbol);
        if entry.available < amount {
            return Err(insufficient(symbol, amount, entry.available));
        }
        entry.available -= amount;
        entry.locked = checked_add(entry.locked, amount)?;
        Ok(())
    }

    /// Release an order's encumbrance back to available.
    pub fn move_locked_to_available(
        &mut self,
        addr: &Address,
        symbol: &str,
        amount: i64,
    ) -> Result<()> {
        check_positive(symbol, amount)?;
        let entry = self.entry(addr, symbol);
        if entry.locked < amount {
            return Err(insufficient(symbol, amount, entry.locked));
        }
        entry.locked -= amount;
        entry.available = checked_add(entry.available, amount)?;
        Ok(())
    }

    /// Administratively immobilize `amount`.
    pub fn move_available_to_frozen(
        &mut self,
        addr: &Address,
        symbol: &str,
        amount: i64,
    ) -> Result<()> {
        check_positive(symbol, amount)?;
        let entry = self.entry(addr, symbol);
        if entry.available < amount {
            return Err(insufficient(symbol, amount, entry.available));
        }
        entry.available -= amount;
        entry.frozen = checked_add(entry.frozen, amount)?;
        Ok(())
    }

    /// Release administratively immobilized balance.
    pub fn move_frozen_to_available(
        &mut self,
        addr: &Address,
        symbol: &str,
        amount: i64,
    ) -> Result<()> {
        check_positive(symbol, amount)?;
        let entry = self.entry(addr, symbol);
        if entry.frozen < amount {
            return Err(insufficient(symbol, amount, entry.frozen));
        }
        entry.frozen -= amount;
        entry.available = checked_add(entry.available, amount)?;
        Ok(())
    }

    /// Pay `amount` out of `payer`'s locked bucket into `payee`'s available
    /// bucket: the settlement primitive for a fill.
    pub fn settle_locked(
        &mut self,
        payer: &Address,
        payee: &Address,
        symbol: &str,
        amount: i64,
    ) -> Result<()> {
        check_positive(symbol, amount)?;
        {
            let from = self.entry(payer, symbol);
            if from.locked < amount {
                return Err(insufficient(symbol, amount, from.locked));
            }
            from.locked -= amount;
        }
        let to = self.entry(payee, symbol);
        to.available = checked_add(to.available, amount)?;
        Ok(())
    }

    // =================================================================
    // Queries
    // =================================================================

    /// All balances of one account, sorted by symbol.
    #[must_use]
    pub fn balances_of(&self, addr: &Address) -> BTreeMap<String, Balances> {
        self.accounts.get(addr).cloned().unwrap_or_default()
    }

    /// The ledger-wide total of one symbol across every bucket.
    #[must_use]
    pub fn total_of(&self, symbol: &str) -> i128 {
        self.accounts
            .values()
            .filter_map(|assets| assets.get(symbol))
            .map(|b| i128::from(b.total()))
            .sum()
    }

    /// Full export in sorted order, for store commits and hashing.
    #[must_use]
    pub fn export(&self) -> Vec<(Address, Vec<(String, Balances)>)> {
        let mut addrs: Vec<&Address> = self.accounts.keys().collect();
        addrs.sort();
        addrs
            .into_iter()
            .map(|addr| {
                let assets = self.accounts[addr]
                    .iter()
                    .map(|(s, b)| (s.clone(), *b))
                    .collect();
                (*addr, assets)
            })
            .collect()
    }

    /// Rebuild a ledger from an export, e.g. when loading from the store.
    #[must_use]
    pub fn from_export(entries: Vec<(Address, Vec<(String, Balances)>)>) -> Self {
        let mut ledger = Self::new();
        for (addr, assets) in entries {
            ledger.accounts.insert(addr, assets.into_iter().collect());
        }
        ledger
    }
}

fn check_positive(symbol: &str, amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(ExchangeError::InvalidCoins {
            reason: format!("{symbol} amount must be positive, got {amount}"),
        });
    }
    Ok(())
}

fn checked_add(current: i64, amount: i64) -> Result<i64> {
    current
        .checked_add(amount)
        .ok_or_else(|| ExchangeError::Internal("balance overflow".into()))
}

fn insufficient(symbol: &str, needed: i64, available: i64) -> ExchangeError {
    ExchangeError::InsufficientCoins {
        symbol: symbol.to_string(),
        needed,
        available,
    }
}
