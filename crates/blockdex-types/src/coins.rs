//! Multi-asset coin amounts.
//!
//! [`Coins`] keeps one non-negative amount per symbol in sorted order so
//! that serialization and iteration are deterministic.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An amount of a single asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub symbol: String,
    pub amount: i64,
}

impl Coin {
    #[must_use]
    pub fn new(symbol: impl Into<String>, amount: i64) -> Self {
        Self {
            symbol: symbol.into(),
            amount,
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.symbol)
    }
}

/// A sorted collection of per-symbol amounts. Zero entries are pruned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coins(BTreeMap<String, i64>);

impl Coins {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` of `symbol`. Amounts saturate rather than wrap.
    pub fn add(&mut self, symbol: &str, amount: i64) {
        if amount == 0 {
            return;
        }
        let entry = self.0.entry(symbol.to_string()).or_insert(0);
        *entry = entry.saturating_add(amount);
        if *entry == 0 {
            self.0.remove(symbol);
        }
    }

    pub fn extend(&mut self, other: &Coins) {
        for (symbol, amount) in &other.0 {
            self.add(symbol, *amount);
        }
    }

    #[must_use]
    pub fn amount_of(&self, symbol: &str) -> i64 {
        self.0.get(symbol).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(s, a)| (s.as_str(), *a))
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl FromIterator<Coin> for Coins {
    fn from_iter<T: IntoIterator<Item = Coin>>(iter: T) -> Self {
        let mut coins = Coins::new();
        for coin in iter {
            coins.add(&coin.symbol, coin.amount);
        }
        coins
    }
}
