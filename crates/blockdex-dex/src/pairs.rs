//! The pair registry: listed trading pairs and their tick/lot parameters.

use std::collections::BTreeMap;

use blockdex_types::{pair_symbol, ExchangeError, Result, TradingPair};

use crate::schedule::tick_and_lot;

/// Listed pairs keyed by symbol, sorted for deterministic export.
#[derive(Debug, Clone, Default)]
pub struct PairRegistry {
    pairs: BTreeMap<String, TradingPair>,
}

impl PairRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn exists(&self, symbol: &str) -> bool {
        self.pairs.contains_key(symbol)
    }

    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<&TradingPair> {
        self.pairs.get(symbol)
    }

    pub fn get_required(&self, symbol: &str) -> Result<&TradingPair> {
        self.get(symbol).ok_or_else(|| ExchangeError::InvalidCoins {
            reason: format!("pair({symbol}) is not listed"),
        })
    }

    /// List a new pair. Tick and lot are seeded from the listing price.
    pub fn list(&mut self, base: &str, quote: &str, init_price: i64) -> Result<&TradingPair> {
        let symbol = pair_symbol(base, quote);
        if self.exists(&symbol) {
            return Err(ExchangeError::InvalidCoins {
                reason: format!("pair({symbol}) is already listed"),
            });
        }
        let (tick_size, lot_size) = tick_and_lot(init_price);
        let pair = TradingPair {
            base: base.to_string(),
            quote: quote.to_string(),
            tick_size,
            lot_size,
            list_price: init_price,
            last_price: init_price,
        };
        Ok(self.pairs.entry(symbol).or_insert(pair))
    }

    pub fn set_last_price(&mut self, symbol: &str, price: i64) {
        if let Some(pair) = self.pairs.get_mut(symbol) {
            pair.last_price = price;
        }
    }

    /// Breathe-block recalibration. Returns `(symbol, tick, lot)` for every
    /// repriced pair.
    pub fn recalibrate(&mut self) -> Vec<(String, i64, i64)> {
        let mut changed = Vec::new();
        for (symbol, pair) in &mut self.pairs {
            if pair.last_price == 0 {
                continue;
            }
            let (tick, lot) = tick_and_lot(pair.last_price);
            pair.tick_size = tick;
            pair.lot_size = lot;
            changed.push((symbol.clone(), tick, lot));
        }
        changed
    }

    /// All pairs in symbol order.
    pub fn all(&self) -> impl Iterator<Item = &TradingPair> {
        self.pairs.values()
    }

    #[must_use]
    pub fn from_pairs(pairs: Vec<TradingPair>) -> Self {
        Self {
            pairs: pairs.into_iter().map(|p| (p.symbol(), p)).collect(),
        }
    }
}
