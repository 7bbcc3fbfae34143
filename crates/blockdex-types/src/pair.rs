//! Trading-pair records.

use serde::{Deserialize, Serialize};

/// A listed trading pair. `tick_size` and `lot_size` are recomputed from
/// `last_price` at every breathe block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingPair {
    pub base: String,
    pub quote: String,
    pub tick_size: i64,
    pub lot_size: i64,
    /// The price the pair was listed at.
    pub list_price: i64,
    /// The most recent trade price; seeds the auction reference price.
    pub last_price: i64,
}

impl TradingPair {
    #[must_use]
    pub fn symbol(&self) -> String {
        pair_symbol(&self.base, &self.quote)
    }
}

impl std::fmt::Display for TradingPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// The canonical pair symbol, `"BASE_QUOTE"`.
///
/// Token symbols never contain an underscore, so the symbol splits back
/// unambiguously.
#[must_use]
pub fn pair_symbol(base: &str, quote: &str) -> String {
    format!("{base}_{quote}")
}

/// Split a pair symbol into `(base, quote)`.
#[must_use]
pub fn split_pair_symbol(symbol: &str) -> Option<(&str, &str)> {
    symbol.split_once('_')
}
