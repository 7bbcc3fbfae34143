//! Read-only queries over committed-adjacent state.
//!
//! Paths: `dex/pairs`, `dex/orderbook/{pair}`, `dex/openorders/{address}`,
//! `tokens/info/{symbol}`. Responses are JSON bytes.

use blockdex_types::constants::MAX_ORDER_BOOK_LEVEL;
use blockdex_types::{Address, ExchangeError, Result, TradingPair};

use crate::publisher::PairLevels;
use crate::ExchangeApp;

impl ExchangeApp {
    /// Route a query path to its subsystem.
    pub fn handle_query(&self, path: &str) -> Result<Vec<u8>> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            ["dex", "pairs"] => {
                let pairs: Vec<&TradingPair> = self.pairs.all().collect();
                encode(&pairs)
            }
            ["dex", "orderbook", pair] => {
                let book = self.keeper.book(pair).ok_or_else(|| {
                    ExchangeError::UnknownRequest {
                        reason: format!("pair({pair}) is not listed"),
                    }
                })?;
                let (bids, asks) = book.top_levels(MAX_ORDER_BOOK_LEVEL);
                encode(&PairLevels {
                    pair: (*pair).to_string(),
                    bids,
                    asks,
                })
            }
            ["dex", "openorders", address] => {
                let addr = Address::from_hex(address).map_err(|_| {
                    ExchangeError::UnknownRequest {
                        reason: format!("bad address {address}"),
                    }
                })?;
                encode(&self.keeper.open_orders(&addr))
            }
            ["tokens", "info", symbol] => {
                let token = self.tokens.get(symbol).map_err(|_| {
                    ExchangeError::UnknownRequest {
                        reason: format!("symbol({symbol}) does not exist"),
                    }
                })?;
                encode(token)
            }
            _ => Err(ExchangeError::UnknownRequest {
                reason: format!("no query handler for path {path}"),
            }),
        }
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| ExchangeError::Internal(format!("query serialization: {e}")))
}
