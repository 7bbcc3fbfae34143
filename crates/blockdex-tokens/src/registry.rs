//! The token registry: symbol → metadata.

use std::collections::BTreeMap;

use blockdex_types::constants::TOKEN_MAX_TOTAL_SUPPLY;
use blockdex_types::{ExchangeError, Result, Token};

/// All registered tokens, sorted by symbol for deterministic export.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: BTreeMap<String, Token>,
}

impl TokenRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn exists(&self, symbol: &str) -> bool {
        self.tokens.contains_key(symbol)
    }

    pub fn get(&self, symbol: &str) -> Result<&Token> {
        self.tokens.get(symbol).ok_or_else(|| ExchangeError::InvalidCoins {
            reason: format!("symbol({symbol}) does not exist"),
        })
    }

    /// Register a new token. Fails when the symbol is taken.
    pub fn insert(&mut self, token: Token) -> Result<()> {
        if self.exists(&token.symbol) {
            return Err(ExchangeError::InvalidCoins {
                reason: format!("symbol({}) already exists", token.symbol),
            });
        }
        self.tokens.insert(token.symbol.clone(), token);
        Ok(())
    }

    /// Raise a token's total supply, enforcing the global ceiling.
    pub fn raise_supply(&mut self, symbol: &str, scaled_amount: i64) -> Result<i64> {
        let token = self
            .tokens
            .get_mut(symbol)
            .ok_or_else(|| ExchangeError::InvalidCoins {
                reason: format!("symbol({symbol}) does not exist"),
            })?;
        // Subtract to test the bound so the check itself cannot overflow.
        if scaled_amount > TOKEN_MAX_TOTAL_SUPPLY - token.total_supply {
            return Err(ExchangeError::InvalidCoins {
                reason: format!(
                    "mint amount is too large, the max total supply is {TOKEN_MAX_TOTAL_SUPPLY}"
                ),
            });
        }
        token.total_supply += scaled_amount;
        Ok(token.total_supply)
    }

    /// All tokens in symbol order.
    pub fn all(&self) -> impl Iterator<Item = &Token> {
        self.tokens.values()
    }

    /// Rebuild from a sorted export, e.g. when loading from the store.
    #[must_use]
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter().map(|t| (t.symbol.clone(), t)).collect(),
        }
    }
}
