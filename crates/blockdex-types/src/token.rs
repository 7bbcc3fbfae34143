//! Token metadata records.
//!
//! Issued symbols carry a `-XXX` suffix derived from the issuing
//! transaction hash, which keeps symbols unique even when two issuers pick
//! the same root.

use serde::{Deserialize, Serialize};

use crate::constants::{
    MAX_DECIMALS, MAX_SYMBOL_LEN, MAX_TOKEN_NAME_LEN, MIN_SYMBOL_LEN, TOKEN_MAX_TOTAL_SUPPLY,
};
use crate::error::{ExchangeError, Result};
use crate::ids::{Address, TxHash};
use crate::math::pow10;

/// A registered token.
///
/// `total_supply` is stored scaled by `10^decimals` and always lies in
/// `[1, TOKEN_MAX_TOTAL_SUPPLY]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub name: String,
    pub symbol: String,
    pub total_supply: i64,
    pub decimals: u8,
    pub owner: Address,
    pub mintable: bool,
}

impl Token {
    /// Build a validated token record. `total_supply` is given in whole
    /// tokens and stored scaled by `10^decimals`.
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        total_supply: i64,
        decimals: u8,
        owner: Address,
        mintable: bool,
    ) -> Result<Self> {
        let name = name.into();
        let symbol = symbol.into();
        if name.is_empty() || name.len() > MAX_TOKEN_NAME_LEN {
            return Err(ExchangeError::InvalidCoins {
                reason: format!("token name must be 1-{MAX_TOKEN_NAME_LEN} characters"),
            });
        }
        validate_issued_symbol(&symbol)?;
        if decimals > MAX_DECIMALS {
            return Err(ExchangeError::InvalidCoins {
                reason: format!("decimals must be at most {MAX_DECIMALS}"),
            });
        }
        let scaled = scale_amount(total_supply, decimals)?;
        Ok(Self {
            name,
            symbol,
            total_supply: scaled,
            decimals,
            owner,
            mintable,
        })
    }

    #[must_use]
    pub fn is_owner(&self, addr: &Address) -> bool {
        self.owner == *addr
    }
}

/// Scale a whole-token amount by `10^decimals`, enforcing the supply range.
pub fn scale_amount(amount: i64, decimals: u8) -> Result<i64> {
    if amount <= 0 {
        return Err(ExchangeError::InvalidCoins {
            reason: "amount must be positive".into(),
        });
    }
    let scaled = i128::from(amount) * i128::from(pow10(u32::from(decimals)));
    if scaled > i128::from(TOKEN_MAX_TOTAL_SUPPLY) {
        return Err(ExchangeError::InvalidCoins {
            reason: format!("amount exceeds the max total supply {TOKEN_MAX_TOTAL_SUPPLY}"),
        });
    }
    Ok(scaled as i64)
}

/// Validate a symbol root: upper-case alphanumeric, no suffix.
pub fn validate_symbol_root(symbol: &str) -> Result<()> {
    if symbol.len() < MIN_SYMBOL_LEN || symbol.len() > MAX_SYMBOL_LEN {
        return Err(ExchangeError::InvalidCoins {
            reason: format!("symbol must be {MIN_SYMBOL_LEN}-{MAX_SYMBOL_LEN} characters"),
        });
    }
    if !symbol.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return Err(ExchangeError::InvalidCoins {
            reason: "symbol must be upper-case alphanumeric".into(),
        });
    }
    Ok(())
}

/// Validate a full symbol: either a bare root (the native token) or
/// `ROOT-XXX` with an upper-case hex suffix.
pub fn validate_issued_symbol(symbol: &str) -> Result<()> {
    match symbol.split_once('-') {
        None => validate_symbol_root(symbol),
        Some((root, suffix)) => {
            validate_symbol_root(root)?;
            if suffix.is_empty()
                || !suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
            {
                return Err(ExchangeError::InvalidCoins {
                    reason: "symbol suffix must be upper-case hex".into(),
                });
            }
            Ok(())
        }
    }
}

/// Suffix a symbol root with the leading hex characters of the issuing
/// transaction hash.
#[must_use]
pub fn suffixed_symbol(root: &str, tx_hash: &TxHash) -> String {
    format!("{root}-{}", tx_hash.symbol_suffix())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SCALE;

    fn owner() -> Address {
        Address([9; 20])
    }

    #[test]
    fn new_token_scales_supply() {
        let t = Token::new("Example", "EXM-1AB", 1_000, 8, owner(), false).unwrap();
        assert_eq!(t.total_supply, 1_000 * SCALE);
    }

    #[test]
    fn supply_over_ceiling_rejected() {
        // 10^11 whole tokens at 8 decimals = 10^19 > ceiling.
        let err = Token::new("Big", "BIG-1AB", 100_000_000_000, 8, owner(), false).unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidCoins { .. }));
    }

    #[test]
    fn supply_at_ceiling_accepted() {
        let t = Token::new("Max", "MAX-1AB", 90_000_000_000, 8, owner(), true).unwrap();
        assert_eq!(t.total_supply, TOKEN_MAX_TOTAL_SUPPLY);
    }

    #[test]
    fn zero_and_negative_supply_rejected() {
        assert!(Token::new("Z", "ZRO-1AB", 0, 8, owner(), false).is_err());
        assert!(Token::new("N", "NEG-1AB", -5, 8, owner(), false).is_err());
    }

    #[test]
    fn decimals_range() {
        assert!(Token::new("T", "TKA-1AB", 10, 9, owner(), false).is_err());
        assert!(Token::new("T", "TKA-1AB", 10, 0, owner(), false).is_ok());
    }

    #[test]
    fn symbol_validation() {
        assert!(validate_symbol_root("BDX").is_ok());
        assert!(validate_symbol_root("btc").is_err());
        assert!(validate_symbol_root("B").is_err());
        assert!(validate_symbol_root("TOOLONGSYM").is_err());
        assert!(validate_issued_symbol("BTC-1A2").is_ok());
        assert!(validate_issued_symbol("BTC-").is_err());
    }

    #[test]
    fn suffix_from_tx_hash() {
        let hash = TxHash([0xCD; 32]);
        assert_eq!(suffixed_symbol("BTC", &hash), "BTC-CDC");
    }
}
