//! Error types for the exchange state machine.
//!
//! Every failure a client can observe carries a stable numeric code, exposed
//! through [`ExchangeError::code`] and embedded in the display string with a
//! `DEX_ERR_` prefix for easy grepping in logs.
//!
//! Codes 1–9 mirror the base codespace of the original chain; 61–63 are the
//! dex codespace.

use thiserror::Error;

use crate::ids::OrderId;

/// Central error enum for all state-machine operations.
#[derive(Debug, Clone, Error)]
pub enum ExchangeError {
    /// Unrecoverable internal error: a state-machine bug. Aborts the
    /// transaction; the state machine itself continues.
    #[error("DEX_ERR_1: internal error: {0}")]
    Internal(String),

    /// The message sender is not permitted to perform the operation.
    #[error("DEX_ERR_4: unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// Not enough available (or locked, for unlocks) balance.
    #[error("DEX_ERR_5: insufficient {symbol}: need {needed}, have {available}")]
    InsufficientCoins {
        symbol: String,
        needed: i64,
        available: i64,
    },

    /// The message variant or query path is not recognized.
    #[error("DEX_ERR_6: unknown request: {reason}")]
    UnknownRequest { reason: String },

    /// A coin amount, symbol, or listing parameter failed validation.
    #[error("DEX_ERR_7: invalid coins: {reason}")]
    InvalidCoins { reason: String },

    /// An order with this id already exists.
    #[error("DEX_ERR_61: duplicated order {0}")]
    DuplicatedOrder(OrderId),

    /// The order to cancel could not be located for this sender.
    ///
    /// Covers both "no such order" and "not your order" so that cancellation
    /// cannot be used as an existence oracle.
    #[error("DEX_ERR_62: failed to locate order to cancel: {0}")]
    FailLocateOrderToCancel(OrderId),

    /// The order passed validation but could not be inserted into the book.
    #[error("DEX_ERR_63: failed to insert order: {reason}")]
    FailInsertOrder { reason: String },
}

impl ExchangeError {
    /// Stable numeric code, as carried in transaction results.
    #[must_use]
    pub fn code(&self) -> u32 {
        match self {
            Self::Internal(_) => 1,
            Self::Unauthorized { .. } => 4,
            Self::InsufficientCoins { .. } => 5,
            Self::UnknownRequest { .. } => 6,
            Self::InvalidCoins { .. } => 7,
            Self::DuplicatedOrder(_) => 61,
            Self::FailLocateOrderToCancel(_) => 62,
            Self::FailInsertOrder { .. } => 63,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, ExchangeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Address;

    #[test]
    fn display_contains_prefix_and_code() {
        let err = ExchangeError::DuplicatedOrder(OrderId::new(Address([1; 20]), 0));
        let msg = format!("{err}");
        assert!(msg.starts_with("DEX_ERR_61"), "got: {msg}");
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(ExchangeError::Internal("x".into()).code(), 1);
        assert_eq!(
            ExchangeError::Unauthorized {
                reason: "x".into()
            }
            .code(),
            4
        );
        assert_eq!(
            ExchangeError::InsufficientCoins {
                symbol: "BDX".into(),
                needed: 2,
                available: 1
            }
            .code(),
            5
        );
        assert_eq!(
            ExchangeError::UnknownRequest {
                reason: "x".into()
            }
            .code(),
            6
        );
        assert_eq!(
            ExchangeError::InvalidCoins {
                reason: "x".into()
            }
            .code(),
            7
        );
    }

    #[test]
    fn all_errors_have_dex_err_prefix() {
        let id = OrderId::new(Address([0; 20]), 1);
        let errors = vec![
            ExchangeError::Internal("test".into()),
            ExchangeError::DuplicatedOrder(id.clone()),
            ExchangeError::FailLocateOrderToCancel(id),
            ExchangeError::FailInsertOrder {
                reason: "full".into(),
            },
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(msg.starts_with("DEX_ERR_"), "missing prefix: {msg}");
        }
    }
}
