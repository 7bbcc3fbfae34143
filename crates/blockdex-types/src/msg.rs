//! Transaction messages.
//!
//! All state mutations enter the machine as one tagged [`Msg`] variant;
//! dispatch is an exhaustive match. Signature verification and the wire
//! codec are external collaborators; a [`Tx`] arrives already decoded with
//! its hash computed.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ExchangeError, Result};
use crate::ids::{Address, OrderId, TxHash};
use crate::order::{Side, TimeInForce};
use crate::token::validate_symbol_root;

/// Place a new limit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderMsg {
    pub sender: Address,
    pub id: OrderId,
    /// Pair symbol, e.g. `"BTC-1A2_BDX"`.
    pub symbol: String,
    pub side: Side,
    pub price: i64,
    pub quantity: i64,
    pub time_in_force: TimeInForce,
}

/// Cancel a resting order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrderMsg {
    pub sender: Address,
    pub ref_id: OrderId,
}

/// Issue a new token. `total_supply` is in whole tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueMsg {
    pub sender: Address,
    pub name: String,
    pub symbol: String,
    pub total_supply: i64,
    pub decimals: u8,
    pub mintable: bool,
}

/// Mint more supply of a mintable token. `amount` is in whole tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintMsg {
    pub sender: Address,
    pub symbol: String,
    pub amount: i64,
}

/// Administratively immobilize part of the sender's balance.
/// `amount` is in whole tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreezeMsg {
    pub sender: Address,
    pub symbol: String,
    pub amount: i64,
}

/// Release previously frozen balance. `amount` is in whole tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnfreezeMsg {
    pub sender: Address,
    pub symbol: String,
    pub amount: i64,
}

/// List a trading pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMsg {
    pub sender: Address,
    pub base_symbol: String,
    pub quote_symbol: String,
    pub init_price: i64,
}

/// The tagged message variant dispatched by the handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Msg {
    NewOrder(NewOrderMsg),
    CancelOrder(CancelOrderMsg),
    Issue(IssueMsg),
    Mint(MintMsg),
    Freeze(FreezeMsg),
    Unfreeze(UnfreezeMsg),
    List(ListMsg),
}

impl Msg {
    /// The signing account, used for fee charging and account publication.
    #[must_use]
    pub fn sender(&self) -> Address {
        match self {
            Self::NewOrder(m) => m.sender,
            Self::CancelOrder(m) => m.sender,
            Self::Issue(m) => m.sender,
            Self::Mint(m) => m.sender,
            Self::Freeze(m) => m.sender,
            Self::Unfreeze(m) => m.sender,
            Self::List(m) => m.sender,
        }
    }

    /// Stable route name, used for fee lookup and logging.
    #[must_use]
    pub fn route(&self) -> &'static str {
        match self {
            Self::NewOrder(_) => "dexNewOrder",
            Self::CancelOrder(_) => "dexCancelOrder",
            Self::Issue(_) => "tokensIssue",
            Self::Mint(_) => "tokensMint",
            Self::Freeze(_) => "tokensFreeze",
            Self::Unfreeze(_) => "tokensUnfreeze",
            Self::List(_) => "dexList",
        }
    }

    /// Stateless validation, run in both check and deliver mode before any
    /// stateful handler work.
    pub fn validate_basic(&self) -> Result<()> {
        match self {
            Self::NewOrder(m) => {
                if m.price <= 0 {
                    return Err(ExchangeError::InvalidCoins {
                        reason: "price must be positive".into(),
                    });
                }
                if m.quantity <= 0 {
                    return Err(ExchangeError::InvalidCoins {
                        reason: "quantity must be positive".into(),
                    });
                }
                if !m.id.as_str().starts_with(&m.sender.hex()) {
                    return Err(ExchangeError::InvalidCoins {
                        reason: "order id must be derived from the sender address".into(),
                    });
                }
                Ok(())
            }
            Self::CancelOrder(_) => Ok(()),
            Self::Issue(m) => {
                validate_symbol_root(&m.symbol)?;
                if m.total_supply <= 0 {
                    return Err(ExchangeError::InvalidCoins {
                        reason: "total supply must be positive".into(),
                    });
                }
                Ok(())
            }
            Self::Mint(m) => {
                if m.amount <= 0 {
                    return Err(ExchangeError::InvalidCoins {
                        reason: "mint amount must be positive".into(),
                    });
                }
                Ok(())
            }
            Self::Freeze(m) => {
                if m.amount <= 0 {
                    return Err(ExchangeError::InsufficientCoins {
                        symbol: m.symbol.clone(),
                        needed: 1,
                        available: m.amount,
                    });
                }
                Ok(())
            }
            Self::Unfreeze(m) => {
                if m.amount <= 0 {
                    return Err(ExchangeError::InsufficientCoins {
                        symbol: m.symbol.clone(),
                        needed: 1,
                        available: m.amount,
                    });
                }
                Ok(())
            }
            Self::List(m) => {
                if m.init_price <= 0 {
                    return Err(ExchangeError::InvalidCoins {
                        reason: "init price must be positive".into(),
                    });
                }
                if m.base_symbol == m.quote_symbol {
                    return Err(ExchangeError::InvalidCoins {
                        reason: "base and quote must differ".into(),
                    });
                }
                Ok(())
            }
        }
    }
}

/// A decoded transaction with the hash the codec computed over its wire
/// bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    pub msg: Msg,
    pub hash: TxHash,
}

impl Tx {
    #[must_use]
    pub fn with_hash(msg: Msg, hash: TxHash) -> Self {
        Self { msg, hash }
    }

    /// Build a transaction hashing the canonical JSON encoding of the
    /// message. The production codec hashes wire bytes instead; this keeps
    /// tests and genesis transactions deterministic.
    #[must_use]
    pub fn new(msg: Msg) -> Self {
        let encoded = serde_json::to_vec(&msg).expect("message serialization is infallible");
        let digest = Sha256::digest(&encoded);
        Self {
            msg,
            hash: TxHash(digest.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SCALE;

    fn sender() -> Address {
        Address([3; 20])
    }

    fn new_order_msg() -> NewOrderMsg {
        NewOrderMsg {
            sender: sender(),
            id: OrderId::new(sender(), 1),
            symbol: "BTC-1A2_BDX".into(),
            side: Side::Buy,
            price: 100 * SCALE,
            quantity: SCALE,
            time_in_force: TimeInForce::GoodTillExpire,
        }
    }

    #[test]
    fn new_order_validates_price_and_quantity() {
        let mut m = new_order_msg();
        assert!(Msg::NewOrder(m.clone()).validate_basic().is_ok());
        m.price = 0;
        assert!(Msg::NewOrder(m.clone()).validate_basic().is_err());
        m.price = 100 * SCALE;
        m.quantity = -1;
        assert!(Msg::NewOrder(m).validate_basic().is_err());
    }

    #[test]
    fn new_order_id_must_match_sender() {
        let mut m = new_order_msg();
        m.id = OrderId::new(Address([7; 20]), 1);
        let err = Msg::NewOrder(m).validate_basic().unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidCoins { .. }));
    }

    #[test]
    fn list_rejects_self_pair() {
        let m = ListMsg {
            sender: sender(),
            base_symbol: "BDX".into(),
            quote_symbol: "BDX".into(),
            init_price: SCALE,
        };
        assert!(Msg::List(m).validate_basic().is_err());
    }

    #[test]
    fn tx_hash_is_deterministic() {
        let a = Tx::new(Msg::CancelOrder(CancelOrderMsg {
            sender: sender(),
            ref_id: OrderId::new(sender(), 1),
        }));
        let b = Tx::new(Msg::CancelOrder(CancelOrderMsg {
            sender: sender(),
            ref_id: OrderId::new(sender(), 1),
        }));
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn routes_are_distinct() {
        let m = new_order_msg();
        assert_eq!(Msg::NewOrder(m).route(), "dexNewOrder");
    }
}
