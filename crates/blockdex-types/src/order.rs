//! Order model: resting orders, lifecycle status, and the per-block change
//! events consumed by the publication pipeline.

use serde::{Deserialize, Serialize};

use crate::ids::{Address, OrderId};

/// Which side of the book an order rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// How long an order remains eligible to rest on the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Rests until filled, cancelled, or older than the order TTL.
    GoodTillExpire,
    /// Must fill in its arrival block's auction; the remainder is removed.
    ImmediateOrCancel,
    /// Expires at the first breathe block of the next UTC day.
    Day,
}

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartialFill,
    FullyFill,
    Canceled,
    Expired,
    IocNoFill,
}

impl OrderStatus {
    /// Terminal orders are retained in the publication map only until their
    /// termination event has been acknowledged by the publisher.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::FullyFill | Self::Canceled | Self::Expired | Self::IocNoFill
        )
    }
}

/// A live order held by the order keeper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub sender: Address,
    /// The pair symbol, e.g. `"BTC-1A2_BDX"`.
    pub pair: String,
    pub side: Side,
    pub price: i64,
    pub quantity: i64,
    pub cum_filled: i64,
    /// The exact ledger lock still attributable to this order (quote for
    /// buys, base for sells). Termination releases precisely this amount so
    /// notional rounding never strands dust in `locked`.
    pub locked_remaining: i64,
    pub time_in_force: TimeInForce,
    pub created_height: i64,
    /// Unix seconds of the creating block.
    pub created_time: i64,
    pub status: OrderStatus,
}

impl Order {
    #[must_use]
    pub fn leaves(&self) -> i64 {
        self.quantity - self.cum_filled
    }

    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.leaves() == 0
    }
}

/// Which event a change-log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    New,
    Cancel,
    Fill { qty: i64, price: i64 },
    Expire,
    IocNoFill,
}

/// An entry in the per-block, append-only order change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderChange {
    pub id: OrderId,
    pub kind: ChangeKind,
}

/// The latest publication view of an order, kept in `order_changes_map`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderInfo {
    pub id: OrderId,
    pub sender: Address,
    pub pair: String,
    pub side: Side,
    pub price: i64,
    pub quantity: i64,
    pub cum_filled: i64,
    pub status: OrderStatus,
    pub created_height: i64,
    pub created_time: i64,
}

impl From<&Order> for OrderInfo {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.clone(),
            sender: order.sender,
            pair: order.pair.clone(),
            side: order.side,
            price: order.price,
            quantity: order.quantity,
            cum_filled: order.cum_filled,
            status: order.status,
            created_height: order.created_height,
            created_time: order.created_time,
        }
    }
}
