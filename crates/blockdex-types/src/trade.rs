//! Trade records produced by the matching engine.

use serde::{Deserialize, Serialize};

use crate::ids::{Address, OrderId};
use crate::math::big_notional;

/// The immutable record of one fill between a buy and a sell order at the
/// round's clearing price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub pair: String,
    /// The clearing price of the round that produced this trade.
    pub price: i64,
    pub quantity: i64,
    pub buy_id: OrderId,
    pub sell_id: OrderId,
    pub buyer: Address,
    pub seller: Address,
    pub block_height: i64,
    /// Unix seconds of the producing block.
    pub block_time: i64,
}

impl Trade {
    /// The quote-asset value of this trade.
    #[must_use]
    pub fn notional(&self) -> i64 {
        big_notional(self.quantity, self.price)
    }
}

impl std::fmt::Display for Trade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Trade {} {} @ {} ({} x {})",
            self.pair, self.quantity, self.price, self.buy_id, self.sell_id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SCALE;

    #[test]
    fn notional_uses_fixed_point() {
        let t = Trade {
            pair: "BTC-1A2_BDX".into(),
            price: 100 * SCALE,
            quantity: 3 * SCALE,
            buy_id: OrderId::new(Address([1; 20]), 0),
            sell_id: OrderId::new(Address([2; 20]), 0),
            buyer: Address([1; 20]),
            seller: Address([2; 20]),
            block_height: 10,
            block_time: 1_700_000_000,
        };
        assert_eq!(t.notional(), 300 * SCALE);
    }
}
