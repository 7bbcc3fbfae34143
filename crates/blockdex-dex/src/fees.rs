//! Trade fee schedule.
//!
//! The matching engine never computes rates itself: it consults a pure
//! function of the fill and debits whatever comes back. Fees are
//! denominated in the asset the side receives: base for the buyer, quote
//! for the seller.

use blockdex_types::Side;

/// A trade fee, denominated in the asset the paying side received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeCoin {
    Base(i64),
    Quote(i64),
}

impl FeeCoin {
    #[must_use]
    pub fn amount(&self) -> i64 {
        match self {
            Self::Base(a) | Self::Quote(a) => *a,
        }
    }
}

/// The injected pure fee function consulted once per fill per side.
pub trait TradeFeeSchedule: Send + Sync {
    /// `qty` is the base quantity of the fill, `notional` its quote value
    /// at the clearing price.
    fn trade_fee(&self, qty: i64, notional: i64, side: Side) -> FeeCoin;
}

/// Flat basis-point schedule driven by the consensus fee parameters.
#[derive(Debug, Clone, Copy)]
pub struct StandardFeeSchedule {
    pub rate_bps: i64,
}

impl TradeFeeSchedule for StandardFeeSchedule {
    fn trade_fee(&self, qty: i64, notional: i64, side: Side) -> FeeCoin {
        match side {
            Side::Buy => FeeCoin::Base(mul_bps(qty, self.rate_bps)),
            Side::Sell => FeeCoin::Quote(mul_bps(notional, self.rate_bps)),
        }
    }
}

/// Zero-fee stub for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFees;

impl TradeFeeSchedule for NoFees {
    fn trade_fee(&self, _qty: i64, _notional: i64, side: Side) -> FeeCoin {
        match side {
            Side::Buy => FeeCoin::Base(0),
            Side::Sell => FeeCoin::Quote(0),
        }
    }
}

fn mul_bps(amount: i64, bps: i64) -> i64 {
    let fee = i128::from(amount) * i128::from(bps) / 10_000;
    i64::try_from(fee).unwrap_or(i64::MAX)
}
