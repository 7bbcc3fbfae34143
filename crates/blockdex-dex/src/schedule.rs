//! The tick/lot recalibration schedule.
//!
//! At every breathe block each pair's tick size and lot size are recomputed
//! from its last trade price by a fixed monotone step table: one decade of
//! price moves the tick up a decade and the lot down a decade, anchored so
//! a price around `10^13` (100k in quote units) trades with lot 1.

use blockdex_types::constants::SCALE;
use blockdex_types::math::{floor_log10, pow10};

/// `(tick_size, lot_size)` for a last trade price.
///
/// `tick = 10^max(d−5, 0)` and `lot = 10^max(13−d, 0)` where
/// `d = floor(log10(price))`. Non-positive prices fall back to the listing
/// defaults `(1, SCALE)`.
#[must_use]
pub fn tick_and_lot(last_price: i64) -> (i64, i64) {
    if last_price <= 0 {
        return (1, SCALE);
    }
    let d = floor_log10(last_price);
    let tick = pow10(d.saturating_sub(5));
    let lot = pow10(13_u32.saturating_sub(d));
    (tick, lot)
}
