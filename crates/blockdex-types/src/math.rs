//! Deterministic fixed-point arithmetic.
//!
//! Every price, quantity, and balance is an `i64` scaled by `10^8`.
//! Intermediate products widen to `i128` so they cannot overflow.

use crate::constants::SCALE;

/// `qty × price / 10^8` with half-down rounding (ties round toward zero).
///
/// Saturates at `i64::MAX` on the (astronomical) case where the scaled
/// result itself exceeds 64 bits.
#[must_use]
pub fn big_notional(qty: i64, price: i64) -> i64 {
    let product = i128::from(qty) * i128::from(price);
    let scale = i128::from(SCALE);
    let quot = product / scale;
    let rem = product % scale;
    let rounded = if rem * 2 > scale { quot + 1 } else { quot };
    i64::try_from(rounded).unwrap_or(i64::MAX)
}

/// `qty × price / 10^8` rounded up. Used for the balance lock behind a
/// buy order, so the reservation always covers the worst-case fill.
#[must_use]
pub fn big_notional_ceil(qty: i64, price: i64) -> i64 {
    let product = i128::from(qty) * i128::from(price);
    let scale = i128::from(SCALE);
    let rounded = (product + scale - 1) / scale;
    i64::try_from(rounded).unwrap_or(i64::MAX)
}

/// `10^exp` as an `i64`. `exp` must be at most 18.
#[must_use]
pub fn pow10(exp: u32) -> i64 {
    10_i64.pow(exp)
}

/// Number of decimal digits of a positive value minus one, i.e.
/// `floor(log10(value))`, computed without floating point.
#[must_use]
pub fn floor_log10(value: i64) -> u32 {
    debug_assert!(value > 0);
    let mut v = value;
    let mut digits = 0;
    while v >= 10 {
        v /= 10;
        digits += 1;
    }
    digits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notional_exact() {
        // 2.0 * 50.0 = 100.0
        assert_eq!(big_notional(2 * SCALE, 50 * SCALE), 100 * SCALE);
    }

    #[test]
    fn notional_half_down() {
        // 1 * 0.5e8 / 1e8 = 0.5 → rounds down to 0
        assert_eq!(big_notional(1, SCALE / 2), 0);
        // just over half rounds up
        assert_eq!(big_notional(1, SCALE / 2 + 1), 1);
        // just under half rounds down
        assert_eq!(big_notional(1, SCALE / 2 - 1), 0);
    }

    #[test]
    fn notional_no_intermediate_overflow() {
        // qty and price near the supply ceiling would overflow i64 if the
        // product were computed narrowly.
        let qty = 9_000_000_000_000_000_000;
        let price = 2 * SCALE;
        assert_eq!(big_notional(qty, price), i64::MAX);
        assert_eq!(big_notional(qty, SCALE / 2), qty / 2);
    }

    #[test]
    fn ceil_notional_always_covers() {
        assert_eq!(big_notional_ceil(2 * SCALE, 50 * SCALE), 100 * SCALE);
        // Any positive dust rounds up to one unit.
        assert_eq!(big_notional_ceil(1, 1), 1);
        assert_eq!(big_notional_ceil(1, SCALE / 2), 1);
        assert!(big_notional_ceil(3, SCALE / 3) >= big_notional(3, SCALE / 3));
    }

    #[test]
    fn floor_log10_boundaries() {
        assert_eq!(floor_log10(1), 0);
        assert_eq!(floor_log10(9), 0);
        assert_eq!(floor_log10(10), 1);
        assert_eq!(floor_log10(99), 1);
        assert_eq!(floor_log10(100_000_000), 8);
    }

    #[test]
    fn pow10_values() {
        assert_eq!(pow10(0), 1);
        assert_eq!(pow10(8), SCALE);
    }
}
