//! Uniform clearing-price selection.
//!
//! Given the aggregated half books and a reference price, picks the single
//! price every fill of the round executes at. The rules are evaluated in
//! order; the first decisive rule wins:
//!
//! 1. maximize executable volume `V(p) = min(Σ buys ≥ p, Σ sells ≤ p)`
//! 2. among ties, minimize the absolute imbalance `|buy_vol − sell_vol|`
//! 3. if the remaining ties all carry surplus on the same side, follow the
//!    market pressure: buy surplus picks the highest tied price, sell
//!    surplus the lowest
//! 4. otherwise pick the price closest to the reference; a final tie picks
//!    the higher price
//!
//! Candidate prices are exactly the resting order prices. Same inputs →
//! same price, on every node.

/// The selected price and the volume executable at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearingOutcome {
    pub price: i64,
    pub volume: i128,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    price: i64,
    exec: i128,
    imbalance: i128,
}

/// Select the clearing price.
///
/// `bids` is `(price, level quantity)` highest price first; `asks` is lowest
/// price first. Returns `None` when the sides do not cross.
#[must_use]
pub fn select_clearing_price(
    bids: &[(i64, i128)],
    asks: &[(i64, i128)],
    reference_price: i64,
) -> Option<ClearingOutcome> {
    let best_bid = bids.first()?.0;
    let best_ask = asks.first()?.0;
    if best_bid < best_ask {
        return None;
    }

    // Candidate prices: every distinct resting price, descending.
    let mut prices: Vec<i64> = bids.iter().chain(asks.iter()).map(|(p, _)| *p).collect();
    prices.sort_unstable_by(|a, b| b.cmp(a));
    prices.dedup();

    // Cumulative buy volume at or above each candidate (walk descending).
    let mut buy_cums = Vec::with_capacity(prices.len());
    let mut bid_idx = 0;
    let mut buy_cum: i128 = 0;
    for &p in &prices {
        while bid_idx < bids.len() && bids[bid_idx].0 >= p {
            buy_cum += bids[bid_idx].1;
            bid_idx += 1;
        }
        buy_cums.push(buy_cum);
    }

    // Cumulative sell volume at or below each candidate (walk ascending).
    let mut sell_cums = vec![0_i128; prices.len()];
    let mut ask_idx = 0;
    let mut sell_cum: i128 = 0;
    for (i, &p) in prices.iter().enumerate().rev() {
        while ask_idx < asks.len() && asks[ask_idx].0 <= p {
            sell_cum += asks[ask_idx].1;
            ask_idx += 1;
        }
        sell_cums[i] = sell_cum;
    }

    let candidates: Vec<Candidate> = prices
        .iter()
        .enumerate()
        .map(|(i, &price)| Candidate {
            price,
            exec: buy_cums[i].min(sell_cums[i]),
            imbalance: buy_cums[i] - sell_cums[i],
        })
        .filter(|c| c.exec > 0)
        .collect();

    // Rule 1: maximum executable volume.
    let max_exec = candidates.iter().map(|c| c.exec).max()?;
    let ties: Vec<&Candidate> = candidates.iter().filter(|c| c.exec == max_exec).collect();

    // Rule 2: minimum absolute imbalance.
    let min_imb = ties.iter().map(|c| c.imbalance.abs()).min()?;
    let ties: Vec<&Candidate> = ties
        .into_iter()
        .filter(|c| c.imbalance.abs() == min_imb)
        .collect();

    if let [only] = ties.as_slice() {
        return Some(ClearingOutcome {
            price: only.price,
            volume: only.exec,
        });
    }

    // Rule 3: consistent market pressure. After rule 2 every tie has the
    // same |imbalance|, so a uniform sign means a uniform surplus.
    let all_buy = min_imb > 0 && ties.iter().all(|c| c.imbalance > 0);
    let all_sell = min_imb > 0 && ties.iter().all(|c| c.imbalance < 0);
    if all_buy {
        // Ties are in descending price order.
        let chosen = ties.first()?;
        return Some(ClearingOutcome {
            price: chosen.price,
            volume: chosen.exec,
        });
    }
    if all_sell {
        let chosen = ties.last()?;
        return Some(ClearingOutcome {
            price: chosen.price,
            volume: chosen.exec,
        });
    }

    // Rule 4: closest to the reference price, higher on a distance tie.
    let chosen = ties
        .iter()
        .min_by_key(|c| ((c.price - reference_price).abs(), -c.price))?;
    Some(ClearingOutcome {
        price: chosen.price,
        volume: chosen.exec,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(bids: &[(i64, i128)], asks: &[(i64, i128)], r: i64) -> Option<ClearingOutcome> {
        select_clearing_price(bids, asks, r)
    }

    #[test]
    fn empty_sides_do_not_cross() {
        assert!(outcome(&[], &[(100, 5)], 100).is_none());
        assert!(outcome(&[(100, 5)], &[], 100).is_none());
    }

    #[test]
    fn uncrossed_book_has_no_price() {
        assert!(outcome(&[(99, 5)], &[(101, 5)], 100).is_none());
    }

    #[test]
    fn exact_cross_at_single_price() {
        let c = outcome(&[(100, 5)], &[(100, 5)], 90).unwrap();
        assert_eq!(c.price, 100);
        assert_eq!(c.volume, 5);
    }

    #[test]
    fn volume_maximization_wins() {
        // Bids: 102x10, 100x10; asks: 99x15, 101x10.
        // V(102)=V(101)=10, V(100)=V(99)=min(20,15)=15. Ties at {100, 99}
        // carry a uniform buy surplus of 5 → rule 3 picks the higher, 100.
        let c = outcome(&[(102, 10), (100, 10)], &[(99, 15), (101, 10)], 95).unwrap();
        assert_eq!(c.price, 100);
        assert_eq!(c.volume, 15);
    }

    #[test]
    fn buy_surplus_picks_highest_tied_price() {
        // Buy 100 @ 101 vs sell 60 @ 100: V is 60 at both 101 and 100 with a
        // uniform buy surplus of 40, so the pressure rule picks 101.
        let c = outcome(&[(101, 100)], &[(100, 60)], 100).unwrap();
        assert_eq!(c.price, 101);
        assert_eq!(c.volume, 60);
    }

    #[test]
    fn sell_surplus_picks_lowest_tied_price() {
        let c = outcome(&[(101, 60)], &[(100, 100)], 100).unwrap();
        assert_eq!(c.price, 100);
        assert_eq!(c.volume, 60);
    }

    #[test]
    fn mixed_surplus_uses_reference() {
        // Buys 10@100, 10@99; sells 10@99, 10@100.
        // V(100)=min(10,20)=10 imb -10; V(99)=min(20,10)=10 imb +10.
        // Mixed signs → reference decides.
        let bids = [(100, 10), (99, 10)];
        let asks = [(99, 10), (100, 10)];

        let c = outcome(&bids, &asks, 100).unwrap();
        assert_eq!(c.price, 100);

        let c = outcome(&bids, &asks, 99).unwrap();
        assert_eq!(c.price, 99);
    }

    #[test]
    fn reference_distance_tie_picks_higher() {
        // Reference 9950 is equidistant from 9900 and 10000 (scaled units
        // omitted for brevity); the higher price wins.
        let bids = [(10_000, 10), (9_900, 10)];
        let asks = [(9_900, 10), (10_000, 10)];
        let c = outcome(&bids, &asks, 9_950).unwrap();
        assert_eq!(c.price, 10_000);
    }

    #[test]
    fn zero_imbalance_everywhere_uses_reference() {
        // A wide cross: both candidate prices clear fully balanced, so the
        // reference decides.
        let c = outcome(&[(102, 10)], &[(99, 10)], 100).unwrap();
        assert_eq!(c.price, 99);
        assert_eq!(c.volume, 10);

        let c = outcome(&[(102, 10)], &[(99, 10)], 102).unwrap();
        assert_eq!(c.price, 102);
    }

    #[test]
    fn deep_books_accumulate_correctly() {
        let bids = [(100, 10), (99, 10), (98, 10), (97, 10)];
        let asks = [(96, 6), (98, 6), (99, 6), (101, 6)];
        let c = outcome(&bids, &asks, 98).unwrap();
        // V(100)=min(10,18)=10, V(99)=min(20,18)=18, V(98)=min(30,12)=12,
        // V(97)=min(40,6)=6, V(96)=min(40,6)=6. 99 wins outright.
        assert_eq!(c.price, 99);
        assert_eq!(c.volume, 18);
    }

    #[test]
    fn same_inputs_same_outcome() {
        let bids = [(105, 20), (102, 15), (100, 30), (98, 10)];
        let asks = [(97, 25), (100, 20), (103, 15), (106, 10)];
        let a = outcome(&bids, &asks, 101).unwrap();
        let b = outcome(&bids, &asks, 101).unwrap();
        assert_eq!(a, b);
    }
}
