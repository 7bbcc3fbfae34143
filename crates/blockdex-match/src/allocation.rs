//! Fill allocation at the clearing price.
//!
//! The side with less eligible volume fills fully. The surplus side fills
//! in strict price-time priority: every level better than the marginal one
//! fills fully, and the marginal level is pro-rated: allocations
//! proportional to leaves, rounded down to the lot size, with the leftover
//! granted to the earliest order at the level (cascading in time order when
//! the earliest cannot absorb it).

use blockdex_types::{OrderId, Side};

use crate::clearing::select_clearing_price;
use crate::orderbook::OrderBook;
use crate::price_level::PriceLevel;

/// One order's executed quantity in a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fill {
    pub id: OrderId,
    pub qty: i64,
}

/// A buy fill paired against a sell fill; becomes a trade at the clearing
/// price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradePairing {
    pub buy_id: OrderId,
    pub sell_id: OrderId,
    pub qty: i64,
}

/// The full outcome of one auction round for one pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRound {
    pub price: i64,
    pub volume: i128,
    /// Buy-side fills in price-time priority order.
    pub buy_fills: Vec<Fill>,
    /// Sell-side fills in price-time priority order.
    pub sell_fills: Vec<Fill>,
    /// Pairings in (price, time) report order.
    pub trades: Vec<TradePairing>,
}

/// Run one auction round over a book. Pure: the book is not modified.
///
/// Returns `None` when the book is not crossed.
#[must_use]
pub fn run_auction(book: &OrderBook, reference_price: i64, lot_size: i64) -> Option<MatchRound> {
    let bids = book.side_summary(Side::Buy);
    let asks = book.side_summary(Side::Sell);
    let clearing = select_clearing_price(&bids, &asks, reference_price)?;

    let buy_levels: Vec<&PriceLevel> = book
        .bid_levels()
        .take_while(|l| l.price >= clearing.price)
        .collect();
    let sell_levels: Vec<&PriceLevel> = book
        .ask_levels()
        .take_while(|l| l.price <= clearing.price)
        .collect();

    let buy_fills = allocate_side(&buy_levels, clearing.volume, lot_size);
    let sell_fills = allocate_side(&sell_levels, clearing.volume, lot_size);
    let trades = pair_fills(&buy_fills, &sell_fills);

    tracing::debug!(
        price = clearing.price,
        volume = clearing.volume as i64,
        trades = trades.len(),
        "auction round complete"
    );

    Some(MatchRound {
        price: clearing.price,
        volume: clearing.volume,
        buy_fills,
        sell_fills,
        trades,
    })
}

/// Allocate `volume` across eligible levels, best level first.
fn allocate_side(levels: &[&PriceLevel], volume: i128, lot_size: i64) -> Vec<Fill> {
    let mut fills = Vec::new();
    let mut remaining = volume;

    for level in levels {
        if remaining == 0 {
            break;
        }
        let level_total = level.total_leaves();
        if level_total == 0 {
            continue;
        }

        if level_total <= remaining {
            // Whole level fills, FIFO.
            for part in &level.parts {
                if part.leaves > 0 {
                    fills.push(Fill {
                        id: part.id.clone(),
                        qty: part.leaves,
                    });
                }
            }
            remaining -= level_total;
        } else {
            // Marginal level: pro-rata by leaves, lot-aligned.
            let lot = i128::from(lot_size.max(1));
            let mut allocs: Vec<i128> = level
                .parts
                .iter()
                .map(|part| {
                    let raw = remaining * i128::from(part.leaves) / level_total;
                    raw - raw % lot
                })
                .collect();

            let mut leftover = remaining - allocs.iter().sum::<i128>();
            for (i, part) in level.parts.iter().enumerate() {
                if leftover == 0 {
                    break;
                }
                let cap = i128::from(part.leaves) - allocs[i];
                let take = leftover.min(cap);
                allocs[i] += take;
                leftover -= take;
            }

            for (part, alloc) in level.parts.iter().zip(allocs) {
                if alloc > 0 {
                    fills.push(Fill {
                        id: part.id.clone(),
                        // An allocation never exceeds the part's i64 leaves.
                        qty: alloc as i64,
                    });
                }
            }
            remaining = 0;
        }
    }
    fills
}

/// Pair buy fills against sell fills. Both sides sum to the round volume,
/// so the walk consumes both exactly.
fn pair_fills(buys: &[Fill], sells: &[Fill]) -> Vec<TradePairing> {
    let mut trades = Vec::new();
    let mut bi = 0;
    let mut si = 0;
    let mut buy_rem = buys.first().map_or(0, |f| f.qty);
    let mut sell_rem = sells.first().map_or(0, |f| f.qty);

    while bi < buys.len() && si < sells.len() {
        let qty = buy_rem.min(sell_rem);
        if qty > 0 {
            trades.push(TradePairing {
                buy_id: buys[bi].id.clone(),
                sell_id: sells[si].id.clone(),
                qty,
            });
        }
        buy_rem -= qty;
        sell_rem -= qty;
        if buy_rem == 0 {
            bi += 1;
            if bi < buys.len() {
                buy_rem = buys[bi].qty;
            }
        }
        if sell_rem == 0 {
            si += 1;
            if si < sells.len() {
                sell_rem = sells[si].qty;
            }
        }
    }
    trades
}
