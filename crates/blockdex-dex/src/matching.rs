//! Per-pair matching with ledger settlement.
//!
//! Matching fans out per pair: the auction computation is pure and pairs
//! share no mutable state, so rounds are computed on the fixed worker pool.
//! Settlement (ledger writes, fee accrual, book updates, events) is then
//! merged serially in sorted pair-symbol order, which keeps every output
//! deterministic regardless of worker scheduling.

use std::collections::BTreeMap;

use rayon::prelude::*;

use blockdex_ledger::Ledger;
use blockdex_match::{run_auction, MatchRound};
use blockdex_types::math::big_notional;
use blockdex_types::{
    split_pair_symbol, Address, ChangeKind, Coins, ExchangeError, Order, OrderId, OrderStatus,
    Result, Side, TimeInForce, Trade,
};

use crate::fees::{FeeCoin, TradeFeeSchedule};
use crate::keeper::OrderKeeper;
use crate::pairs::PairRegistry;

/// The outcome of one normal block's matching phase.
#[derive(Debug, Default)]
pub struct MatchOutcome {
    /// Trades across all pairs, in sorted-pair then (price, time) order.
    pub trades: Vec<Trade>,
    /// Per-pair internal failures; the block continues past them.
    pub failures: Vec<(String, ExchangeError)>,
}

/// Run the matching phase of a normal block.
pub fn match_and_allocate(
    keeper: &mut OrderKeeper,
    pairs: &mut PairRegistry,
    ledger: &mut Ledger,
    fees: &dyn TradeFeeSchedule,
    block_fee: &mut Coins,
    pool: Option<&rayon::ThreadPool>,
    height: i64,
    time: i64,
) -> MatchOutcome {
    let inputs: Vec<(String, i64, i64)> = keeper
        .pair_symbols()
        .into_iter()
        .filter_map(|sym| {
            let pair = pairs.get(&sym)?;
            Some((sym, pair.last_price, pair.lot_size))
        })
        .collect();

    // Phase 1: pure per-pair rounds, fanned out on the worker pool.
    let rounds: Vec<Option<MatchRound>> = {
        let books = &keeper.books;
        let compute = |(sym, ref_px, lot): &(String, i64, i64)| {
            books.get(sym).and_then(|book| run_auction(book, *ref_px, *lot))
        };
        match pool {
            Some(p) => p.install(|| inputs.par_iter().map(compute).collect()),
            None => inputs.iter().map(compute).collect(),
        }
    };

    // Phase 2: serialized settlement in sorted pair order.
    let mut outcome = MatchOutcome::default();
    for ((sym, _, _), round) in inputs.iter().zip(rounds) {
        let Some(round) = round else { continue };
        match settle_round(keeper, ledger, fees, block_fee, sym, &round, height, time) {
            Ok(mut trades) => {
                pairs.set_last_price(sym, round.price);
                tracing::info!(
                    pair = %sym,
                    price = round.price,
                    trades = trades.len(),
                    "matched pair"
                );
                outcome.trades.append(&mut trades);
            }
            Err(err) => {
                tracing::error!(pair = %sym, %err, "matching settlement failed");
                outcome.failures.push((sym.clone(), err));
            }
        }
    }

    sweep_ioc(keeper, ledger);
    outcome
}

/// The balance consequences of one fill on one order.
pub(crate) struct FillEffect {
    pub fully: bool,
    /// Amount released from the order's remaining lock.
    pub release: i64,
    /// Amount paid to the counterparty (quote for buys, base for sells).
    pub pay: i64,
    /// Price-improvement refund back to the order's owner (buys only).
    pub refund: i64,
}

/// Apply one fill to an order's own bookkeeping. Shared between live
/// settlement and replay so both evolve orders identically.
pub(crate) fn apply_fill(order: &mut Order, qty: i64, clearing_price: i64) -> FillEffect {
    order.cum_filled += qty;
    let fully = order.leaves() == 0;
    let (release, pay) = match order.side {
        Side::Buy => {
            // The lock reserved notional at the limit price; the fill pays
            // notional at the clearing price. A full fill releases whatever
            // remains so rounding dust never strands in `locked`.
            let reserve = big_notional(qty, order.price);
            let release = if fully {
                order.locked_remaining
            } else {
                order.locked_remaining.min(reserve)
            };
            let pay = big_notional(qty, clearing_price).min(release);
            (release, pay)
        }
        Side::Sell => {
            let release = order.locked_remaining.min(qty);
            (release, release)
        }
    };
    order.locked_remaining -= release;
    order.status = if fully {
        OrderStatus::FullyFill
    } else {
        OrderStatus::PartialFill
    };
    FillEffect {
        fully,
        release,
        pay,
        refund: release - pay,
    }
}

#[allow(clippy::too_many_arguments)]
fn settle_round(
    keeper: &mut OrderKeeper,
    ledger: &mut Ledger,
    fees: &dyn TradeFeeSchedule,
    block_fee: &mut Coins,
    pair_symbol: &str,
    round: &MatchRound,
    height: i64,
    time: i64,
) -> Result<Vec<Trade>> {
    let (base, quote) = split_pair_symbol(pair_symbol)
        .ok_or_else(|| ExchangeError::Internal(format!("bad pair symbol {pair_symbol}")))?;
    let mut trades = Vec::with_capacity(round.trades.len());

    for pairing in &round.trades {
        let qty = pairing.qty;

        let (buyer, buy_effect) = {
            let order = keeper
                .orders
                .get_mut(&pairing.buy_id)
                .ok_or_else(|| missing(&pairing.buy_id))?;
            (order.sender, apply_fill(order, qty, round.price))
        };
        let (seller, sell_effect) = {
            let order = keeper
                .orders
                .get_mut(&pairing.sell_id)
                .ok_or_else(|| missing(&pairing.sell_id))?;
            (order.sender, apply_fill(order, qty, round.price))
        };

        // Quote flows buyer → seller; the buyer's price improvement, if
        // any, returns to their available balance.
        if buy_effect.pay > 0 {
            ledger.settle_locked(&buyer, &seller, quote, buy_effect.pay)?;
        }
        if buy_effect.refund > 0 {
            ledger.move_locked_to_available(&buyer, quote, buy_effect.refund)?;
        }
        // Base flows seller → buyer.
        if sell_effect.pay > 0 {
            ledger.settle_locked(&seller, &buyer, base, sell_effect.pay)?;
        }

        // Fees come out of what each side just received.
        charge_fee(
            keeper,
            ledger,
            block_fee,
            &buyer,
            base,
            quote,
            fees.trade_fee(qty, buy_effect.pay, Side::Buy),
        )?;
        charge_fee(
            keeper,
            ledger,
            block_fee,
            &seller,
            base,
            quote,
            fees.trade_fee(qty, buy_effect.pay, Side::Sell),
        )?;

        {
            let book = keeper
                .books
                .get_mut(pair_symbol)
                .ok_or_else(|| ExchangeError::Internal(format!("no book for {pair_symbol}")))?;
            book.reduce(&pairing.buy_id, qty)?;
            book.reduce(&pairing.sell_id, qty)?;
        }

        for (id, fully) in [
            (&pairing.buy_id, buy_effect.fully),
            (&pairing.sell_id, sell_effect.fully),
        ] {
            let order = keeper
                .orders
                .get(id)
                .cloned()
                .ok_or_else(|| missing(id))?;
            keeper.record_change(
                ChangeKind::Fill {
                    qty,
                    price: round.price,
                },
                &order,
            );
            if fully {
                keeper.orders.remove(id);
                keeper.index.remove(id);
            }
        }

        trades.push(Trade {
            pair: pair_symbol.to_string(),
            price: round.price,
            quantity: qty,
            buy_id: pairing.buy_id.clone(),
            sell_id: pairing.sell_id.clone(),
            buyer,
            seller,
            block_height: height,
            block_time: time,
        });
    }
    Ok(trades)
}

fn charge_fee(
    keeper: &mut OrderKeeper,
    ledger: &mut Ledger,
    block_fee: &mut Coins,
    payer: &Address,
    base: &str,
    quote: &str,
    fee: FeeCoin,
) -> Result<()> {
    let (symbol, amount) = match fee {
        FeeCoin::Base(a) => (base, a),
        FeeCoin::Quote(a) => (quote, a),
    };
    if amount == 0 {
        return Ok(());
    }
    ledger.sub_available(payer, symbol, amount)?;
    keeper.add_round_fee(payer, symbol, amount);
    block_fee.add(symbol, amount);
    Ok(())
}

/// Remove every immediate-or-cancel remainder after the round, releasing
/// its lock with an IOC-no-fill event.
fn sweep_ioc(keeper: &mut OrderKeeper, ledger: &mut Ledger) {
    let mut doomed = Vec::new();
    for sym in keeper.pair_symbols() {
        for (_, part) in keeper.books[&sym].parts_in_book_order() {
            if let Some(order) = keeper.orders.get(&part.id) {
                if order.time_in_force == TimeInForce::ImmediateOrCancel {
                    doomed.push(part.id.clone());
                }
            }
        }
    }
    for id in doomed {
        if let Err(err) = keeper.remove_order(ledger, &id, None, ChangeKind::IocNoFill) {
            tracing::error!(%id, %err, "failed to remove IOC remainder");
        }
    }
}

/// Replay-path matching: evolves books, orders, and last prices exactly as
/// the live path did, without touching the ledger (those effects are
/// already in the committed state).
pub fn replay_match(
    keeper: &mut OrderKeeper,
    last_prices: &mut BTreeMap<String, i64>,
    lot_sizes: &BTreeMap<String, i64>,
) -> Result<()> {
    for sym in keeper.pair_symbols() {
        let Some(&ref_px) = last_prices.get(&sym) else {
            continue;
        };
        let lot = lot_sizes.get(&sym).copied().unwrap_or(1);
        let round = keeper
            .books
            .get(&sym)
            .and_then(|book| run_auction(book, ref_px, lot));
        let Some(round) = round else { continue };

        for pairing in &round.trades {
            for id in [&pairing.buy_id, &pairing.sell_id] {
                let fully = {
                    let order = keeper.orders.get_mut(id).ok_or_else(|| missing(id))?;
                    apply_fill(order, pairing.qty, round.price).fully
                };
                keeper
                    .books
                    .get_mut(&sym)
                    .ok_or_else(|| ExchangeError::Internal(format!("no book for {sym}")))?
                    .reduce(id, pairing.qty)?;
                if fully {
                    keeper.orders.remove(id);
                    keeper.index.remove(id);
                }
            }
        }
        last_prices.insert(sym.clone(), round.price);
    }

    // IOC remainders also vanish on replay, book-only.
    let mut doomed = Vec::new();
    for sym in keeper.pair_symbols() {
        for (_, part) in keeper.books[&sym].parts_in_book_order() {
            if let Some(order) = keeper.orders.get(&part.id) {
                if order.time_in_force == TimeInForce::ImmediateOrCancel {
                    doomed.push(part.id.clone());
                }
            }
        }
    }
    for id in doomed {
        keeper.evict_order(&id)?;
    }
    Ok(())
}

fn missing(id: &OrderId) -> ExchangeError {
    ExchangeError::Internal(format!("fill references unknown order {id}"))
}
