//! The order keeper: every book, the live-order index, the balance-lock
//! discipline, expiry, and the per-block round buffers.
//!
//! Placement and cancellation follow a strict check-then-mutate order, and
//! every ledger call is a single atomic step, so a failed operation leaves
//! no partial state behind.

use std::collections::{BTreeMap, HashMap};

use blockdex_ledger::Ledger;
use blockdex_match::{OrderBook, OrderPart};
use blockdex_types::constants::ORDER_TTL_SECS;
use blockdex_types::math::big_notional_ceil;
use blockdex_types::{
    split_pair_symbol, Address, ChangeKind, Coins, ExchangeError, NewOrderMsg, Order, OrderChange,
    OrderId, OrderInfo, OrderStatus, Result, Side, TimeInForce,
};

use crate::pairs::PairRegistry;

/// Where an order rests: enough to locate its price level in O(1) + O(log P).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLocation {
    pub pair: String,
    pub side: Side,
    pub price: i64,
}

/// Per-pair books plus the order index and round buffers.
#[derive(Debug, Default)]
pub struct OrderKeeper {
    pub(crate) books: HashMap<String, OrderBook>,
    pub(crate) orders: HashMap<OrderId, Order>,
    pub(crate) index: HashMap<OrderId, OrderLocation>,
    /// Append-only event log for the current block.
    pub order_changes: Vec<OrderChange>,
    /// id → latest publication view; terminal entries stay until the
    /// publisher acknowledges them.
    pub order_changes_map: BTreeMap<OrderId, OrderInfo>,
    /// Fee coins accrued this round, keyed by the paying address.
    pub round_fees: BTreeMap<Address, Coins>,
    pub(crate) collect_for_publish: bool,
}

impl OrderKeeper {
    #[must_use]
    pub fn new(collect_for_publish: bool) -> Self {
        Self {
            collect_for_publish,
            ..Self::default()
        }
    }

    pub fn set_collect_for_publish(&mut self, collect: bool) {
        self.collect_for_publish = collect;
    }

    /// Create an empty book when a pair is listed.
    pub fn add_book(&mut self, pair_symbol: &str) {
        self.books.entry(pair_symbol.to_string()).or_default();
    }

    #[must_use]
    pub fn book(&self, pair_symbol: &str) -> Option<&OrderBook> {
        self.books.get(pair_symbol)
    }

    /// Pair symbols with a book, sorted.
    #[must_use]
    pub fn pair_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.books.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    #[must_use]
    pub fn order_exists(&self, id: &OrderId) -> bool {
        self.orders.contains_key(id)
    }

    #[must_use]
    pub fn get_order(&self, id: &OrderId) -> Option<&Order> {
        self.orders.get(id)
    }

    #[must_use]
    pub fn open_order_count(&self) -> usize {
        self.orders.len()
    }

    /// All live orders of one account, sorted by id.
    #[must_use]
    pub fn open_orders(&self, addr: &Address) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .values()
            .filter(|o| o.sender == *addr)
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.id.cmp(&b.id));
        orders
    }

    // =================================================================
    // Placement
    // =================================================================

    /// Validate a new order against the registry, book, and ledger without
    /// mutating anything. Returns the `(symbol, amount)` the order locks.
    pub fn validate_order(
        &self,
        ledger: &Ledger,
        pairs: &PairRegistry,
        msg: &NewOrderMsg,
    ) -> Result<(String, i64)> {
        if self.order_exists(&msg.id) {
            return Err(ExchangeError::DuplicatedOrder(msg.id.clone()));
        }
        let pair = pairs.get_required(&msg.symbol)?;
        if msg.price % pair.tick_size != 0 {
            return Err(ExchangeError::InvalidCoins {
                reason: format!(
                    "price {} is not a multiple of tick size {}",
                    msg.price, pair.tick_size
                ),
            });
        }
        if msg.quantity % pair.lot_size != 0 {
            return Err(ExchangeError::InvalidCoins {
                reason: format!(
                    "quantity {} is not a multiple of lot size {}",
                    msg.quantity, pair.lot_size
                ),
            });
        }

        // The buy lock rounds up so the reservation always covers the
        // worst-case fill at the limit price.
        let (lock_symbol, lock_amount) = match msg.side {
            Side::Buy => (pair.quote.clone(), big_notional_ceil(msg.quantity, msg.price)),
            Side::Sell => (pair.base.clone(), msg.quantity),
        };

        let available = ledger.get(&msg.sender, &lock_symbol).available;
        if available < lock_amount {
            return Err(ExchangeError::InsufficientCoins {
                symbol: lock_symbol,
                needed: lock_amount,
                available,
            });
        }
        Ok((lock_symbol, lock_amount))
    }

    /// Deliver-path placement: lock, insert, emit NEW.
    pub fn add_order(
        &mut self,
        ledger: &mut Ledger,
        pairs: &PairRegistry,
        msg: &NewOrderMsg,
        height: i64,
        time: i64,
    ) -> Result<()> {
        let (lock_symbol, lock_amount) = self.validate_order(ledger, pairs, msg)?;
        ledger.move_available_to_locked(&msg.sender, &lock_symbol, lock_amount)?;

        let order = Order {
            id: msg.id.clone(),
            sender: msg.sender,
            pair: msg.symbol.clone(),
            side: msg.side,
            price: msg.price,
            quantity: msg.quantity,
            cum_filled: 0,
            locked_remaining: lock_amount,
            time_in_force: msg.time_in_force,
            created_height: height,
            created_time: time,
            status: OrderStatus::New,
        };

        if let Err(err) = self.hydrate_order(order.clone()) {
            // Undo the lock: the book rejected what validation admitted.
            ledger.move_locked_to_available(&msg.sender, &lock_symbol, lock_amount)?;
            return Err(ExchangeError::FailInsertOrder {
                reason: err.to_string(),
            });
        }

        tracing::debug!(id = %order.id, pair = %order.pair, side = %order.side, "order accepted");
        self.record_change(ChangeKind::New, &order);
        Ok(())
    }

    /// Insert an order into the book and indexes without ledger effects.
    /// Used by placement (after locking) and by snapshot replay.
    pub fn hydrate_order(&mut self, order: Order) -> Result<()> {
        let book = self
            .books
            .get_mut(&order.pair)
            .ok_or_else(|| ExchangeError::Internal(format!("no book for pair {}", order.pair)))?;
        book.insert(
            order.side,
            order.price,
            OrderPart {
                id: order.id.clone(),
                time: order.created_time,
                leaves: order.leaves(),
            },
        )?;
        self.index.insert(
            order.id.clone(),
            OrderLocation {
                pair: order.pair.clone(),
                side: order.side,
                price: order.price,
            },
        );
        self.orders.insert(order.id.clone(), order);
        Ok(())
    }

    // =================================================================
    // Removal
    // =================================================================

    /// Validate a cancel without mutating: the order must exist and belong
    /// to the caller. Both failures collapse into the same error.
    pub fn validate_cancel(&self, id: &OrderId, caller: &Address) -> Result<()> {
        match self.orders.get(id) {
            Some(order) if order.sender == *caller => Ok(()),
            _ => Err(ExchangeError::FailLocateOrderToCancel(id.clone())),
        }
    }

    /// Remove a live order, release its remaining lock, and emit the
    /// terminal event. `caller` is enforced for cancels; expiry and IOC
    /// removal pass `None`.
    pub fn remove_order(
        &mut self,
        ledger: &mut Ledger,
        id: &OrderId,
        caller: Option<&Address>,
        kind: ChangeKind,
    ) -> Result<Order> {
        let location = self
            .index
            .get(id)
            .cloned()
            .ok_or_else(|| ExchangeError::FailLocateOrderToCancel(id.clone()))?;
        {
            let order = self
                .orders
                .get(id)
                .ok_or_else(|| ExchangeError::FailLocateOrderToCancel(id.clone()))?;
            if let Some(caller) = caller {
                if order.sender != *caller {
                    return Err(ExchangeError::FailLocateOrderToCancel(id.clone()));
                }
            }
        }

        let (base, quote) = split_pair_symbol(&location.pair)
            .ok_or_else(|| ExchangeError::Internal(format!("bad pair symbol {}", location.pair)))?;
        let unlock_symbol = match location.side {
            Side::Buy => quote.to_string(),
            Side::Sell => base.to_string(),
        };

        let book = self
            .books
            .get_mut(&location.pair)
            .ok_or_else(|| ExchangeError::Internal(format!("no book for {}", location.pair)))?;
        book.remove(id)?;

        let mut order = self
            .orders
            .remove(id)
            .ok_or_else(|| ExchangeError::FailLocateOrderToCancel(id.clone()))?;
        self.index.remove(id);

        if order.locked_remaining > 0 {
            ledger.move_locked_to_available(&order.sender, &unlock_symbol, order.locked_remaining)?;
            order.locked_remaining = 0;
        }

        order.status = match kind {
            ChangeKind::Cancel => OrderStatus::Canceled,
            ChangeKind::Expire => OrderStatus::Expired,
            ChangeKind::IocNoFill => OrderStatus::IocNoFill,
            _ => order.status,
        };
        self.record_change(kind, &order);
        Ok(order)
    }

    /// Replay-path removal: book and indexes only, no ledger, no events.
    pub fn evict_order(&mut self, id: &OrderId) -> Result<Order> {
        let location = self
            .index
            .remove(id)
            .ok_or_else(|| ExchangeError::Internal(format!("replayed cancel of unknown {id}")))?;
        self.books
            .get_mut(&location.pair)
            .ok_or_else(|| ExchangeError::Internal(format!("no book for {}", location.pair)))?
            .remove(id)?;
        self.orders
            .remove(id)
            .ok_or_else(|| ExchangeError::Internal(format!("replayed cancel of unknown {id}")))
    }

    // =================================================================
    // Expiry
    // =================================================================

    /// Breathe-block expiry: good-till-expire orders past the TTL and DAY
    /// orders whose UTC day has passed. Unlock semantics match cancel.
    pub fn expire_orders(&mut self, ledger: &mut Ledger, now: i64) -> Vec<OrderId> {
        let mut expired = Vec::new();
        for pair in self.pair_symbols() {
            let book = &self.books[&pair];
            for (_, part) in book.parts_in_book_order() {
                let Some(order) = self.orders.get(&part.id) else {
                    continue;
                };
                let dead = match order.time_in_force {
                    TimeInForce::GoodTillExpire => order.created_time + ORDER_TTL_SECS < now,
                    TimeInForce::Day => utc_day(order.created_time) < utc_day(now),
                    TimeInForce::ImmediateOrCancel => false,
                };
                if dead {
                    expired.push(part.id.clone());
                }
            }
        }

        for id in &expired {
            if let Err(err) = self.remove_order(ledger, id, None, ChangeKind::Expire) {
                tracing::error!(%id, %err, "failed to expire order");
            }
        }
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "expired stale orders");
        }
        expired
    }

    // =================================================================
    // Round buffers
    // =================================================================

    pub(crate) fn record_change(&mut self, kind: ChangeKind, order: &Order) {
        if !self.collect_for_publish {
            return;
        }
        self.order_changes.push(OrderChange {
            id: order.id.clone(),
            kind,
        });
        self.order_changes_map
            .insert(order.id.clone(), OrderInfo::from(order));
    }

    pub(crate) fn add_round_fee(&mut self, payer: &Address, symbol: &str, amount: i64) {
        if !self.collect_for_publish || amount == 0 {
            return;
        }
        self.round_fees.entry(*payer).or_default().add(symbol, amount);
    }

    /// Drop the acknowledged terminated order from the publication map.
    pub fn remove_published(&mut self, id: &OrderId) {
        self.order_changes_map.remove(id);
    }

    /// Clear `order_changes` and `round_fees` after publication.
    pub fn clear_round_buffers(&mut self) {
        self.order_changes.clear();
        self.round_fees.clear();
    }

    /// The top `k` levels of every book, sorted by pair symbol.
    #[must_use]
    pub fn top_levels(&self, k: usize) -> Vec<(String, Vec<(i64, i64)>, Vec<(i64, i64)>)> {
        self.pair_symbols()
            .into_iter()
            .map(|pair| {
                let (bids, asks) = self.books[&pair].top_levels(k);
                (pair, bids, asks)
            })
            .collect()
    }
}

/// Days since the UNIX epoch in UTC.
pub(crate) fn utc_day(unix_secs: i64) -> i64 {
    unix_secs.div_euclid(86_400)
}
