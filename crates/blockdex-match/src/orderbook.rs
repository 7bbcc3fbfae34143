//! The order book for a single trading pair.
//!
//! Uses `BTreeMap` for price-level ordering:
//! - **Bids**: `BTreeMap<Reverse<i64>, PriceLevel>` -- highest price first
//! - **Asks**: `BTreeMap<i64, PriceLevel>` -- lowest price first
//!
//! An auxiliary `HashMap<OrderId, (Side, i64)>` locates a part's level
//! directly, so removal is O(log P + k) without scanning other levels.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use blockdex_types::{ExchangeError, OrderId, Result, Side};

use crate::price_level::{OrderPart, PriceLevel};

/// The two half books of one pair.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    bids: BTreeMap<Reverse<i64>, PriceLevel>,
    asks: BTreeMap<i64, PriceLevel>,
    index: HashMap<OrderId, (Side, i64)>,
}

impl OrderBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =================================================================
    // Mutation
    // =================================================================

    /// Insert a part at its price. The caller has already validated price
    /// and quantity alignment.
    pub fn insert(&mut self, side: Side, price: i64, part: OrderPart) -> Result<()> {
        if self.index.contains_key(&part.id) {
            return Err(ExchangeError::DuplicatedOrder(part.id));
        }
        self.index.insert(part.id.clone(), (side, price));
        match side {
            Side::Buy => self
                .bids
                .entry(Reverse(price))
                .or_insert_with(|| PriceLevel::new(price))
                .push_back(part),
            Side::Sell => self
                .asks
                .entry(price)
                .or_insert_with(|| PriceLevel::new(price))
                .push_back(part),
        }
        Ok(())
    }

    /// Remove a part by id. Empty levels are dropped.
    pub fn remove(&mut self, id: &OrderId) -> Result<OrderPart> {
        let (side, price) = self
            .index
            .remove(id)
            .ok_or_else(|| ExchangeError::FailLocateOrderToCancel(id.clone()))?;
        let part = match side {
            Side::Buy => {
                let level = self
                    .bids
                    .get_mut(&Reverse(price))
                    .ok_or_else(|| ExchangeError::FailLocateOrderToCancel(id.clone()))?;
                let part = level
                    .remove(id)
                    .ok_or_else(|| ExchangeError::FailLocateOrderToCancel(id.clone()))?;
                if level.is_empty() {
                    self.bids.remove(&Reverse(price));
                }
                part
            }
            Side::Sell => {
                let level = self
                    .asks
                    .get_mut(&price)
                    .ok_or_else(|| ExchangeError::FailLocateOrderToCancel(id.clone()))?;
                let part = level
                    .remove(id)
                    .ok_or_else(|| ExchangeError::FailLocateOrderToCancel(id.clone()))?;
                if level.is_empty() {
                    self.asks.remove(&price);
                }
                part
            }
        };
        Ok(part)
    }

    /// Reduce a part's leaves by `qty` after a fill; removes the part (and
    /// its level, if emptied) when the leaves reach zero. Returns the
    /// remaining leaves.
    pub fn reduce(&mut self, id: &OrderId, qty: i64) -> Result<i64> {
        let (side, price) = self
            .index
            .get(id)
            .copied()
            .ok_or_else(|| ExchangeError::Internal(format!("fill for unknown order {id}")))?;
        let level = match side {
            Side::Buy => self.bids.get_mut(&Reverse(price)),
            Side::Sell => self.asks.get_mut(&price),
        }
        .ok_or_else(|| ExchangeError::Internal(format!("missing level for {id}")))?;
        let part = level
            .parts
            .iter_mut()
            .find(|p| p.id == *id)
            .ok_or_else(|| ExchangeError::Internal(format!("missing part for {id}")))?;
        if part.leaves < qty {
            return Err(ExchangeError::Internal(format!(
                "overfill on {id}: leaves {} < qty {qty}",
                part.leaves
            )));
        }
        part.leaves -= qty;
        let remaining = part.leaves;
        if remaining == 0 {
            self.remove(id)?;
        }
        Ok(remaining)
    }

    // =================================================================
    // Queries
    // =================================================================

    #[must_use]
    pub fn contains(&self, id: &OrderId) -> bool {
        self.index.contains_key(id)
    }

    #[must_use]
    pub fn location(&self, id: &OrderId) -> Option<(Side, i64)> {
        self.index.get(id).copied()
    }

    #[must_use]
    pub fn best_bid(&self) -> Option<i64> {
        self.bids.keys().next().map(|r| r.0)
    }

    #[must_use]
    pub fn best_ask(&self) -> Option<i64> {
        self.asks.keys().next().copied()
    }

    /// A crossed book triggers an auction round.
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        matches!((self.best_bid(), self.best_ask()), (Some(b), Some(a)) if b >= a)
    }

    #[must_use]
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Bid levels, best (highest) first.
    pub fn bid_levels(&self) -> impl Iterator<Item = &PriceLevel> {
        self.bids.values()
    }

    /// Ask levels, best (lowest) first.
    pub fn ask_levels(&self) -> impl Iterator<Item = &PriceLevel> {
        self.asks.values()
    }

    /// `(price, total leaves)` per level, best first, for clearing.
    #[must_use]
    pub fn side_summary(&self, side: Side) -> Vec<(i64, i128)> {
        match side {
            Side::Buy => self
                .bids
                .values()
                .map(|l| (l.price, l.total_leaves()))
                .collect(),
            Side::Sell => self
                .asks
                .values()
                .map(|l| (l.price, l.total_leaves()))
                .collect(),
        }
    }

    /// Total leaves at `px` or better on `side`.
    #[must_use]
    pub fn aggregate_at_or_better(&self, side: Side, px: i64) -> i128 {
        match side {
            Side::Buy => self
                .bids
                .values()
                .take_while(|l| l.price >= px)
                .map(PriceLevel::total_leaves)
                .sum(),
            Side::Sell => self
                .asks
                .values()
                .take_while(|l| l.price <= px)
                .map(PriceLevel::total_leaves)
                .sum(),
        }
    }

    /// The top `k` levels per side as `(price, quantity)`, for publication.
    /// Quantities saturate at `i64::MAX`.
    #[must_use]
    pub fn top_levels(&self, k: usize) -> (Vec<(i64, i64)>, Vec<(i64, i64)>) {
        let clamp = |v: i128| i64::try_from(v).unwrap_or(i64::MAX);
        let bids = self
            .bids
            .values()
            .take(k)
            .map(|l| (l.price, clamp(l.total_leaves())))
            .collect();
        let asks = self
            .asks
            .values()
            .take(k)
            .map(|l| (l.price, clamp(l.total_leaves())))
            .collect();
        (bids, asks)
    }

    /// All parts in deterministic book order (bids best-first then asks
    /// best-first, FIFO within levels), for snapshots.
    pub fn parts_in_book_order(&self) -> impl Iterator<Item = (Side, &OrderPart)> {
        let bids = self
            .bids
            .values()
            .flat_map(|l| l.parts.iter().map(|p| (Side::Buy, p)));
        let asks = self
            .asks
            .values()
            .flat_map(|l| l.parts.iter().map(|p| (Side::Sell, p)));
        bids.chain(asks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockdex_types::Address;

    fn id(n: u8, seq: u64) -> OrderId {
        OrderId::new(Address([n; 20]), seq)
    }

    fn part(n: u8, seq: u64, leaves: i64) -> OrderPart {
        OrderPart {
            id: id(n, seq),
            time: 1_000,
            leaves,
        }
    }

    #[test]
    fn insert_and_best_prices() {
        let mut book = OrderBook::new();
        book.insert(Side::Buy, 100, part(1, 0, 10)).unwrap();
        book.insert(Side::Buy, 99, part(1, 1, 10)).unwrap();
        book.insert(Side::Sell, 101, part(2, 0, 10)).unwrap();
        book.insert(Side::Sell, 102, part(2, 1, 10)).unwrap();

        assert_eq!(book.best_bid(), Some(100));
        assert_eq!(book.best_ask(), Some(101));
        assert!(!book.is_crossed());
        assert_eq!(book.order_count(), 4);
    }

    #[test]
    fn duplicate_insert_rejected() {
        let mut book = OrderBook::new();
        book.insert(Side::Buy, 100, part(1, 0, 10)).unwrap();
        let err = book.insert(Side::Buy, 100, part(1, 0, 10)).unwrap_err();
        assert!(matches!(err, ExchangeError::DuplicatedOrder(_)));
    }

    #[test]
    fn remove_drops_empty_level() {
        let mut book = OrderBook::new();
        book.insert(Side::Buy, 100, part(1, 0, 10)).unwrap();
        let removed = book.remove(&id(1, 0)).unwrap();
        assert_eq!(removed.leaves, 10);
        assert!(book.is_empty());
        assert_eq!(book.best_bid(), None);
    }

    #[test]
    fn remove_missing_fails() {
        let mut book = OrderBook::new();
        let err = book.remove(&id(1, 0)).unwrap_err();
        assert!(matches!(err, ExchangeError::FailLocateOrderToCancel(_)));
    }

    #[test]
    fn reduce_removes_exhausted_part() {
        let mut book = OrderBook::new();
        book.insert(Side::Sell, 101, part(2, 0, 10)).unwrap();
        assert_eq!(book.reduce(&id(2, 0), 4).unwrap(), 6);
        assert!(book.contains(&id(2, 0)));
        assert_eq!(book.reduce(&id(2, 0), 6).unwrap(), 0);
        assert!(!book.contains(&id(2, 0)));
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn reduce_overfill_is_internal_error() {
        let mut book = OrderBook::new();
        book.insert(Side::Sell, 101, part(2, 0, 10)).unwrap();
        let err = book.reduce(&id(2, 0), 11).unwrap_err();
        assert!(matches!(err, ExchangeError::Internal(_)));
    }

    #[test]
    fn crossed_detection() {
        let mut book = OrderBook::new();
        book.insert(Side::Buy, 101, part(1, 0, 10)).unwrap();
        book.insert(Side::Sell, 100, part(2, 0, 10)).unwrap();
        assert!(book.is_crossed());
    }

    #[test]
    fn summaries_are_best_first() {
        let mut book = OrderBook::new();
        book.insert(Side::Buy, 90, part(1, 0, 1)).unwrap();
        book.insert(Side::Buy, 100, part(1, 1, 2)).unwrap();
        book.insert(Side::Sell, 110, part(2, 0, 3)).unwrap();
        book.insert(Side::Sell, 105, part(2, 1, 4)).unwrap();

        assert_eq!(book.side_summary(Side::Buy), vec![(100, 2), (90, 1)]);
        assert_eq!(book.side_summary(Side::Sell), vec![(105, 4), (110, 3)]);
    }

    #[test]
    fn aggregate_at_or_better() {
        let mut book = OrderBook::new();
        book.insert(Side::Buy, 100, part(1, 0, 5)).unwrap();
        book.insert(Side::Buy, 98, part(1, 1, 5)).unwrap();
        book.insert(Side::Sell, 101, part(2, 0, 7)).unwrap();
        book.insert(Side::Sell, 103, part(2, 1, 7)).unwrap();

        assert_eq!(book.aggregate_at_or_better(Side::Buy, 99), 5);
        assert_eq!(book.aggregate_at_or_better(Side::Buy, 98), 10);
        assert_eq!(book.aggregate_at_or_better(Side::Sell, 101), 7);
        assert_eq!(book.aggregate_at_or_better(Side::Sell, 200), 14);
    }

    #[test]
    fn top_levels_truncates() {
        let mut book = OrderBook::new();
        for (i, px) in [100, 99, 98, 97].iter().enumerate() {
            book.insert(Side::Buy, *px, part(1, i as u64, 1)).unwrap();
        }
        let (bids, asks) = book.top_levels(2);
        assert_eq!(bids, vec![(100, 1), (99, 1)]);
        assert!(asks.is_empty());
    }

    #[test]
    fn book_order_iteration_is_deterministic() {
        let mut book = OrderBook::new();
        book.insert(Side::Sell, 105, part(2, 0, 1)).unwrap();
        book.insert(Side::Buy, 100, part(1, 0, 1)).unwrap();
        book.insert(Side::Buy, 100, part(1, 1, 1)).unwrap();
        book.insert(Side::Buy, 99, part(1, 2, 1)).unwrap();

        let order: Vec<(Side, OrderId)> = book
            .parts_in_book_order()
            .map(|(s, p)| (s, p.id.clone()))
            .collect();
        assert_eq!(
            order,
            vec![
                (Side::Buy, id(1, 0)),
                (Side::Buy, id(1, 1)),
                (Side::Buy, id(1, 2)),
                (Side::Sell, id(2, 0)),
            ]
        );
    }
}
