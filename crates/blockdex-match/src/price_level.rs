//! A single price level in the order book.
//!
//! Parts at the same price are stored in arrival order using a [`VecDeque`];
//! the front of the queue has the highest time priority.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use blockdex_types::OrderId;

/// The residual portion of an order resident at a price level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPart {
    pub id: OrderId,
    /// Unix seconds of the creating block, for priority reporting.
    pub time: i64,
    /// Remaining unfilled quantity.
    pub leaves: i64,
}

/// All parts resting at one price, FIFO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: i64,
    pub parts: VecDeque<OrderPart>,
}

impl PriceLevel {
    #[must_use]
    pub fn new(price: i64) -> Self {
        Self {
            price,
            parts: VecDeque::new(),
        }
    }

    /// Append a part at the back (lowest time priority).
    pub fn push_back(&mut self, part: OrderPart) {
        self.parts.push_back(part);
    }

    /// Remove a specific part by id, preserving the order of the rest.
    pub fn remove(&mut self, id: &OrderId) -> Option<OrderPart> {
        let pos = self.parts.iter().position(|p| p.id == *id)?;
        self.parts.remove(pos)
    }

    /// Total leaves across the level. Widened so huge books cannot overflow.
    #[must_use]
    pub fn total_leaves(&self) -> i128 {
        self.parts.iter().map(|p| i128::from(p.leaves)).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }
}
