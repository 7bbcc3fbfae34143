//! The publication pipeline.
//!
//! After a block is sealed the state machine assembles one immutable
//! [`BlockInfo`] and enqueues it on a bounded channel; a downstream shipper
//! consumes it and streams back the ids of terminated orders it has
//! published, closing the block with [`PublishAck::Done`]. The enqueue and
//! the ack drain are the only back-pressure points between consensus and
//! the publisher.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use blockdex_ledger::Balances;
use blockdex_types::{
    Address, Coins, OrderChange, OrderId, OrderInfo, PublicationConfig, Trade,
};

/// One side's top-of-book levels as `(price, quantity)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairLevels {
    pub pair: String,
    pub bids: Vec<(i64, i64)>,
    pub asks: Vec<(i64, i64)>,
}

/// A published account's full balance view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalances {
    pub address: Address,
    pub balances: Vec<(String, Balances)>,
}

/// Everything a sealed block publishes, in one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockInfo {
    pub height: i64,
    /// Unix seconds of the block time.
    pub block_time: i64,
    pub trades: Vec<Trade>,
    pub order_changes: Vec<OrderChange>,
    pub order_changes_map: BTreeMap<OrderId, OrderInfo>,
    pub accounts: Vec<AccountBalances>,
    pub price_levels: Vec<PairLevels>,
    pub block_fee: Coins,
    pub round_fees: Vec<(Address, Coins)>,
}

/// Acknowledgements streamed back by the shipper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishAck {
    /// This terminated order has been published and may be dropped from
    /// the publication map.
    Removed(OrderId),
    /// End of acknowledgements for the current block.
    Done,
}

/// The state machine's half of the pipeline.
#[derive(Debug)]
pub struct Publisher {
    to_publish: Sender<BlockInfo>,
    acks: Receiver<PublishAck>,
}

/// The shipper's half, handed to the downstream consumer.
#[derive(Debug)]
pub struct PublisherHandle {
    pub blocks: Receiver<BlockInfo>,
    pub acks: Sender<PublishAck>,
}

/// Create the bounded channel pair.
#[must_use]
pub fn channel(config: &PublicationConfig) -> (Publisher, PublisherHandle) {
    let (block_tx, block_rx) = bounded(config.publish_channel_size.max(1));
    let (ack_tx, ack_rx) = bounded(config.ack_channel_size.max(1));
    (
        Publisher {
            to_publish: block_tx,
            acks: ack_rx,
        },
        PublisherHandle {
            blocks: block_rx,
            acks: ack_tx,
        },
    )
}

impl Publisher {
    /// Enqueue a sealed block. Blocks when the channel is full; the
    /// consensus step completes only once the hand-off happens. Fails only
    /// when the shipper is gone.
    pub fn publish(&self, info: BlockInfo) -> std::result::Result<(), String> {
        let height = info.height;
        self.to_publish
            .send(info)
            .map_err(|_| format!("publisher disconnected at height {height}"))
    }

    /// Drain acknowledgements until `Done`, returning the ids whose
    /// terminated entries may leave the publication map.
    #[must_use]
    pub fn drain_acks(&self) -> Vec<OrderId> {
        let mut removed = Vec::new();
        while let Ok(ack) = self.acks.recv() {
            match ack {
                PublishAck::Removed(id) => removed.push(id),
                PublishAck::Done => break,
            }
        }
        removed
    }
}
