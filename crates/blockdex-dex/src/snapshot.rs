//! Order-book snapshots.
//!
//! At every breathe block the keeper serializes each book under a
//! height-keyed prefix in the `orderbooks` store subsystem, together with a
//! manifest of pair parameters. On startup the newest snapshot at or below
//! the last committed height is loaded and the order-flow of the blocks
//! after it is replayed on top.

use serde::{Deserialize, Serialize};

use blockdex_types::{ExchangeError, KvStore, Order, Result, TradingPair};

use crate::keeper::OrderKeeper;
use crate::pairs::PairRegistry;

/// Per-pair parameters frozen into a snapshot. Replay seeds its reference
/// prices and lot sizes from these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairMeta {
    pub symbol: String,
    pub last_price: i64,
    pub tick_size: i64,
    pub lot_size: i64,
}

/// The snapshot manifest written alongside the per-pair books.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub height: i64,
    pub pairs: Vec<PairMeta>,
}

/// One pair's book: full live orders in deterministic book order (bids
/// best-first then asks best-first, FIFO within a level), so rebuilding by
/// insertion reproduces the exact queue positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub pair: String,
    pub orders: Vec<Order>,
}

fn manifest_key(height: i64) -> Vec<u8> {
    format!("manifest/{height:020}").into_bytes()
}

fn book_key(height: i64, pair: &str) -> Vec<u8> {
    format!("snap/{height:020}/{pair}").into_bytes()
}

/// Serialize every book under the height-keyed prefix.
pub fn snapshot_books(
    store: &mut dyn KvStore,
    keeper: &OrderKeeper,
    pairs: &PairRegistry,
    height: i64,
) -> Result<()> {
    for symbol in keeper.pair_symbols() {
        let book = keeper
            .book(&symbol)
            .ok_or_else(|| ExchangeError::Internal(format!("no book for {symbol}")))?;
        let orders: Vec<Order> = book
            .parts_in_book_order()
            .filter_map(|(_, part)| keeper.get_order(&part.id).cloned())
            .collect();
        let snap = BookSnapshot {
            pair: symbol.clone(),
            orders,
        };
        store.set(&book_key(height, &symbol), encode(&snap)?);
    }

    let manifest = SnapshotManifest {
        height,
        pairs: pairs
            .all()
            .map(|p: &TradingPair| PairMeta {
                symbol: p.symbol(),
                last_price: p.last_price,
                tick_size: p.tick_size,
                lot_size: p.lot_size,
            })
            .collect(),
    };
    store.set(&manifest_key(height), encode(&manifest)?);
    tracing::info!(height, "order book snapshot saved");
    Ok(())
}

/// The newest snapshot height at or below `max_height`, if any.
#[must_use]
pub fn latest_snapshot_height(store: &dyn KvStore, max_height: i64) -> Option<i64> {
    store
        .prefix_scan(b"manifest/")
        .into_iter()
        .filter_map(|(key, _)| {
            let key = String::from_utf8(key).ok()?;
            key.strip_prefix("manifest/")?.parse::<i64>().ok()
        })
        .filter(|h| *h <= max_height)
        .max()
}

/// Load a snapshot into an empty keeper. Returns the manifest so the caller
/// can seed replay state.
pub fn load_snapshot(
    store: &dyn KvStore,
    keeper: &mut OrderKeeper,
    height: i64,
) -> Result<SnapshotManifest> {
    let raw = store.get(&manifest_key(height)).ok_or_else(|| {
        ExchangeError::Internal(format!("no order book snapshot at height {height}"))
    })?;
    let manifest: SnapshotManifest = decode(&raw)?;

    for meta in &manifest.pairs {
        keeper.add_book(&meta.symbol);
        let Some(raw) = store.get(&book_key(height, &meta.symbol)) else {
            continue;
        };
        let snap: BookSnapshot = decode(&raw)?;
        for order in snap.orders {
            keeper.hydrate_order(order)?;
        }
    }
    tracing::info!(height, "order book snapshot loaded");
    Ok(manifest)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| ExchangeError::Internal(format!("snapshot serialization: {e}")))
}

fn decode<'a, T: Deserialize<'a>>(raw: &'a [u8]) -> Result<T> {
    serde_json::from_slice(raw)
        .map_err(|e| ExchangeError::Internal(format!("snapshot deserialization: {e}")))
}
