//! # blockdex-app
//!
//! The exchange application state machine.
//!
//! A consensus driver feeds blocks through the [`Application`] interface:
//! `init_chain → (begin_block → deliver_tx* → end_block → commit)*`, with
//! `check_tx` running against the last committed state for mempool
//! admission. EndBlock separates **normal blocks** (per-pair auction
//! matching) from **breathe blocks** (tick/lot recalibration, order expiry,
//! book snapshots, daily events), then distributes the block fee and hands
//! one immutable [`publisher::BlockInfo`] to the publication pipeline.
//!
//! The state machine is single-threaded; the only parallelism is the
//! per-pair match fan-out and the breathe-block daily events, both of which
//! complete before EndBlock returns.

pub mod fee_pool;
pub mod genesis;
pub mod publisher;
pub mod query;
pub mod store;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use blockdex_dex::snapshot::{latest_snapshot_height, load_snapshot, snapshot_books};
use blockdex_dex::{
    handle_dex_msg, match_and_allocate, replay_match, OrderKeeper, PairRegistry,
    StandardFeeSchedule, TradeFeeSchedule,
};
use blockdex_ledger::Ledger;
use blockdex_tokens::{handle_token_msg, TokenRegistry};
use blockdex_types::constants::{BREATHE_BLOCK_INTERVAL, MAX_ORDER_BOOK_LEVEL, NATIVE_SYMBOL};
use blockdex_types::math::big_notional_ceil;
use blockdex_types::{
    Address, BaseConfig, Coins, EndBlockResult, ExchangeError, ExecMode, FeeParams, KvStore, Msg,
    Order, OrderStatus, PublicationConfig, Result, Side, Tag, Trade, Tx, TxContext, TxResult,
};

use fee_pool::{distribute_block_fee, FeePool};
use genesis::Genesis;
use publisher::{AccountBalances, BlockInfo, PairLevels, Publisher};
use store::MultiStore;

/// The header the consensus driver presents for each block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub height: i64,
    pub time: DateTime<Utc>,
}

/// A long-running task scheduled at breathe blocks. Runs concurrently with
/// order-book housekeeping; EndBlock joins it before returning.
pub trait DailyEvent: Send + Sync {
    fn run(&self, height: i64, block_time: DateTime<Utc>);
}

/// The inbound consensus-driver interface.
pub trait Application {
    fn init_chain(&mut self, genesis: &Genesis) -> Result<()>;
    fn begin_block(&mut self, header: BlockHeader);
    fn check_tx(&mut self, tx: &Tx) -> TxResult;
    fn deliver_tx(&mut self, tx: &Tx) -> TxResult;
    fn end_block(&mut self, height: i64) -> EndBlockResult;
    fn commit(&mut self) -> Result<(i64, [u8; 32])>;
    fn query(&self, path: &str) -> Result<Vec<u8>>;
}

/// The disjoint context check-mode execution runs against: a clone of the
/// last committed state. Deliver-mode state is never visible here.
#[derive(Debug, Default)]
struct CheckState {
    ledger: Ledger,
    tokens: TokenRegistry,
    pairs: PairRegistry,
}

/// The exchange application.
pub struct ExchangeApp {
    publication: PublicationConfig,
    store: MultiStore,
    ledger: Ledger,
    pub(crate) tokens: TokenRegistry,
    pub(crate) pairs: PairRegistry,
    pub(crate) keeper: OrderKeeper,
    fee_params: FeeParams,
    fee_pool: FeePool,
    trade_fees: Box<dyn TradeFeeSchedule>,
    /// Validator operator accounts, sorted by address.
    validators: Vec<Address>,
    match_pool: Option<rayon::ThreadPool>,
    daily_events: Vec<Box<dyn DailyEvent>>,
    publisher: Option<Publisher>,
    check_state: CheckState,
    header: Option<BlockHeader>,
    prev_block_time: DateTime<Utc>,
    last_height: i64,
    last_app_hash: [u8; 32],
    /// Order-flow transactions of the current block, recorded for replay.
    block_txs: Vec<Tx>,
    /// Accounts touched by successful transactions this block.
    touched: BTreeSet<Address>,
}

impl ExchangeApp {
    /// Build an empty application. State arrives via [`Self::init_chain`]
    /// or [`Self::from_store`].
    pub fn new(
        base: BaseConfig,
        publication: PublicationConfig,
        publisher: Option<Publisher>,
    ) -> Result<Self> {
        let match_pool = build_match_pool(base.matching_concurrency)?;
        Ok(Self {
            keeper: OrderKeeper::new(publication.enabled),
            publication,
            store: MultiStore::new(),
            ledger: Ledger::new(),
            tokens: TokenRegistry::new(),
            pairs: PairRegistry::new(),
            fee_params: FeeParams::default(),
            fee_pool: FeePool::new(),
            trade_fees: Box::new(StandardFeeSchedule { rate_bps: 0 }),
            validators: Vec::new(),
            match_pool,
            daily_events: Vec::new(),
            publisher,
            check_state: CheckState::default(),
            header: None,
            prev_block_time: DateTime::<Utc>::UNIX_EPOCH,
            last_height: 0,
            last_app_hash: [0; 32],
            block_txs: Vec::new(),
            touched: BTreeSet::new(),
        })
    }

    /// Restart path: load committed state from the store, then rebuild the
    /// order books from the newest snapshot plus the recorded order flow.
    /// Replay divergence is fatal.
    pub fn from_store(
        store: MultiStore,
        base: BaseConfig,
        publication: PublicationConfig,
        publisher: Option<Publisher>,
    ) -> Result<Self> {
        let height: i64 = read_json(&store.main, b"height")?;
        let last_time: i64 = read_json(&store.main, b"last_block_time")?;
        let validators: Vec<Address> = read_json(&store.main, b"validators")?;
        let ledger = Ledger::from_export(read_json(&store.accounts, b"ledger")?);
        let tokens = TokenRegistry::from_tokens(read_json(&store.tokens, b"registry")?);
        let pairs = PairRegistry::from_pairs(read_json(&store.pairs, b"registry")?);
        let fee_params: FeeParams = read_json(&store.params, b"fees")?;

        let mut keeper = OrderKeeper::new(false);
        let mut last_prices: BTreeMap<String, i64> = BTreeMap::new();
        let snapshot_height = latest_snapshot_height(&store.orderbooks, height);
        match snapshot_height {
            Some(h) => {
                let manifest = load_snapshot(&store.orderbooks, &mut keeper, h)?;
                for meta in manifest.pairs {
                    last_prices.insert(meta.symbol, meta.last_price);
                }
            }
            None => {
                for pair in pairs.all() {
                    keeper.add_book(&pair.symbol());
                    last_prices.insert(pair.symbol(), pair.list_price);
                }
            }
        }

        let lots: BTreeMap<String, i64> =
            pairs.all().map(|p| (p.symbol(), p.lot_size)).collect();
        let from = snapshot_height.map_or(0, |h| h + 1);
        for h in from..=height {
            replay_block(&store, &mut keeper, &mut last_prices, &lots, h)?;
        }

        for pair in pairs.all() {
            let symbol = pair.symbol();
            if last_prices.get(&symbol) != Some(&pair.last_price) {
                return Err(ExchangeError::Internal(format!(
                    "snapshot replay divergence on {symbol}: replayed {:?}, committed {}",
                    last_prices.get(&symbol),
                    pair.last_price
                )));
            }
        }
        keeper.set_collect_for_publish(publication.enabled);
        tracing::info!(height, open_orders = keeper.open_order_count(), "order books hydrated");

        let match_pool = build_match_pool(base.matching_concurrency)?;
        let trade_fees: Box<dyn TradeFeeSchedule> = Box::new(StandardFeeSchedule {
            rate_bps: fee_params.trade_fee_bps,
        });
        let check_state = CheckState {
            ledger: ledger.clone(),
            tokens: tokens.clone(),
            pairs: pairs.clone(),
        };
        let last_app_hash = store.app_hash();
        Ok(Self {
            publication,
            store,
            ledger,
            tokens,
            pairs,
            keeper,
            fee_params,
            fee_pool: FeePool::new(),
            trade_fees,
            validators,
            match_pool,
            daily_events: Vec::new(),
            publisher,
            check_state,
            header: None,
            prev_block_time: timestamp_to_datetime(last_time),
            last_height: height,
            last_app_hash,
            block_txs: Vec::new(),
            touched: BTreeSet::new(),
        })
    }

    /// Register a breathe-block daily event.
    pub fn register_daily_event(&mut self, event: Box<dyn DailyEvent>) {
        self.daily_events.push(event);
    }

    /// Replace the injected trade-fee schedule.
    pub fn set_trade_fee_schedule(&mut self, schedule: Box<dyn TradeFeeSchedule>) {
        self.trade_fees = schedule;
    }

    #[must_use]
    pub fn last_height(&self) -> i64 {
        self.last_height
    }

    #[must_use]
    pub fn last_app_hash(&self) -> [u8; 32] {
        self.last_app_hash
    }

    /// The committed multi-store.
    #[must_use]
    pub fn store(&self) -> &MultiStore {
        &self.store
    }

    /// Hand the store over, e.g. to simulate a node restart.
    #[must_use]
    pub fn into_store(self) -> MultiStore {
        self.store
    }

    /// Ledger-wide total of a symbol, for conservation checks.
    #[must_use]
    pub fn total_of(&self, symbol: &str) -> i128 {
        self.ledger.total_of(symbol)
    }

    #[must_use]
    pub fn balance_of(&self, addr: &Address, symbol: &str) -> blockdex_ledger::Balances {
        self.ledger.get(addr, symbol)
    }

    // =================================================================
    // Lifecycle
    // =================================================================

    /// Initialize from the genesis document. Every failure here is fatal.
    pub fn init_chain(&mut self, genesis: &Genesis) -> Result<()> {
        for token in &genesis.tokens {
            self.tokens.insert(token.clone())?;
        }

        let mut validators = Vec::new();
        for account in &genesis.accounts {
            for coin in &account.coins {
                self.tokens.get(&coin.symbol)?;
                self.ledger
                    .add_available(&account.address, &coin.symbol, coin.amount)?;
            }
            if let Some(val_addr) = account.val_addr {
                validators.push(val_addr);
            }
        }
        validators.sort();
        validators.dedup();
        self.validators = validators;

        // Genesis distributes every token's full supply, nothing more and
        // nothing less; conservation holds from height zero.
        for token in self.tokens.all() {
            let circulating = self.ledger.total_of(&token.symbol);
            if circulating != i128::from(token.total_supply) {
                return Err(ExchangeError::Internal(format!(
                    "genesis supply mismatch for {}: accounts hold {circulating}, supply is {}",
                    token.symbol, token.total_supply
                )));
            }
        }

        self.fee_params = genesis.param_genesis.clone();
        self.trade_fees = Box::new(StandardFeeSchedule {
            rate_bps: self.fee_params.trade_fee_bps,
        });

        // Genesis transactions execute in a synthetic block zero.
        self.header = Some(BlockHeader {
            height: 0,
            time: genesis.genesis_time,
        });
        for tx in &genesis.gen_txs {
            let res = self.deliver_tx(tx);
            if !res.is_ok() {
                return Err(ExchangeError::Internal(format!(
                    "genesis tx failed: {}",
                    res.log
                )));
            }
        }
        self.commit()?;
        tracing::info!(
            tokens = genesis.tokens.len(),
            accounts = genesis.accounts.len(),
            validators = self.validators.len(),
            "chain initialized"
        );
        Ok(())
    }

    pub fn begin_block(&mut self, header: BlockHeader) {
        tracing::debug!(height = header.height, "begin block");
        self.header = Some(header);
        self.block_txs.clear();
        self.touched.clear();
    }

    /// Mempool admission: validation only, against the last committed
    /// state. Duplicate detection still consults the live order index.
    pub fn check_tx(&mut self, tx: &Tx) -> TxResult {
        match self.run_check(tx) {
            Ok(res) => res,
            Err(err) => {
                tracing::debug!(%err, "check_tx rejected");
                TxResult::from(&err)
            }
        }
    }

    fn run_check(&mut self, tx: &Tx) -> Result<TxResult> {
        tx.msg.validate_basic()?;
        let ctx = TxContext {
            mode: ExecMode::Check,
            height: self.last_height,
            block_time: self.prev_block_time.timestamp(),
            tx_hash: tx.hash,
        };
        let fee = self.fee_params.fee_for_route(tx.msg.route());
        if fee > 0 {
            let sender = tx.msg.sender();
            let available = self.check_state.ledger.get(&sender, NATIVE_SYMBOL).available;
            if available < fee {
                return Err(ExchangeError::InsufficientCoins {
                    symbol: NATIVE_SYMBOL.to_string(),
                    needed: fee,
                    available,
                });
            }
        }
        match &tx.msg {
            Msg::NewOrder(_) | Msg::CancelOrder(_) | Msg::List(_) => handle_dex_msg(
                &ctx,
                &mut self.keeper,
                &mut self.check_state.pairs,
                &self.check_state.tokens,
                &mut self.check_state.ledger,
                &tx.msg,
            ),
            Msg::Issue(_) | Msg::Mint(_) | Msg::Freeze(_) | Msg::Unfreeze(_) => handle_token_msg(
                &ctx,
                &mut self.check_state.tokens,
                &mut self.check_state.ledger,
                &tx.msg,
            ),
        }
    }

    /// Execute one transaction against block state. All-or-nothing: a
    /// failed handler leaves no effect, including the fee.
    pub fn deliver_tx(&mut self, tx: &Tx) -> TxResult {
        match self.run_deliver(tx) {
            Ok(res) => res,
            Err(err) => {
                tracing::debug!(%err, route = tx.msg.route(), "deliver_tx failed");
                TxResult::from(&err)
            }
        }
    }

    fn run_deliver(&mut self, tx: &Tx) -> Result<TxResult> {
        tx.msg.validate_basic()?;
        let header = self
            .header
            .ok_or_else(|| ExchangeError::Internal("deliver_tx outside a block".into()))?;
        let ctx = TxContext {
            mode: ExecMode::Deliver,
            height: header.height,
            block_time: header.time.timestamp(),
            tx_hash: tx.hash,
        };
        let sender = tx.msg.sender();
        let fee = self.fee_params.fee_for_route(tx.msg.route());
        if fee > 0 {
            self.ledger.sub_available(&sender, NATIVE_SYMBOL, fee)?;
        }

        let dispatched = match &tx.msg {
            Msg::NewOrder(_) | Msg::CancelOrder(_) | Msg::List(_) => handle_dex_msg(
                &ctx,
                &mut self.keeper,
                &mut self.pairs,
                &self.tokens,
                &mut self.ledger,
                &tx.msg,
            ),
            Msg::Issue(_) | Msg::Mint(_) | Msg::Freeze(_) | Msg::Unfreeze(_) => handle_token_msg(
                &ctx,
                &mut self.tokens,
                &mut self.ledger,
                &tx.msg,
            ),
        };

        match dispatched {
            Ok(res) => {
                if fee > 0 {
                    self.fee_pool.commit_fee(tx.hash, NATIVE_SYMBOL, fee);
                }
                self.touched.insert(sender);
                if matches!(
                    tx.msg,
                    Msg::NewOrder(_) | Msg::CancelOrder(_) | Msg::List(_)
                ) {
                    self.block_txs.push(tx.clone());
                }
                Ok(res)
            }
            Err(err) => {
                // Refund so the failed transaction observably never
                // happened.
                if fee > 0 {
                    self.ledger.add_available(&sender, NATIVE_SYMBOL, fee)?;
                }
                Err(err)
            }
        }
    }

    /// Seal the block: breathe housekeeping or matching, fee distribution,
    /// then publication. Internal errors are logged and surfaced as tags;
    /// the block always completes.
    pub fn end_block(&mut self, height: i64) -> EndBlockResult {
        let Some(header) = self.header else {
            tracing::error!(height, "end_block outside a block");
            return EndBlockResult::default();
        };
        let block_time = header.time;
        let mut tags = Vec::new();
        let mut trades: Vec<Trade> = Vec::new();

        if is_breathe_block(height, block_time, self.prev_block_time) {
            tracing::info!(height, "start breathe block handling");
            tags.push(Tag::new("breathe_block", height.to_string()));
            self.run_breathe_block(height, block_time);
        } else {
            tracing::debug!(height, "normal block");
            let mut trade_fee_coins = Coins::new();
            let outcome = match_and_allocate(
                &mut self.keeper,
                &mut self.pairs,
                &mut self.ledger,
                self.trade_fees.as_ref(),
                &mut trade_fee_coins,
                self.match_pool.as_ref(),
                height,
                block_time.timestamp(),
            );
            self.fee_pool.add_trade_fee(&trade_fee_coins);
            for (pair, err) in &outcome.failures {
                tags.push(Tag::new(format!("match_error/{pair}"), err.to_string()));
            }
            trades = outcome.trades;
        }

        let block_fee = self.fee_pool.drain();
        let credited = match distribute_block_fee(&mut self.ledger, &self.validators, &block_fee) {
            Ok(credited) => credited,
            Err(err) => {
                tracing::error!(%err, "block fee distribution failed");
                tags.push(Tag::new("fee_error", err.to_string()));
                Vec::new()
            }
        };

        self.publish(height, block_time, &trades, &credited, block_fee);

        EndBlockResult {
            validator_updates: Vec::new(),
            tags,
        }
    }

    /// Breathe-block housekeeping. Daily events run on their own threads
    /// and are joined before this returns.
    fn run_breathe_block(&mut self, height: i64, block_time: DateTime<Utc>) {
        let events = std::mem::take(&mut self.daily_events);
        std::thread::scope(|scope| {
            let handles: Vec<_> = events
                .iter()
                .map(|event| scope.spawn(move || event.run(height, block_time)))
                .collect();

            tracing::info!("update tick size / lot size");
            self.pairs.recalibrate();
            tracing::info!("expire stale orders");
            self.keeper
                .expire_orders(&mut self.ledger, block_time.timestamp());
            tracing::info!(height, "save order book snapshot");
            if let Err(err) =
                snapshot_books(&mut self.store.orderbooks, &self.keeper, &self.pairs, height)
            {
                tracing::error!(height, %err, "failed to snapshot order books");
            }
            self.store
                .main
                .set(b"last_breathe_height", height.to_string().into_bytes());

            for handle in handles {
                if handle.join().is_err() {
                    tracing::error!("daily event panicked");
                }
            }
        });
        self.daily_events = events;
    }

    /// Assemble and enqueue the block's publication record, then wait for
    /// the terminated-order acknowledgements.
    fn publish(
        &mut self,
        height: i64,
        block_time: DateTime<Utc>,
        trades: &[Trade],
        credited_validators: &[Address],
        block_fee: Coins,
    ) {
        if !self.publication.should_publish(height) {
            self.keeper.clear_round_buffers();
            return;
        }
        let Some(publisher) = &self.publisher else {
            self.keeper.clear_round_buffers();
            return;
        };

        let mut addresses = self.touched.clone();
        for trade in trades {
            addresses.insert(trade.buyer);
            addresses.insert(trade.seller);
        }
        addresses.extend(credited_validators.iter().copied());
        let accounts: Vec<AccountBalances> = addresses
            .iter()
            .map(|addr| AccountBalances {
                address: *addr,
                balances: self.ledger.balances_of(addr).into_iter().collect(),
            })
            .collect();

        let price_levels: Vec<PairLevels> = self
            .keeper
            .top_levels(MAX_ORDER_BOOK_LEVEL)
            .into_iter()
            .map(|(pair, bids, asks)| PairLevels { pair, bids, asks })
            .collect();

        let info = BlockInfo {
            height,
            block_time: block_time.timestamp(),
            trades: trades.to_vec(),
            order_changes: self.keeper.order_changes.clone(),
            order_changes_map: self.keeper.order_changes_map.clone(),
            accounts,
            price_levels,
            block_fee,
            round_fees: self
                .keeper
                .round_fees
                .iter()
                .map(|(a, c)| (*a, c.clone()))
                .collect(),
        };

        tracing::info!(
            height,
            trades = info.trades.len(),
            order_changes = info.order_changes.len(),
            accounts = info.accounts.len(),
            "start to publish"
        );

        match publisher.publish(info) {
            Ok(()) => {
                // The only back-pressure point: wait for the shipper to
                // confirm which terminated orders it has published.
                let removed = publisher.drain_acks();
                for id in &removed {
                    self.keeper.remove_published(id);
                }
                tracing::debug!(height, removed = removed.len(), "finish publish");
            }
            Err(err) => tracing::error!(height, %err, "publication failed"),
        }
        self.keeper.clear_round_buffers();
    }

    /// Persist every subsystem and seal the block.
    pub fn commit(&mut self) -> Result<(i64, [u8; 32])> {
        let header = self
            .header
            .take()
            .ok_or_else(|| ExchangeError::Internal("commit outside a block".into()))?;

        self.store
            .accounts
            .set(b"ledger", to_json(&self.ledger.export())?);
        let tokens: Vec<_> = self.tokens.all().cloned().collect();
        self.store.tokens.set(b"registry", to_json(&tokens)?);
        let pairs: Vec<_> = self.pairs.all().cloned().collect();
        self.store.pairs.set(b"registry", to_json(&pairs)?);
        self.store.params.set(b"fees", to_json(&self.fee_params)?);
        self.store.main.set(b"height", to_json(&header.height)?);
        self.store
            .main
            .set(b"last_block_time", to_json(&header.time.timestamp())?);
        self.store
            .main
            .set(b"validators", to_json(&self.validators)?);
        self.store.blocks.set(
            &block_header_key(header.height),
            to_json(&header.time.timestamp())?,
        );
        if !self.block_txs.is_empty() {
            self.store
                .blocks
                .set(&block_txs_key(header.height), to_json(&self.block_txs)?);
        }

        let (version, app_hash) = self.store.commit();
        self.check_state = CheckState {
            ledger: self.ledger.clone(),
            tokens: self.tokens.clone(),
            pairs: self.pairs.clone(),
        };
        self.last_height = header.height;
        self.last_app_hash = app_hash;
        self.prev_block_time = header.time;
        self.block_txs.clear();
        self.touched.clear();
        tracing::debug!(height = header.height, version, "committed");
        Ok((header.height, app_hash))
    }
}

impl Application for ExchangeApp {
    fn init_chain(&mut self, genesis: &Genesis) -> Result<()> {
        ExchangeApp::init_chain(self, genesis)
    }
    fn begin_block(&mut self, header: BlockHeader) {
        ExchangeApp::begin_block(self, header);
    }
    fn check_tx(&mut self, tx: &Tx) -> TxResult {
        ExchangeApp::check_tx(self, tx)
    }
    fn deliver_tx(&mut self, tx: &Tx) -> TxResult {
        ExchangeApp::deliver_tx(self, tx)
    }
    fn end_block(&mut self, height: i64) -> EndBlockResult {
        ExchangeApp::end_block(self, height)
    }
    fn commit(&mut self) -> Result<(i64, [u8; 32])> {
        ExchangeApp::commit(self)
    }
    fn query(&self, path: &str) -> Result<Vec<u8>> {
        self.handle_query(path)
    }
}

/// A breathe block fires when the height crosses a multiple of the breathe
/// interval or the UTC date changes between consecutive blocks.
#[must_use]
pub fn is_breathe_block(height: i64, time: DateTime<Utc>, prev_time: DateTime<Utc>) -> bool {
    if height <= 0 {
        return false;
    }
    let interval_crossed =
        height / BREATHE_BLOCK_INTERVAL != (height - 1) / BREATHE_BLOCK_INTERVAL;
    interval_crossed || time.date_naive() != prev_time.date_naive()
}

fn build_match_pool(concurrency: usize) -> Result<Option<rayon::ThreadPool>> {
    if concurrency <= 1 {
        return Ok(None);
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency)
        .build()
        .map(Some)
        .map_err(|e| ExchangeError::Internal(format!("match pool: {e}")))
}

/// Re-apply one block's recorded order flow and its auction round to the
/// books, without ledger effects.
fn replay_block(
    store: &MultiStore,
    keeper: &mut OrderKeeper,
    last_prices: &mut BTreeMap<String, i64>,
    lots: &BTreeMap<String, i64>,
    height: i64,
) -> Result<()> {
    let Some(raw) = store.blocks.get(&block_txs_key(height)) else {
        // Blocks without order flow cannot create a crossing.
        return Ok(());
    };
    let txs: Vec<Tx> = from_json(&raw)?;
    let block_time: i64 = read_json(&store.blocks, &block_header_key(height))?;

    for tx in &txs {
        match &tx.msg {
            Msg::NewOrder(m) => {
                let locked = match m.side {
                    Side::Buy => big_notional_ceil(m.quantity, m.price),
                    Side::Sell => m.quantity,
                };
                keeper.hydrate_order(Order {
                    id: m.id.clone(),
                    sender: m.sender,
                    pair: m.symbol.clone(),
                    side: m.side,
                    price: m.price,
                    quantity: m.quantity,
                    cum_filled: 0,
                    locked_remaining: locked,
                    time_in_force: m.time_in_force,
                    created_height: height,
                    created_time: block_time,
                    status: OrderStatus::New,
                })?;
            }
            Msg::CancelOrder(m) => {
                keeper.evict_order(&m.ref_id)?;
            }
            Msg::List(m) => {
                let symbol = blockdex_types::pair_symbol(&m.base_symbol, &m.quote_symbol);
                keeper.add_book(&symbol);
                last_prices.entry(symbol).or_insert(m.init_price);
            }
            other => {
                return Err(ExchangeError::Internal(format!(
                    "unexpected {} tx in the block store",
                    other.route()
                )));
            }
        }
    }
    replay_match(keeper, last_prices, lots)
}

fn block_txs_key(height: i64) -> Vec<u8> {
    format!("txs/{height:020}").into_bytes()
}

fn block_header_key(height: i64) -> Vec<u8> {
    format!("header/{height:020}").into_bytes()
}

fn timestamp_to_datetime(unix_secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(unix_secs, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| ExchangeError::Internal(format!("serialize: {e}")))
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &[u8]) -> Result<T> {
    serde_json::from_slice(raw).map_err(|e| ExchangeError::Internal(format!("deserialize: {e}")))
}

fn read_json<T: serde::de::DeserializeOwned>(store: &dyn KvStore, key: &[u8]) -> Result<T> {
    let raw = store.get(key).ok_or_else(|| {
        ExchangeError::Internal(format!(
            "store load failure: missing key {}",
            String::from_utf8_lossy(key)
        ))
    })?;
    from_json(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn breathe_on_interval_crossing() {
        let t = ts(1_700_000_000);
        assert!(is_breathe_block(1_000, t, t));
        assert!(is_breathe_block(2_000, t, t));
        assert!(!is_breathe_block(999, t, t));
        assert!(!is_breathe_block(1_001, t, t));
    }

    #[test]
    fn breathe_on_utc_day_boundary() {
        let before_midnight = ts(86_400 * 19_700 - 1);
        let after_midnight = ts(86_400 * 19_700);
        assert!(is_breathe_block(5, after_midnight, before_midnight));
        assert!(!is_breathe_block(5, before_midnight, before_midnight));
    }

    #[test]
    fn genesis_block_is_never_breathe() {
        let t = ts(1_700_000_000);
        assert!(!is_breathe_block(0, t, ts(0)));
    }

    #[test]
    fn single_worker_runs_without_a_pool() {
        assert!(build_match_pool(1).unwrap().is_none());
        assert!(build_match_pool(2).unwrap().is_some());
    }
}
