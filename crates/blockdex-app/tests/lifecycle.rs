//! Integration test: the full block lifecycle.
//!
//! Drives the application the way the consensus driver does (genesis,
//! blocks of transactions, EndBlock, Commit) and checks the observable
//! outcomes: balances, fills, expiry, fee distribution, queries, and the
//! publication pipeline.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use blockdex_app::publisher::{self, BlockInfo, PublishAck};
use blockdex_app::{genesis::Genesis, genesis::GenesisAccount, BlockHeader, ExchangeApp};
use blockdex_types::constants::SCALE;
use blockdex_types::math::big_notional;
use blockdex_types::{
    Address, BaseConfig, CancelOrderMsg, Coin, FeeParams, IssueMsg, Msg, NewOrderMsg, Order,
    OrderId, PublicationConfig, Side, TimeInForce, Token, TradingPair, Tx, TxResult,
};

// 22:13:20 UTC; the UTC day rolls over 6,400 seconds later.
const T0: i64 = 1_700_000_000;
const PAIR: &str = "BTC-1A2_BDX";

fn addr(n: u8) -> Address {
    Address([n; 20])
}

fn at(offset: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(T0 + offset, 0).unwrap()
}

fn base_genesis(fees: FeeParams) -> Genesis {
    Genesis {
        genesis_time: at(0),
        accounts: vec![
            GenesisAccount {
                address: addr(1),
                coins: vec![Coin::new("BDX", 4_000_000 * SCALE)],
                val_addr: None,
            },
            GenesisAccount {
                address: addr(2),
                coins: vec![
                    Coin::new("BDX", 3_000_000 * SCALE),
                    Coin::new("BTC-1A2", 11_000 * SCALE),
                ],
                val_addr: None,
            },
            GenesisAccount {
                address: addr(3),
                coins: vec![Coin::new("BTC-1A2", 10_000 * SCALE)],
                val_addr: None,
            },
            GenesisAccount {
                address: addr(8),
                coins: vec![],
                val_addr: Some(addr(8)),
            },
            GenesisAccount {
                address: addr(9),
                coins: vec![Coin::new("BDX", 3_000_000 * SCALE)],
                val_addr: Some(addr(9)),
            },
        ],
        tokens: vec![
            Token::new("Native Token", "BDX", 10_000_000, 8, addr(9), false).unwrap(),
            Token::new("Bitcoin", "BTC-1A2", 21_000, 8, addr(9), false).unwrap(),
        ],
        stake_data: None,
        gov_data: None,
        param_genesis: fees,
        gen_txs: vec![Tx::new(Msg::List(blockdex_types::ListMsg {
            sender: addr(9),
            base_symbol: "BTC-1A2".into(),
            quote_symbol: "BDX".into(),
            init_price: 100 * SCALE,
        }))],
    }
}

fn new_app(fees: FeeParams) -> ExchangeApp {
    let mut app = ExchangeApp::new(
        BaseConfig::default(),
        PublicationConfig::default(),
        None,
    )
    .unwrap();
    app.init_chain(&base_genesis(fees)).unwrap();
    app
}

fn order_tx(who: u8, seq: u64, side: Side, price: i64, qty: i64, tif: TimeInForce) -> Tx {
    Tx::new(Msg::NewOrder(NewOrderMsg {
        sender: addr(who),
        id: OrderId::new(addr(who), seq),
        symbol: PAIR.into(),
        side,
        price,
        quantity: qty,
        time_in_force: tif,
    }))
}

fn buy(who: u8, seq: u64, price: i64, qty: i64) -> Tx {
    order_tx(who, seq, Side::Buy, price, qty, TimeInForce::GoodTillExpire)
}

fn sell(who: u8, seq: u64, price: i64, qty: i64) -> Tx {
    order_tx(who, seq, Side::Sell, price, qty, TimeInForce::GoodTillExpire)
}

fn run_block(app: &mut ExchangeApp, height: i64, offset: i64, txs: &[Tx]) -> Vec<TxResult> {
    app.begin_block(BlockHeader {
        height,
        time: at(offset),
    });
    let results = txs.iter().map(|tx| app.deliver_tx(tx)).collect();
    app.end_block(height);
    app.commit().unwrap();
    results
}

fn open_orders(app: &ExchangeApp, who: u8) -> Vec<Order> {
    let raw = app
        .handle_query(&format!("dex/openorders/{}", addr(who).hex()))
        .unwrap();
    serde_json::from_slice(&raw).unwrap()
}

#[test]
fn genesis_initializes_supply_and_pair() {
    let app = new_app(FeeParams::default());
    assert_eq!(app.last_height(), 0);
    assert_eq!(app.total_of("BDX"), i128::from(10_000_000 * SCALE));
    assert_eq!(app.total_of("BTC-1A2"), i128::from(21_000 * SCALE));

    let raw = app.handle_query("dex/pairs").unwrap();
    let pairs: Vec<TradingPair> = serde_json::from_slice(&raw).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].symbol(), PAIR);
    assert_eq!(pairs[0].last_price, 100 * SCALE);
}

#[test]
fn genesis_supply_mismatch_is_fatal() {
    let mut genesis = base_genesis(FeeParams::default());
    genesis.accounts[0].coins = vec![Coin::new("BDX", SCALE)];
    let mut app =
        ExchangeApp::new(BaseConfig::default(), PublicationConfig::default(), None).unwrap();
    assert!(app.init_chain(&genesis).is_err());
}

#[test]
fn single_cross_match_settles_through_the_app() {
    let mut app = new_app(FeeParams::default());
    let results = run_block(
        &mut app,
        1,
        10,
        &[
            buy(1, 1, 101 * SCALE, 100 * SCALE),
            sell(2, 1, 100 * SCALE, 60 * SCALE),
        ],
    );
    assert!(results.iter().all(TxResult::is_ok));

    // Uniform buy surplus clears at 101; 60 lots execute.
    let buyer_quote = app.balance_of(&addr(1), "BDX");
    assert_eq!(buyer_quote.locked, big_notional(40 * SCALE, 101 * SCALE));
    assert_eq!(
        buyer_quote.available,
        4_000_000 * SCALE - big_notional(100 * SCALE, 101 * SCALE)
    );
    assert_eq!(app.balance_of(&addr(1), "BTC-1A2").available, 60 * SCALE);

    let seller_base = app.balance_of(&addr(2), "BTC-1A2");
    assert_eq!(seller_base.locked, 0);
    assert_eq!(seller_base.available, 10_940 * SCALE);
    assert_eq!(
        app.balance_of(&addr(2), "BDX").available,
        3_000_000 * SCALE + big_notional(60 * SCALE, 101 * SCALE)
    );

    // Conservation after the trade.
    assert_eq!(app.total_of("BDX"), i128::from(10_000_000 * SCALE));
    assert_eq!(app.total_of("BTC-1A2"), i128::from(21_000 * SCALE));

    // The 40-lot remainder still rests; the book is not crossed.
    let orders = open_orders(&app, 1);
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].leaves(), 40 * SCALE);
}

#[test]
fn duplicate_order_rejected_with_state_unchanged() {
    let mut app = new_app(FeeParams::default());
    let tx = buy(1, 1, 101 * SCALE, 10 * SCALE);
    let first = run_block(&mut app, 1, 10, &[tx.clone()]);
    assert!(first[0].is_ok());
    let locked_before = app.balance_of(&addr(1), "BDX").locked;

    let second = run_block(&mut app, 2, 20, &[tx]);
    assert_eq!(second[0].code, 61);
    assert_eq!(app.balance_of(&addr(1), "BDX").locked, locked_before);
    assert_eq!(open_orders(&app, 1).len(), 1);
}

#[test]
fn cancel_by_non_owner_rejected_without_balance_change() {
    let mut app = new_app(FeeParams::default());
    run_block(&mut app, 1, 10, &[buy(1, 1, 101 * SCALE, 10 * SCALE)]);
    let locked_before = app.balance_of(&addr(1), "BDX").locked;

    let foreign_cancel = Tx::new(Msg::CancelOrder(CancelOrderMsg {
        sender: addr(2),
        ref_id: OrderId::new(addr(1), 1),
    }));
    let results = run_block(&mut app, 2, 20, &[foreign_cancel]);
    assert_eq!(results[0].code, 62);
    assert_eq!(app.balance_of(&addr(1), "BDX").locked, locked_before);

    // The owner can still cancel, releasing the lock.
    let own_cancel = Tx::new(Msg::CancelOrder(CancelOrderMsg {
        sender: addr(1),
        ref_id: OrderId::new(addr(1), 1),
    }));
    let results = run_block(&mut app, 3, 30, &[own_cancel]);
    assert!(results[0].is_ok());
    assert_eq!(app.balance_of(&addr(1), "BDX").locked, 0);
}

#[test]
fn day_order_expires_at_the_utc_boundary() {
    let mut app = new_app(FeeParams::default());
    let day_order = order_tx(1, 1, Side::Buy, 101 * SCALE, 10 * SCALE, TimeInForce::Day);
    run_block(&mut app, 1, 0, &[day_order]);

    // 23:53 the same UTC day: still resting.
    run_block(&mut app, 2, 6_000, &[]);
    assert_eq!(open_orders(&app, 1).len(), 1);

    // First block of the next UTC day: breathe block, order expires.
    run_block(&mut app, 3, 6_500, &[]);
    assert!(open_orders(&app, 1).is_empty());
    let bal = app.balance_of(&addr(1), "BDX");
    assert_eq!(bal.locked, 0);
    assert_eq!(bal.available, 4_000_000 * SCALE);
}

#[test]
fn ioc_remainder_dies_in_its_block() {
    let mut app = new_app(FeeParams::default());
    let ioc = order_tx(
        1,
        1,
        Side::Buy,
        101 * SCALE,
        10 * SCALE,
        TimeInForce::ImmediateOrCancel,
    );
    let results = run_block(&mut app, 1, 10, &[ioc]);
    assert!(results[0].is_ok());
    assert!(open_orders(&app, 1).is_empty());
    assert_eq!(app.balance_of(&addr(1), "BDX").locked, 0);
}

#[test]
fn issue_and_mint_through_blocks() {
    let mut app = new_app(FeeParams::default());
    let issue = Tx::new(Msg::Issue(IssueMsg {
        sender: addr(1),
        name: "Example".into(),
        symbol: "EXM".into(),
        total_supply: 5_000,
        decimals: 8,
        mintable: true,
    }));
    let suffix = issue.hash.symbol_suffix();
    let symbol = format!("EXM-{suffix}");
    let results = run_block(&mut app, 1, 10, &[issue]);
    assert!(results[0].is_ok());

    assert_eq!(app.balance_of(&addr(1), &symbol).available, 5_000 * SCALE);
    assert_eq!(app.total_of(&symbol), i128::from(5_000 * SCALE));

    let raw = app.handle_query(&format!("tokens/info/{symbol}")).unwrap();
    let token: Token = serde_json::from_slice(&raw).unwrap();
    assert_eq!(token.total_supply, 5_000 * SCALE);
    assert!(token.mintable);

    let mint = Tx::new(Msg::Mint(blockdex_types::MintMsg {
        sender: addr(1),
        symbol: symbol.clone(),
        amount: 100,
    }));
    let results = run_block(&mut app, 2, 20, &[mint]);
    assert!(results[0].is_ok());
    assert_eq!(app.total_of(&symbol), i128::from(5_100 * SCALE));
}

#[test]
fn failed_transaction_refunds_its_fee() {
    let fees = FeeParams {
        new_order_fee: 1_000,
        ..FeeParams::default()
    };
    let mut app = new_app(fees);
    let before = app.balance_of(&addr(1), "BDX").available;

    // Quantity far beyond the account's balance: the handler fails.
    let doomed = buy(1, 1, 101 * SCALE, 1_000_000 * SCALE);
    let results = run_block(&mut app, 1, 10, &[doomed]);
    assert_eq!(results[0].code, 5);

    // Fee refunded along with everything else: observably never happened.
    assert_eq!(app.balance_of(&addr(1), "BDX").available, before);
}

#[test]
fn block_fees_split_across_validators_with_remainder_to_first() {
    let fees = FeeParams {
        new_order_fee: 1_001,
        ..FeeParams::default()
    };
    let mut app = new_app(fees);
    let results = run_block(&mut app, 1, 10, &[buy(1, 1, 101 * SCALE, 10 * SCALE)]);
    assert!(results[0].is_ok());

    // addr(8) sorts first and takes the odd unit.
    assert_eq!(app.balance_of(&addr(8), "BDX").available, 501);
    assert_eq!(
        app.balance_of(&addr(9), "BDX").available,
        3_000_000 * SCALE + 500
    );
    assert_eq!(app.total_of("BDX"), i128::from(10_000_000 * SCALE));
}

#[test]
fn check_tx_validates_without_mutating() {
    let mut app = new_app(FeeParams::default());
    let tx = buy(1, 1, 101 * SCALE, 10 * SCALE);

    let res = app.check_tx(&tx);
    assert!(res.is_ok());
    assert_eq!(app.balance_of(&addr(1), "BDX").locked, 0);
    assert!(open_orders(&app, 1).is_empty());

    // Delivered, the same id becomes a duplicate even in check mode.
    run_block(&mut app, 1, 10, &[tx.clone()]);
    let res = app.check_tx(&tx);
    assert_eq!(res.code, 61);
}

#[test]
fn tick_and_lot_recalibrate_at_breathe_blocks() {
    let mut app = new_app(FeeParams::default());
    // Trade two decades above the listing price.
    run_block(
        &mut app,
        1,
        10,
        &[
            buy(1, 1, 10_000 * SCALE, SCALE),
            sell(2, 1, 10_000 * SCALE, SCALE),
        ],
    );

    let pairs: Vec<TradingPair> =
        serde_json::from_slice(&app.handle_query("dex/pairs").unwrap()).unwrap();
    assert_eq!(pairs[0].last_price, 10_000 * SCALE);
    let (tick_before, lot_before) = (pairs[0].tick_size, pairs[0].lot_size);

    // Next-day breathe block recalibrates.
    run_block(&mut app, 2, 6_500, &[]);
    let pairs: Vec<TradingPair> =
        serde_json::from_slice(&app.handle_query("dex/pairs").unwrap()).unwrap();
    assert!(pairs[0].tick_size > tick_before);
    assert!(pairs[0].lot_size < lot_before);
}

#[test]
fn unknown_query_paths_are_rejected() {
    let app = new_app(FeeParams::default());
    assert!(app.handle_query("dex/unknown").is_err());
    assert!(app.handle_query("tokens/info/GHOST-123").is_err());
    assert!(app.handle_query("dex/orderbook/GHOST_BDX").is_err());
    assert!(app.handle_query("").is_err());
}

#[test]
fn orderbook_query_reports_top_levels() {
    let mut app = new_app(FeeParams::default());
    run_block(
        &mut app,
        1,
        10,
        &[
            buy(1, 1, 99 * SCALE, 10 * SCALE),
            buy(1, 2, 98 * SCALE, 10 * SCALE),
            sell(2, 1, 102 * SCALE, 5 * SCALE),
        ],
    );
    let raw = app.handle_query(&format!("dex/orderbook/{PAIR}")).unwrap();
    let levels: publisher::PairLevels = serde_json::from_slice(&raw).unwrap();
    assert_eq!(levels.bids, vec![(99 * SCALE, 10 * SCALE), (98 * SCALE, 10 * SCALE)]);
    assert_eq!(levels.asks, vec![(102 * SCALE, 5 * SCALE)]);
}

#[test]
fn publication_pipeline_ships_blocks_and_prunes_terminated_orders() {
    let publication = PublicationConfig {
        enabled: true,
        from_height_inclusive: 1,
        ..PublicationConfig::default()
    };
    let (publisher, handle) = publisher::channel(&publication);
    let mut app = ExchangeApp::new(BaseConfig::default(), publication, Some(publisher)).unwrap();
    app.init_chain(&base_genesis(FeeParams::default())).unwrap();

    let received: Arc<Mutex<Vec<BlockInfo>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let shipper = std::thread::spawn(move || {
        while let Ok(info) = handle.blocks.recv() {
            // Ship everything, then acknowledge the terminated orders.
            for (id, order) in &info.order_changes_map {
                if order.status.is_terminal() {
                    let _ = handle.acks.send(PublishAck::Removed(id.clone()));
                }
            }
            let _ = handle.acks.send(PublishAck::Done);
            sink.lock().unwrap().push(info);
        }
    });

    // Block 1: a trade plus a resting remainder.
    run_block(
        &mut app,
        1,
        10,
        &[
            buy(1, 1, 101 * SCALE, 100 * SCALE),
            sell(2, 1, 100 * SCALE, 60 * SCALE),
        ],
    );
    // Block 2: cancel the remainder.
    run_block(
        &mut app,
        2,
        20,
        &[Tx::new(Msg::CancelOrder(CancelOrderMsg {
            sender: addr(1),
            ref_id: OrderId::new(addr(1), 1),
        }))],
    );
    // Block 3: empty.
    run_block(&mut app, 3, 30, &[]);

    drop(app);
    shipper.join().unwrap();

    let blocks = received.lock().unwrap();
    assert_eq!(blocks.len(), 3);

    let first = &blocks[0];
    assert_eq!(first.height, 1);
    assert_eq!(first.trades.len(), 1);
    assert_eq!(first.trades[0].quantity, 60 * SCALE);
    assert_eq!(first.trades[0].price, 101 * SCALE);
    // NEW events for both orders plus FILL events for both sides.
    assert!(first.order_changes.len() >= 4);
    // Accounts: both traders at minimum.
    let published: Vec<Address> = first.accounts.iter().map(|a| a.address).collect();
    assert!(published.contains(&addr(1)));
    assert!(published.contains(&addr(2)));
    // The fully filled sell is in the map, terminal; the buy rests.
    let sell_id = OrderId::new(addr(2), 1);
    assert!(first.order_changes_map.get(&sell_id).unwrap().status.is_terminal());
    assert!(!first.price_levels.is_empty());

    // The acked terminal order is pruned from the next block's map; the
    // resting buy persists until its own termination.
    let second = &blocks[1];
    assert!(second.order_changes_map.get(&sell_id).is_none());
    let buy_id = OrderId::new(addr(1), 1);
    assert!(second.order_changes_map.get(&buy_id).unwrap().status.is_terminal());

    // And after its cancel was acked, block 3 no longer carries it.
    let third = &blocks[2];
    assert!(third.order_changes_map.get(&buy_id).is_none());
    assert!(third.trades.is_empty());
}
