//! Message handlers for the dex plugin.

use blockdex_ledger::Ledger;
use blockdex_tokens::TokenRegistry;
use blockdex_types::constants::NATIVE_SYMBOL;
use blockdex_types::{
    CancelOrderMsg, ExchangeError, ListMsg, Msg, NewOrderMsg, Result, TxContext, TxResult,
};

use crate::keeper::OrderKeeper;
use crate::pairs::PairRegistry;

/// Dispatch a dex-plugin message.
#[allow(clippy::too_many_arguments)]
pub fn handle_dex_msg(
    ctx: &TxContext,
    keeper: &mut OrderKeeper,
    pairs: &mut PairRegistry,
    tokens: &TokenRegistry,
    ledger: &mut Ledger,
    msg: &Msg,
) -> Result<TxResult> {
    match msg {
        Msg::NewOrder(m) => handle_new_order(ctx, keeper, pairs, ledger, m),
        Msg::CancelOrder(m) => handle_cancel_order(ctx, keeper, ledger, m),
        Msg::List(m) => handle_list(ctx, keeper, pairs, tokens, m),
        other => Err(ExchangeError::UnknownRequest {
            reason: format!("unrecognized dex msg route {}", other.route()),
        }),
    }
}

fn handle_new_order(
    ctx: &TxContext,
    keeper: &mut OrderKeeper,
    pairs: &PairRegistry,
    ledger: &mut Ledger,
    msg: &NewOrderMsg,
) -> Result<TxResult> {
    if ctx.is_check() {
        // Mempool admission: duplicate detection and lock feasibility
        // against committed state, no mutation.
        keeper.validate_order(ledger, pairs, msg)?;
        return Ok(TxResult::ok());
    }
    keeper.add_order(ledger, pairs, msg, ctx.height, ctx.block_time)?;
    Ok(TxResult::with_data(msg.id.as_str().as_bytes().to_vec()))
}

fn handle_cancel_order(
    ctx: &TxContext,
    keeper: &mut OrderKeeper,
    ledger: &mut Ledger,
    msg: &CancelOrderMsg,
) -> Result<TxResult> {
    if ctx.is_check() {
        keeper.validate_cancel(&msg.ref_id, &msg.sender)?;
        return Ok(TxResult::ok());
    }
    keeper.remove_order(
        ledger,
        &msg.ref_id,
        Some(&msg.sender),
        blockdex_types::ChangeKind::Cancel,
    )?;
    Ok(TxResult::ok())
}

fn handle_list(
    ctx: &TxContext,
    keeper: &mut OrderKeeper,
    pairs: &mut PairRegistry,
    tokens: &TokenRegistry,
    msg: &ListMsg,
) -> Result<TxResult> {
    tokens.get(&msg.base_symbol)?;
    tokens.get(&msg.quote_symbol)?;
    if msg.quote_symbol != NATIVE_SYMBOL {
        return Err(ExchangeError::InvalidCoins {
            reason: format!("quote asset must be {NATIVE_SYMBOL}"),
        });
    }
    let symbol = blockdex_types::pair_symbol(&msg.base_symbol, &msg.quote_symbol);
    if pairs.exists(&symbol) {
        return Err(ExchangeError::InvalidCoins {
            reason: format!("pair({symbol}) is already listed"),
        });
    }

    if ctx.is_check() {
        return Ok(TxResult::ok());
    }

    pairs.list(&msg.base_symbol, &msg.quote_symbol, msg.init_price)?;
    keeper.add_book(&symbol);
    tracing::info!(pair = %symbol, init_price = msg.init_price, "listed trading pair");
    Ok(TxResult::with_log(format!("Listed {symbol}")))
}
