//! Message handlers for the token plugin.

use blockdex_ledger::Ledger;
use blockdex_types::token::{scale_amount, suffixed_symbol};
use blockdex_types::{
    ExchangeError, FreezeMsg, IssueMsg, MintMsg, Msg, Result, Token, TxContext, TxResult,
    UnfreezeMsg,
};

use crate::registry::TokenRegistry;

/// Dispatch a token-plugin message.
pub fn handle_token_msg(
    ctx: &TxContext,
    registry: &mut TokenRegistry,
    ledger: &mut Ledger,
    msg: &Msg,
) -> Result<TxResult> {
    match msg {
        Msg::Issue(m) => handle_issue(ctx, registry, ledger, m),
        Msg::Mint(m) => handle_mint(ctx, registry, ledger, m),
        Msg::Freeze(m) => handle_freeze(ctx, registry, ledger, m),
        Msg::Unfreeze(m) => handle_unfreeze(ctx, registry, ledger, m),
        other => Err(ExchangeError::UnknownRequest {
            reason: format!("unrecognized token msg route {}", other.route()),
        }),
    }
}

fn handle_issue(
    ctx: &TxContext,
    registry: &mut TokenRegistry,
    ledger: &mut Ledger,
    msg: &IssueMsg,
) -> Result<TxResult> {
    // The symbol is suffixed with the first bytes of the tx hash, which
    // keeps a popular root unique across issuers.
    let symbol = suffixed_symbol(&msg.symbol, &ctx.tx_hash);

    if registry.exists(&symbol) {
        tracing::info!(%symbol, "issue token failed: already exists");
        return Err(ExchangeError::InvalidCoins {
            reason: format!("symbol({}) already exists", msg.symbol),
        });
    }

    let token = Token::new(
        msg.name.clone(),
        symbol.clone(),
        msg.total_supply,
        msg.decimals,
        msg.sender,
        msg.mintable,
    )?;

    if ctx.is_check() {
        return Ok(TxResult::ok());
    }

    let supply = token.total_supply;
    let serialized = serde_json::to_vec(&token)
        .map_err(|e| ExchangeError::Internal(format!("token serialization: {e}")))?;
    registry.insert(token)?;
    ledger.add_available(&msg.sender, &symbol, supply)?;

    tracing::info!(%symbol, supply, issuer = %msg.sender, "issued token");
    Ok(TxResult {
        data: serialized,
        log: format!("Issued {symbol}"),
        ..TxResult::default()
    })
}

fn handle_mint(
    ctx: &TxContext,
    registry: &mut TokenRegistry,
    ledger: &mut Ledger,
    msg: &MintMsg,
) -> Result<TxResult> {
    let token = registry.get(&msg.symbol)?;
    if !token.mintable {
        return Err(ExchangeError::InvalidCoins {
            reason: format!("token({}) cannot be minted", msg.symbol),
        });
    }
    if !token.is_owner(&msg.sender) {
        return Err(ExchangeError::Unauthorized {
            reason: format!("only the owner can mint token {}", msg.symbol),
        });
    }
    let scaled = scale_amount(msg.amount, token.decimals)?;

    if ctx.is_check() {
        // Feasibility only: the supply bound is re-checked on deliver.
        if scaled > blockdex_types::constants::TOKEN_MAX_TOTAL_SUPPLY - token.total_supply {
            return Err(ExchangeError::InvalidCoins {
                reason: "mint amount is too large".into(),
            });
        }
        return Ok(TxResult::ok());
    }

    let new_supply = registry.raise_supply(&msg.symbol, scaled)?;
    ledger.add_available(&msg.sender, &msg.symbol, scaled)?;

    tracing::info!(symbol = %msg.symbol, new_supply, "minted token");
    Ok(TxResult::with_data(new_supply.to_string().into_bytes()))
}

fn handle_freeze(
    ctx: &TxContext,
    registry: &TokenRegistry,
    ledger: &mut Ledger,
    msg: &FreezeMsg,
) -> Result<TxResult> {
    let token = registry.get(&msg.symbol)?;
    let scaled = scale_amount(msg.amount, token.decimals)?;

    if ctx.is_check() {
        let available = ledger.get(&msg.sender, &msg.symbol).available;
        if available < scaled {
            return Err(ExchangeError::InsufficientCoins {
                symbol: msg.symbol.clone(),
                needed: scaled,
                available,
            });
        }
        return Ok(TxResult::ok());
    }

    ledger.move_available_to_frozen(&msg.sender, &msg.symbol, scaled)?;
    Ok(TxResult::ok())
}

fn handle_unfreeze(
    ctx: &TxContext,
    registry: &TokenRegistry,
    ledger: &mut Ledger,
    msg: &UnfreezeMsg,
) -> Result<TxResult> {
    let token = registry.get(&msg.symbol)?;
    let scaled = scale_amount(msg.amount, token.decimals)?;

    if ctx.is_check() {
        let frozen = ledger.get(&msg.sender, &msg.symbol).frozen;
        if frozen < scaled {
            return Err(ExchangeError::InsufficientCoins {
                symbol: msg.symbol.clone(),
                needed: scaled,
                available: frozen,
            });
        }
        return Ok(TxResult::ok());
    }

    ledger.move_frozen_to_available(&msg.sender, &msg.symbol, scaled)?;
    Ok(TxResult::ok())
}
