//! # blockdex-types
//!
//! Shared types, errors, and configuration for the **blockdex** exchange
//! state machine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Address`], [`TxHash`], [`OrderId`]
//! - **Amounts**: [`Coin`], [`Coins`], the fixed-point helpers in [`math`]
//! - **Order model**: [`Order`], [`Side`], [`TimeInForce`], [`OrderStatus`],
//!   [`OrderChange`], [`OrderInfo`]
//! - **Trade model**: [`Trade`]
//! - **Registry records**: [`Token`], [`TradingPair`]
//! - **Messages**: the tagged [`Msg`] variant and [`Tx`]
//! - **Results**: [`TxResult`], [`Tag`], [`EndBlockResult`]
//! - **Errors**: [`ExchangeError`] with stable numeric codes
//! - **Configuration**: [`BaseConfig`], [`PublicationConfig`], [`FeeParams`]
//! - **Constants**: system-wide limits and defaults

pub mod coins;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod ids;
pub mod math;
pub mod msg;
pub mod order;
pub mod pair;
pub mod result;
pub mod store;
pub mod token;
pub mod trade;

// Re-export the primary types at the crate root for ergonomic imports:
//   use blockdex_types::{Order, Side, Trade, Msg, ...};

pub use coins::*;
pub use config::*;
pub use context::*;
pub use error::*;
pub use ids::*;
pub use msg::*;
pub use order::*;
pub use pair::*;
pub use result::*;
pub use store::*;
pub use token::*;
pub use trade::*;

// Constants are accessed via `blockdex_types::constants::FOO`
// (not re-exported to avoid name collisions).
