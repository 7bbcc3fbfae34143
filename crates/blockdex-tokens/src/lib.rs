//! # blockdex-tokens
//!
//! The token registry and its message handlers: Issue, Mint, Freeze,
//! Unfreeze.
//!
//! Issued symbols are suffixed with the leading hex characters of the
//! issuing transaction hash, so the same root issued twice yields two
//! distinct tokens. Supply lives in the registry; circulating balances live
//! in the ledger; the two are reconciled by the conservation invariant.

pub mod handler;
pub mod registry;

pub use handler::handle_token_msg;
pub use registry::TokenRegistry;
