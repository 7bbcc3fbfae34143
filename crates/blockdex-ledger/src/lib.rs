//! # blockdex-ledger
//!
//! The per-(account, symbol) balance ledger.
//!
//! Every balance splits into three non-negative buckets:
//! - **available**: spendable on new orders, freezes, and fees
//! - **locked**: encumbered behind live orders
//! - **frozen**: administratively immobilized
//!
//! Each public operation is a single atomic step: it either applies fully
//! or fails without touching the ledger. Handlers compose these steps in
//! check-then-mutate order, so no transaction ever leaves a half-applied
//! balance behind.

pub mod ledger;

pub use ledger::{Balances, Ledger};
