//! # blockdex-dex
//!
//! The dex plugin: order keeper, pair registry, tick/lot schedule, per-pair
//! matching fan-out, order-book snapshots, and the dex message handlers.
//!
//! The keeper owns every book and the live-order index, and is the only
//! component that touches both the books and the balance ledger; the
//! ledger is a leaf it calls into, never the other way around. Fee accrual
//! flows back through return values.

pub mod fees;
pub mod handler;
pub mod keeper;
pub mod matching;
pub mod pairs;
pub mod schedule;
pub mod snapshot;

pub use fees::{FeeCoin, NoFees, StandardFeeSchedule, TradeFeeSchedule};
pub use handler::handle_dex_msg;
pub use keeper::{OrderKeeper, OrderLocation};
pub use matching::{match_and_allocate, replay_match, MatchOutcome};
pub use pairs::PairRegistry;
