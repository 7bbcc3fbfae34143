//! The per-transaction execution context threaded through handlers.

use crate::ids::TxHash;

/// Check mode validates for mempool admission against the last committed
/// state; deliver mode mutates block state. The distinction is this single
/// flag, not two code paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    Check,
    Deliver,
}

/// Everything a handler may read about the transaction being executed.
#[derive(Debug, Clone, Copy)]
pub struct TxContext {
    pub mode: ExecMode,
    pub height: i64,
    /// Unix seconds of the block being built.
    pub block_time: i64,
    pub tx_hash: TxHash,
}

impl TxContext {
    #[must_use]
    pub fn is_check(&self) -> bool {
        self.mode == ExecMode::Check
    }
}
