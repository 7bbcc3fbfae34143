//! System-wide constants for the blockdex exchange state machine.

/// Fixed-point scale for prices and quantities: all amounts carry 8 implied
/// decimal places.
pub const SCALE: i64 = 100_000_000;

/// Global ceiling for any token's scaled total supply.
pub const TOKEN_MAX_TOTAL_SUPPLY: i64 = 9_000_000_000_000_000_000;

/// Maximum number of decimal places a token may declare.
pub const MAX_DECIMALS: u8 = 8;

/// The native staking / fee token. The only allowed quote asset for listing.
pub const NATIVE_SYMBOL: &str = "BDX";

/// Number of tx-hash hex characters appended to an issued token symbol.
pub const SYMBOL_SUFFIX_LEN: usize = 3;

/// Minimum and maximum length of a token symbol root (before suffixing).
pub const MIN_SYMBOL_LEN: usize = 2;
pub const MAX_SYMBOL_LEN: usize = 8;

/// Maximum length of a token name.
pub const MAX_TOKEN_NAME_LEN: usize = 32;

/// A breathe block fires whenever `height / BREATHE_BLOCK_INTERVAL`
/// advances, in addition to the UTC day boundary.
pub const BREATHE_BLOCK_INTERVAL: i64 = 1_000;

/// Good-till-expire orders live this many seconds before a breathe block
/// expires them (72 hours).
pub const ORDER_TTL_SECS: i64 = 259_200;

/// Top-of-book depth included in the publication snapshot, per side.
pub const MAX_ORDER_BOOK_LEVEL: usize = 20;

/// Default bound of the outbound `BlockInfo` publication channel.
pub const PUBLISH_CHANNEL_SIZE: usize = 8;

/// Default bound of the inbound publication-acknowledgement channel.
pub const ACK_CHANNEL_SIZE: usize = 1_024;

/// Default worker count for the per-pair matching fan-out.
pub const DEFAULT_MATCH_CONCURRENCY: usize = 2;

/// Application name, reported in logs and query metadata.
pub const APP_NAME: &str = "blockdex";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
