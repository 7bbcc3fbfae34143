//! The genesis document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use blockdex_types::{Address, Coin, FeeParams, Token, Tx};

/// One genesis account: an initial balance plus an optional validator
/// operator address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub address: Address,
    #[serde(default)]
    pub coins: Vec<Coin>,
    #[serde(default)]
    pub val_addr: Option<Address>,
}

/// The chain's genesis document.
///
/// `stake_data` and `gov_data` belong to the external staking and
/// governance modules and pass through this subsystem untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genesis {
    pub genesis_time: DateTime<Utc>,
    pub accounts: Vec<GenesisAccount>,
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub stake_data: Option<serde_json::Value>,
    #[serde(default)]
    pub gov_data: Option<serde_json::Value>,
    #[serde(default)]
    pub param_genesis: FeeParams,
    #[serde(default)]
    pub gen_txs: Vec<Tx>,
}

impl Genesis {
    /// Parse the genesis JSON. A parse failure is fatal to the node.
    pub fn from_json(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }
}
