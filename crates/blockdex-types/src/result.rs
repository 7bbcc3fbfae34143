//! Structured results returned across the consensus-driver interface.

use serde::{Deserialize, Serialize};

use crate::error::ExchangeError;
use crate::ids::Address;

/// A key/value pair attached to a transaction or block result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The structured result of a check- or deliver-mode transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResult {
    /// 0 on success, otherwise a stable [`ExchangeError`] code.
    pub code: u32,
    pub data: Vec<u8>,
    pub log: String,
    pub tags: Vec<Tag>,
}

impl TxResult {
    #[must_use]
    pub fn ok() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_log(log: impl Into<String>) -> Self {
        Self {
            log: log.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

impl From<&ExchangeError> for TxResult {
    fn from(err: &ExchangeError) -> Self {
        Self {
            code: err.code(),
            data: Vec::new(),
            log: err.to_string(),
            tags: Vec::new(),
        }
    }
}

/// A validator power change handed back to the consensus driver.
///
/// Validator rotation lives in the external staking module; the exchange
/// subsystem always reports an empty update set but the interface carries it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorUpdate {
    pub address: Address,
    pub power: i64,
}

/// The result of EndBlock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndBlockResult {
    pub validator_updates: Vec<ValidatorUpdate>,
    pub tags: Vec<Tag>,
}
