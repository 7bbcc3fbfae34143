//! Node and consensus-parameter configuration.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Node-local base configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseConfig {
    /// Fixed worker count for the per-pair matching fan-out.
    pub matching_concurrency: usize,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            matching_concurrency: constants::DEFAULT_MATCH_CONCURRENCY,
        }
    }
}

/// Publication pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicationConfig {
    pub enabled: bool,
    /// Blocks below this height are executed without publication.
    pub from_height_inclusive: i64,
    pub publish_channel_size: usize,
    pub ack_channel_size: usize,
}

impl Default for PublicationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            from_height_inclusive: 1,
            publish_channel_size: constants::PUBLISH_CHANNEL_SIZE,
            ack_channel_size: constants::ACK_CHANNEL_SIZE,
        }
    }
}

impl PublicationConfig {
    #[must_use]
    pub fn should_publish(&self, height: i64) -> bool {
        self.enabled && height >= self.from_height_inclusive
    }
}

/// Consensus fee parameters, part of the genesis document. Flat message
/// fees are denominated in the native token; the trade fee is a rate in
/// basis points applied by the standard fee schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeParams {
    pub new_order_fee: i64,
    pub cancel_fee: i64,
    pub issue_fee: i64,
    pub mint_fee: i64,
    pub freeze_fee: i64,
    pub list_fee: i64,
    pub trade_fee_bps: i64,
}

impl FeeParams {
    /// Look up the flat fee for a message route.
    #[must_use]
    pub fn fee_for_route(&self, route: &str) -> i64 {
        match route {
            "dexNewOrder" => self.new_order_fee,
            "dexCancelOrder" => self.cancel_fee,
            "tokensIssue" => self.issue_fee,
            "tokensMint" => self.mint_fee,
            "tokensFreeze" | "tokensUnfreeze" => self.freeze_fee,
            "dexList" => self.list_fee,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publication_gating() {
        let cfg = PublicationConfig {
            enabled: true,
            from_height_inclusive: 10,
            ..PublicationConfig::default()
        };
        assert!(!cfg.should_publish(9));
        assert!(cfg.should_publish(10));

        let off = PublicationConfig::default();
        assert!(!off.should_publish(100));
    }

    #[test]
    fn fee_lookup_by_route() {
        let fees = FeeParams {
            new_order_fee: 5,
            issue_fee: 400,
            ..FeeParams::default()
        };
        assert_eq!(fees.fee_for_route("dexNewOrder"), 5);
        assert_eq!(fees.fee_for_route("tokensIssue"), 400);
        assert_eq!(fees.fee_for_route("unknown"), 0);
    }
}
