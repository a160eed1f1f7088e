//! Protocol-wide tunables shared by every actor on a ledger.

use serde::{Deserialize, Serialize};

use crate::{
    constants::{FEE_DIVIDER, MAX_FEE, ONE_TON, UPGRADE_DELAY},
    error::ConfigError,
    math::Coins,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Denominator of every fee component.
    pub fee_divider: u32,
    /// Ceiling for each of lp / protocol / referral fee.
    pub max_fee: u8,
    /// Seconds between proposing and finalizing a governance change.
    pub upgrade_delay: u64,
    /// Balance every actor keeps when sweeping excess value.
    pub min_ton_reserve: Coins,
    /// Value a Router-relayed `collectFees` must carry.
    pub collect_fees_router_min: Coins,
    /// Value a public `collectFees` must carry; the surplus goes back to the caller.
    pub collect_fees_public_min: Coins,
    /// Value an LP account needs to forward a direct deposit or a refund.
    pub min_forward_value: Coins,
    /// Value a burn keeps for the payout leg.
    pub burn_forward_value: Coins,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            fee_divider: FEE_DIVIDER,
            max_fee: MAX_FEE,
            upgrade_delay: UPGRADE_DELAY,
            min_ton_reserve: ONE_TON,
            collect_fees_router_min: 300_000_000,
            collect_fees_public_min: 1_100_000_000,
            min_forward_value: 300_000_000,
            burn_forward_value: 300_000_000,
        }
    }
}

impl ProtocolConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fee_divider == 0 {
            return Err(ConfigError::ZeroDivider);
        }
        if 3 * self.max_fee as u32 > self.fee_divider {
            return Err(ConfigError::MaxFeeTooHigh {
                max_fee: self.max_fee,
                divider: self.fee_divider,
            });
        }
        if self.collect_fees_public_min < self.collect_fees_router_min {
            return Err(ConfigError::CollectThresholds {
                public: self.collect_fees_public_min,
                router: self.collect_fees_router_min,
            });
        }
        Ok(())
    }
}
