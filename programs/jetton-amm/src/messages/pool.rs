use crate::{
    address::Identity,
    cell::{Builder, Slice},
    constants::op,
    error::CodecError,
    math::Coins,
};

use super::Payload;

/// Messages accepted by a Pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolMessage {
    // ── From the Router ──────────────────────────────────────────────────────
    Swap {
        from_user: Identity,
        /// Router wallet that received the input tokens.
        token_wallet: Identity,
        jetton_amount: Coins,
        min_out: Coins,
        to_address: Identity,
        referral: Option<Identity>,
    },
    ProvideLiquidity {
        from_user: Identity,
        min_lp_out: Coins,
        amount0: Coins,
        amount1: Coins,
    },
    SetFees {
        lp_fee: u8,
        protocol_fee: u8,
        ref_fee: u8,
        protocol_fee_address: Option<Identity>,
    },
    ResetGas,

    // ── From an LP account ───────────────────────────────────────────────────
    CbAddLiquidity {
        amount0: Coins,
        amount1: Coins,
        user: Identity,
        min_lp_out: Coins,
    },
    CbRefundMe {
        amount0: Coins,
        amount1: Coins,
        user: Identity,
    },

    // ── From an LP wallet ────────────────────────────────────────────────────
    BurnNotification {
        jetton_amount: Coins,
        from_user: Identity,
        response_address: Option<Identity>,
    },

    // ── From anyone ──────────────────────────────────────────────────────────
    CollectFees,
    GetPoolData,
    GetExpectedOutputs {
        jetton_amount: Coins,
        token_wallet: Identity,
    },
}

impl Payload for PoolMessage {
    fn op(&self) -> u32 {
        match self {
            PoolMessage::Swap { .. } => op::SWAP,
            PoolMessage::ProvideLiquidity { .. } => op::PROVIDE_LP,
            PoolMessage::SetFees { .. } => op::SET_FEES,
            PoolMessage::ResetGas => op::RESET_GAS,
            PoolMessage::CbAddLiquidity { .. } => op::CB_ADD_LIQUIDITY,
            PoolMessage::CbRefundMe { .. } => op::CB_REFUND_ME,
            PoolMessage::BurnNotification { .. } => op::BURN_NOTIFICATION,
            PoolMessage::CollectFees => op::COLLECT_FEES,
            PoolMessage::GetPoolData => op::GET_POOL_DATA,
            PoolMessage::GetExpectedOutputs { .. } => op::GET_EXPECTED_OUTPUTS,
        }
    }

    fn store_fields(&self, b: &mut Builder) -> Result<(), CodecError> {
        match self {
            PoolMessage::Swap {
                from_user,
                token_wallet,
                jetton_amount,
                min_out,
                to_address,
                referral,
            } => {
                let mut route = Builder::new();
                route
                    .store_address(to_address)?
                    .store_address_opt(referral.as_ref())?;
                b.store_address(from_user)?
                    .store_address(token_wallet)?
                    .store_coins(*jetton_amount)?
                    .store_coins(*min_out)?
                    .store_bit(referral.is_some())?
                    .store_maybe_ref(Some(route.build()))?;
            }
            PoolMessage::ProvideLiquidity {
                from_user,
                min_lp_out,
                amount0,
                amount1,
            } => {
                b.store_address(from_user)?
                    .store_coins(*min_lp_out)?
                    .store_coins(*amount0)?
                    .store_coins(*amount1)?;
            }
            PoolMessage::SetFees {
                lp_fee,
                protocol_fee,
                ref_fee,
                protocol_fee_address,
            } => {
                b.store_u8(*lp_fee)?
                    .store_u8(*protocol_fee)?
                    .store_u8(*ref_fee)?
                    .store_address_opt(protocol_fee_address.as_ref())?;
            }
            PoolMessage::CbAddLiquidity {
                amount0,
                amount1,
                user,
                min_lp_out,
            } => {
                b.store_coins(*amount0)?
                    .store_coins(*amount1)?
                    .store_address(user)?
                    .store_coins(*min_lp_out)?;
            }
            PoolMessage::CbRefundMe {
                amount0,
                amount1,
                user,
            } => {
                b.store_coins(*amount0)?
                    .store_coins(*amount1)?
                    .store_address(user)?;
            }
            PoolMessage::BurnNotification {
                jetton_amount,
                from_user,
                response_address,
            } => {
                b.store_coins(*jetton_amount)?
                    .store_address(from_user)?
                    .store_address_opt(response_address.as_ref())?;
            }
            PoolMessage::GetExpectedOutputs {
                jetton_amount,
                token_wallet,
            } => {
                b.store_coins(*jetton_amount)?.store_address(token_wallet)?;
            }
            PoolMessage::ResetGas | PoolMessage::CollectFees | PoolMessage::GetPoolData => {}
        }
        Ok(())
    }

    fn load_fields(op: u32, s: &mut Slice<'_>) -> Result<Self, CodecError> {
        let msg = match op {
            op::SWAP => {
                let from_user = s.load_address()?;
                let token_wallet = s.load_address()?;
                let jetton_amount = s.load_coins()?;
                let min_out = s.load_coins()?;
                let has_ref = s.load_bit()?;
                let route = s.load_maybe_ref()?.ok_or(CodecError::MissingRef)?;
                let mut r = route.parse();
                let to_address = r.load_address()?;
                let referral = r.load_address_opt()?;
                PoolMessage::Swap {
                    from_user,
                    token_wallet,
                    jetton_amount,
                    min_out,
                    to_address,
                    referral: if has_ref { referral } else { None },
                }
            }
            op::PROVIDE_LP => PoolMessage::ProvideLiquidity {
                from_user: s.load_address()?,
                min_lp_out: s.load_coins()?,
                amount0: s.load_coins()?,
                amount1: s.load_coins()?,
            },
            op::SET_FEES => PoolMessage::SetFees {
                lp_fee: s.load_u8()?,
                protocol_fee: s.load_u8()?,
                ref_fee: s.load_u8()?,
                protocol_fee_address: s.load_address_opt()?,
            },
            op::RESET_GAS => PoolMessage::ResetGas,
            op::CB_ADD_LIQUIDITY => PoolMessage::CbAddLiquidity {
                amount0: s.load_coins()?,
                amount1: s.load_coins()?,
                user: s.load_address()?,
                min_lp_out: s.load_coins()?,
            },
            op::CB_REFUND_ME => PoolMessage::CbRefundMe {
                amount0: s.load_coins()?,
                amount1: s.load_coins()?,
                user: s.load_address()?,
            },
            op::BURN_NOTIFICATION => PoolMessage::BurnNotification {
                jetton_amount: s.load_coins()?,
                from_user: s.load_address()?,
                response_address: s.load_address_opt()?,
            },
            op::COLLECT_FEES => PoolMessage::CollectFees,
            op::GET_POOL_DATA => PoolMessage::GetPoolData,
            op::GET_EXPECTED_OUTPUTS => PoolMessage::GetExpectedOutputs {
                jetton_amount: s.load_coins()?,
                token_wallet: s.load_address()?,
            },
            other => return Err(CodecError::UnknownOp(other)),
        };
        Ok(msg)
    }
}
