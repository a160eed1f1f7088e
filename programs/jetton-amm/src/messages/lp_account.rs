use crate::{
    cell::{Builder, Slice},
    constants::op,
    error::CodecError,
    math::Coins,
};

use super::Payload;

/// Messages accepted by an LP account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LpAccountMessage {
    /// Pool stages one or both sides of a deposit.
    AddLiquidity {
        amount0: Coins,
        amount1: Coins,
        min_lp_out: Coins,
    },
    /// Owner spends part of the staged balance explicitly.
    DirectAddLiquidity {
        amount0: Coins,
        amount1: Coins,
        min_lp_out: Coins,
    },
    RefundMe,
    ResetGas,
    GetLpAccountData,
}

impl Payload for LpAccountMessage {
    fn op(&self) -> u32 {
        match self {
            LpAccountMessage::AddLiquidity { .. } => op::ADD_LIQUIDITY,
            LpAccountMessage::DirectAddLiquidity { .. } => op::DIRECT_ADD_LIQUIDITY,
            LpAccountMessage::RefundMe => op::REFUND_ME,
            LpAccountMessage::ResetGas => op::RESET_GAS,
            LpAccountMessage::GetLpAccountData => op::GET_LP_ACCOUNT_DATA,
        }
    }

    fn store_fields(&self, b: &mut Builder) -> Result<(), CodecError> {
        match self {
            LpAccountMessage::AddLiquidity {
                amount0,
                amount1,
                min_lp_out,
            }
            | LpAccountMessage::DirectAddLiquidity {
                amount0,
                amount1,
                min_lp_out,
            } => {
                b.store_coins(*amount0)?
                    .store_coins(*amount1)?
                    .store_coins(*min_lp_out)?;
            }
            LpAccountMessage::RefundMe
            | LpAccountMessage::ResetGas
            | LpAccountMessage::GetLpAccountData => {}
        }
        Ok(())
    }

    fn load_fields(op: u32, s: &mut Slice<'_>) -> Result<Self, CodecError> {
        let msg = match op {
            op::ADD_LIQUIDITY => LpAccountMessage::AddLiquidity {
                amount0: s.load_coins()?,
                amount1: s.load_coins()?,
                min_lp_out: s.load_coins()?,
            },
            op::DIRECT_ADD_LIQUIDITY => LpAccountMessage::DirectAddLiquidity {
                amount0: s.load_coins()?,
                amount1: s.load_coins()?,
                min_lp_out: s.load_coins()?,
            },
            op::REFUND_ME => LpAccountMessage::RefundMe,
            op::RESET_GAS => LpAccountMessage::ResetGas,
            op::GET_LP_ACCOUNT_DATA => LpAccountMessage::GetLpAccountData,
            other => return Err(CodecError::UnknownOp(other)),
        };
        Ok(msg)
    }
}
