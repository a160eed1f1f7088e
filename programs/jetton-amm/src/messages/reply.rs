//! Answers to query messages. Each reply reuses the opcode of its query.

use crate::{
    address::Identity,
    cell::{Builder, Slice},
    constants::op,
    error::CodecError,
    math::Coins,
};

use super::Payload;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    PoolAddress {
        address: Identity,
    },
    PoolData {
        reserve0: Coins,
        reserve1: Coins,
        wallet0: Identity,
        wallet1: Identity,
        lp_fee: u8,
        protocol_fee: u8,
        ref_fee: u8,
        protocol_fee_address: Option<Identity>,
        collected_token0_protocol_fee: Coins,
        collected_token1_protocol_fee: Coins,
    },
    ExpectedOutputs {
        amount_out: Coins,
        protocol_fee: Coins,
        ref_fee: Coins,
    },
    LpAccountData {
        user: Identity,
        pool: Identity,
        amount0: Coins,
        amount1: Coins,
    },
}

impl Payload for Reply {
    fn op(&self) -> u32 {
        match self {
            Reply::PoolAddress { .. } => op::GET_POOL_ADDRESS,
            Reply::PoolData { .. } => op::GET_POOL_DATA,
            Reply::ExpectedOutputs { .. } => op::GET_EXPECTED_OUTPUTS,
            Reply::LpAccountData { .. } => op::GET_LP_ACCOUNT_DATA,
        }
    }

    fn store_fields(&self, b: &mut Builder) -> Result<(), CodecError> {
        match self {
            Reply::PoolAddress { address } => {
                b.store_address(address)?;
            }
            Reply::PoolData {
                reserve0,
                reserve1,
                wallet0,
                wallet1,
                lp_fee,
                protocol_fee,
                ref_fee,
                protocol_fee_address,
                collected_token0_protocol_fee,
                collected_token1_protocol_fee,
            } => {
                let mut fees = Builder::new();
                fees.store_u8(*lp_fee)?
                    .store_u8(*protocol_fee)?
                    .store_u8(*ref_fee)?
                    .store_address_opt(protocol_fee_address.as_ref())?
                    .store_coins(*collected_token0_protocol_fee)?
                    .store_coins(*collected_token1_protocol_fee)?;
                b.store_coins(*reserve0)?
                    .store_coins(*reserve1)?
                    .store_address(wallet0)?
                    .store_address(wallet1)?
                    .store_ref(fees.build())?;
            }
            Reply::ExpectedOutputs {
                amount_out,
                protocol_fee,
                ref_fee,
            } => {
                b.store_coins(*amount_out)?
                    .store_coins(*protocol_fee)?
                    .store_coins(*ref_fee)?;
            }
            Reply::LpAccountData {
                user,
                pool,
                amount0,
                amount1,
            } => {
                b.store_address(user)?
                    .store_address(pool)?
                    .store_coins(*amount0)?
                    .store_coins(*amount1)?;
            }
        }
        Ok(())
    }

    fn load_fields(op: u32, s: &mut Slice<'_>) -> Result<Self, CodecError> {
        let reply = match op {
            op::GET_POOL_ADDRESS => Reply::PoolAddress {
                address: s.load_address()?,
            },
            op::GET_POOL_DATA => {
                let reserve0 = s.load_coins()?;
                let reserve1 = s.load_coins()?;
                let wallet0 = s.load_address()?;
                let wallet1 = s.load_address()?;
                let fees = s.load_ref()?;
                let mut f = fees.parse();
                Reply::PoolData {
                    reserve0,
                    reserve1,
                    wallet0,
                    wallet1,
                    lp_fee: f.load_u8()?,
                    protocol_fee: f.load_u8()?,
                    ref_fee: f.load_u8()?,
                    protocol_fee_address: f.load_address_opt()?,
                    collected_token0_protocol_fee: f.load_coins()?,
                    collected_token1_protocol_fee: f.load_coins()?,
                }
            }
            op::GET_EXPECTED_OUTPUTS => Reply::ExpectedOutputs {
                amount_out: s.load_coins()?,
                protocol_fee: s.load_coins()?,
                ref_fee: s.load_coins()?,
            },
            op::GET_LP_ACCOUNT_DATA => Reply::LpAccountData {
                user: s.load_address()?,
                pool: s.load_address()?,
                amount0: s.load_coins()?,
                amount1: s.load_coins()?,
            },
            other => return Err(CodecError::UnknownOp(other)),
        };
        Ok(reply)
    }
}
