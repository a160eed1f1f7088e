use crate::{
    address::Identity,
    cell::{Builder, Cell, Slice},
    constants::op,
    error::CodecError,
    math::Coins,
};

use super::{load_either, Payload};

/// Messages accepted by the Router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterMessage {
    /// A jetton wallet owned by the Router received tokens.
    /// `forward_payload` is parsed separately so a bad payload can be refunded.
    TransferNotification {
        jetton_amount: Coins,
        from_user: Identity,
        forward_payload: Cell,
    },
    /// Pool asks the Router to release tokens from its wallets.
    PayTo {
        owner: Identity,
        exit_code: u32,
        amount_a: Coins,
        wallet_a: Identity,
        amount_b: Coins,
        wallet_b: Identity,
    },
    GetPoolAddress {
        wallet_a: Identity,
        wallet_b: Identity,
    },

    // ── Admin ────────────────────────────────────────────────────────────────
    SetFees {
        lp_fee: u8,
        protocol_fee: u8,
        ref_fee: u8,
        protocol_fee_address: Option<Identity>,
        wallet_a: Identity,
        wallet_b: Identity,
    },
    CollectFees {
        wallet_a: Identity,
        wallet_b: Identity,
    },
    Lock,
    Unlock,
    InitCodeUpgrade {
        code: Cell,
    },
    InitAdminUpgrade {
        admin: Identity,
    },
    CancelCodeUpgrade,
    CancelAdminUpgrade,
    FinalizeUpgrades,
    ResetGas,
    ResetPoolGas {
        wallet_a: Identity,
        wallet_b: Identity,
    },
}

impl Payload for RouterMessage {
    fn op(&self) -> u32 {
        match self {
            RouterMessage::TransferNotification { .. } => op::TRANSFER_NOTIFICATION,
            RouterMessage::PayTo { .. } => op::PAY_TO,
            RouterMessage::GetPoolAddress { .. } => op::GET_POOL_ADDRESS,
            RouterMessage::SetFees { .. } => op::SET_FEES,
            RouterMessage::CollectFees { .. } => op::COLLECT_FEES,
            RouterMessage::Lock => op::LOCK,
            RouterMessage::Unlock => op::UNLOCK,
            RouterMessage::InitCodeUpgrade { .. } => op::INIT_CODE_UPGRADE,
            RouterMessage::InitAdminUpgrade { .. } => op::INIT_ADMIN_UPGRADE,
            RouterMessage::CancelCodeUpgrade => op::CANCEL_CODE_UPGRADE,
            RouterMessage::CancelAdminUpgrade => op::CANCEL_ADMIN_UPGRADE,
            RouterMessage::FinalizeUpgrades => op::FINALIZE_UPGRADES,
            RouterMessage::ResetGas => op::RESET_GAS,
            RouterMessage::ResetPoolGas { .. } => op::RESET_POOL_GAS,
        }
    }

    fn store_fields(&self, b: &mut Builder) -> Result<(), CodecError> {
        match self {
            RouterMessage::TransferNotification {
                jetton_amount,
                from_user,
                forward_payload,
            } => {
                b.store_coins(*jetton_amount)?
                    .store_address(from_user)?
                    .store_bit(true)?
                    .store_ref(forward_payload.clone())?;
            }
            RouterMessage::PayTo {
                owner,
                exit_code,
                amount_a,
                wallet_a,
                amount_b,
                wallet_b,
            } => {
                let mut amounts = Builder::new();
                amounts
                    .store_coins(*amount_a)?
                    .store_address(wallet_a)?
                    .store_coins(*amount_b)?
                    .store_address(wallet_b)?;
                b.store_address(owner)?
                    .store_u32(*exit_code)?
                    .store_ref(amounts.build())?;
            }
            RouterMessage::GetPoolAddress { wallet_a, wallet_b }
            | RouterMessage::CollectFees { wallet_a, wallet_b }
            | RouterMessage::ResetPoolGas { wallet_a, wallet_b } => {
                b.store_address(wallet_a)?.store_address(wallet_b)?;
            }
            RouterMessage::SetFees {
                lp_fee,
                protocol_fee,
                ref_fee,
                protocol_fee_address,
                wallet_a,
                wallet_b,
            } => {
                let mut wallets = Builder::new();
                wallets.store_address(wallet_a)?.store_address(wallet_b)?;
                b.store_u8(*lp_fee)?
                    .store_u8(*protocol_fee)?
                    .store_u8(*ref_fee)?
                    .store_address_opt(protocol_fee_address.as_ref())?
                    .store_ref(wallets.build())?;
            }
            RouterMessage::InitCodeUpgrade { code } => {
                b.store_ref(code.clone())?;
            }
            RouterMessage::InitAdminUpgrade { admin } => {
                b.store_address(admin)?;
            }
            RouterMessage::Lock
            | RouterMessage::Unlock
            | RouterMessage::CancelCodeUpgrade
            | RouterMessage::CancelAdminUpgrade
            | RouterMessage::FinalizeUpgrades
            | RouterMessage::ResetGas => {}
        }
        Ok(())
    }

    fn load_fields(op: u32, s: &mut Slice<'_>) -> Result<Self, CodecError> {
        let msg = match op {
            op::TRANSFER_NOTIFICATION => RouterMessage::TransferNotification {
                jetton_amount: s.load_coins()?,
                from_user: s.load_address()?,
                forward_payload: load_either(s)?,
            },
            op::PAY_TO => {
                let owner = s.load_address()?;
                let exit_code = s.load_u32()?;
                let amounts = s.load_ref()?;
                let mut a = amounts.parse();
                RouterMessage::PayTo {
                    owner,
                    exit_code,
                    amount_a: a.load_coins()?,
                    wallet_a: a.load_address()?,
                    amount_b: a.load_coins()?,
                    wallet_b: a.load_address()?,
                }
            }
            op::GET_POOL_ADDRESS => RouterMessage::GetPoolAddress {
                wallet_a: s.load_address()?,
                wallet_b: s.load_address()?,
            },
            op::SET_FEES => {
                let lp_fee = s.load_u8()?;
                let protocol_fee = s.load_u8()?;
                let ref_fee = s.load_u8()?;
                let protocol_fee_address = s.load_address_opt()?;
                let wallets = s.load_ref()?;
                let mut w = wallets.parse();
                RouterMessage::SetFees {
                    lp_fee,
                    protocol_fee,
                    ref_fee,
                    protocol_fee_address,
                    wallet_a: w.load_address()?,
                    wallet_b: w.load_address()?,
                }
            }
            op::COLLECT_FEES => RouterMessage::CollectFees {
                wallet_a: s.load_address()?,
                wallet_b: s.load_address()?,
            },
            op::LOCK => RouterMessage::Lock,
            op::UNLOCK => RouterMessage::Unlock,
            op::INIT_CODE_UPGRADE => RouterMessage::InitCodeUpgrade { code: s.load_ref()? },
            op::INIT_ADMIN_UPGRADE => RouterMessage::InitAdminUpgrade {
                admin: s.load_address()?,
            },
            op::CANCEL_CODE_UPGRADE => RouterMessage::CancelCodeUpgrade,
            op::CANCEL_ADMIN_UPGRADE => RouterMessage::CancelAdminUpgrade,
            op::FINALIZE_UPGRADES => RouterMessage::FinalizeUpgrades,
            op::RESET_GAS => RouterMessage::ResetGas,
            op::RESET_POOL_GAS => RouterMessage::ResetPoolGas {
                wallet_a: s.load_address()?,
                wallet_b: s.load_address()?,
            },
            other => return Err(CodecError::UnknownOp(other)),
        };
        Ok(msg)
    }
}

/// Instruction a user attaches to a jetton transfer into the Router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JettonPayload {
    Swap {
        /// Router wallet of the token to receive.
        other_wallet: Identity,
        min_out: Coins,
        to_address: Identity,
        referral: Option<Identity>,
    },
    ProvideLiquidity {
        /// Router wallet of the other side of the pair.
        other_wallet: Identity,
        min_lp_out: Coins,
    },
}

impl JettonPayload {
    pub fn other_wallet(&self) -> Identity {
        match self {
            JettonPayload::Swap { other_wallet, .. }
            | JettonPayload::ProvideLiquidity { other_wallet, .. } => *other_wallet,
        }
    }

    pub fn to_cell(&self) -> Result<Cell, CodecError> {
        let mut b = Builder::new();
        match self {
            JettonPayload::Swap {
                other_wallet,
                min_out,
                to_address,
                referral,
            } => {
                b.store_u32(op::SWAP)?
                    .store_address(other_wallet)?
                    .store_coins(*min_out)?
                    .store_address(to_address)?
                    .store_bit(referral.is_some())?;
                if let Some(referral) = referral {
                    b.store_address(referral)?;
                }
            }
            JettonPayload::ProvideLiquidity {
                other_wallet,
                min_lp_out,
            } => {
                b.store_u32(op::PROVIDE_LP)?
                    .store_address(other_wallet)?
                    .store_coins(*min_lp_out)?;
            }
        }
        Ok(b.build())
    }

    pub fn from_cell(cell: &Cell) -> Result<Self, CodecError> {
        let mut s = cell.parse();
        match s.load_u32()? {
            op::SWAP => {
                let other_wallet = s.load_address()?;
                let min_out = s.load_coins()?;
                let to_address = s.load_address()?;
                let referral = if s.load_bit()? {
                    Some(s.load_address()?)
                } else {
                    None
                };
                Ok(JettonPayload::Swap {
                    other_wallet,
                    min_out,
                    to_address,
                    referral,
                })
            }
            op::PROVIDE_LP => Ok(JettonPayload::ProvideLiquidity {
                other_wallet: s.load_address()?,
                min_lp_out: s.load_coins()?,
            }),
            other => Err(CodecError::UnknownOp(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{encode, Envelope};

    fn id(seed: &str) -> Identity {
        Identity::from_seed(seed)
    }

    #[test]
    fn pay_to_keeps_amounts_in_a_child_cell() {
        let msg = RouterMessage::PayTo {
            owner: id("user"),
            exit_code: 7,
            amount_a: 0,
            wallet_a: id("a"),
            amount_b: 19_939,
            wallet_b: id("b"),
        };
        let cell = encode(42, msg.clone()).unwrap();
        assert_eq!(cell.refs().len(), 1);
        let decoded = Envelope::<RouterMessage>::from_cell(&cell).unwrap();
        assert_eq!(decoded.query_id, 42);
        assert_eq!(decoded.payload, msg);
    }

    #[test]
    fn swap_payload_with_and_without_referral() {
        let plain = JettonPayload::Swap {
            other_wallet: id("b"),
            min_out: 1,
            to_address: id("user"),
            referral: None,
        };
        let with_ref = JettonPayload::Swap {
            other_wallet: id("b"),
            min_out: 1,
            to_address: id("user"),
            referral: Some(id("ref")),
        };
        let plain_cell = plain.to_cell().unwrap();
        let ref_cell = with_ref.to_cell().unwrap();
        assert_eq!(ref_cell.bit_len() - plain_cell.bit_len(), 267);
        assert_eq!(JettonPayload::from_cell(&ref_cell).unwrap(), with_ref);
        assert_eq!(JettonPayload::from_cell(&plain_cell).unwrap().other_wallet(), id("b"));
    }

    #[test]
    fn inline_forward_payload_is_accepted() {
        let payload = JettonPayload::ProvideLiquidity {
            other_wallet: id("b"),
            min_lp_out: 5,
        }
        .to_cell()
        .unwrap();
        let mut b = Builder::new();
        b.store_u32(op::TRANSFER_NOTIFICATION)
            .unwrap()
            .store_u64(1)
            .unwrap()
            .store_coins(100)
            .unwrap()
            .store_address(&id("user"))
            .unwrap()
            .store_bit(false)
            .unwrap()
            .store_cell_contents(&payload)
            .unwrap();
        let decoded = Envelope::<RouterMessage>::from_cell(&b.build()).unwrap();
        match decoded.payload {
            RouterMessage::TransferNotification { forward_payload, .. } => {
                assert_eq!(forward_payload, payload)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_op_and_truncation_fail() {
        let unknown = Builder::new().store_u32(0x1234).unwrap().store_u64(0).unwrap().build();
        assert_eq!(
            Envelope::<RouterMessage>::from_cell(&unknown).unwrap_err(),
            CodecError::UnknownOp(0x1234)
        );
        let truncated = Builder::new()
            .store_u32(op::GET_POOL_ADDRESS)
            .unwrap()
            .store_u64(0)
            .unwrap()
            .store_address(&id("a"))
            .unwrap()
            .build();
        assert!(Envelope::<RouterMessage>::from_cell(&truncated).is_err());
    }
}
