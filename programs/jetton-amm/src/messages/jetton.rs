//! Jetton-standard messages the protocol sends to token wallets.

use crate::{
    address::Identity,
    cell::{Builder, Cell, Slice},
    constants::op,
    error::CodecError,
    math::Coins,
};

use super::{load_either, Payload};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JettonMessage {
    /// Ask a wallet we own to move tokens to `destination`.
    /// The forward payload is written inline, so its last bits end the body.
    Transfer {
        jetton_amount: Coins,
        destination: Identity,
        response_destination: Option<Identity>,
        forward_ton_amount: Coins,
        forward_payload: Cell,
    },
    /// Mint: credit `jetton_amount` to the receiving wallet.
    InternalTransfer {
        jetton_amount: Coins,
        from: Identity,
        response_address: Option<Identity>,
        forward_ton_amount: Coins,
    },
    /// Return of surplus value.
    Excesses,
}

impl JettonMessage {
    /// Transfer whose forward payload is just a 32-bit outcome code.
    pub fn transfer_with_code(
        jetton_amount: Coins,
        destination: Identity,
        code: u32,
    ) -> Result<Self, CodecError> {
        let mut payload = Builder::new();
        payload.store_u32(code)?;
        Ok(JettonMessage::Transfer {
            jetton_amount,
            destination,
            response_destination: Some(destination),
            forward_ton_amount: 0,
            forward_payload: payload.build(),
        })
    }
}

impl Payload for JettonMessage {
    fn op(&self) -> u32 {
        match self {
            JettonMessage::Transfer { .. } => op::TRANSFER,
            JettonMessage::InternalTransfer { .. } => op::INTERNAL_TRANSFER,
            JettonMessage::Excesses => op::EXCESSES,
        }
    }

    fn store_fields(&self, b: &mut Builder) -> Result<(), CodecError> {
        match self {
            JettonMessage::Transfer {
                jetton_amount,
                destination,
                response_destination,
                forward_ton_amount,
                forward_payload,
            } => {
                b.store_coins(*jetton_amount)?
                    .store_address(destination)?
                    .store_address_opt(response_destination.as_ref())?
                    .store_maybe_ref(None)?
                    .store_coins(*forward_ton_amount)?
                    .store_bit(false)?
                    .store_cell_contents(forward_payload)?;
            }
            JettonMessage::InternalTransfer {
                jetton_amount,
                from,
                response_address,
                forward_ton_amount,
            } => {
                b.store_coins(*jetton_amount)?
                    .store_address(from)?
                    .store_address_opt(response_address.as_ref())?
                    .store_coins(*forward_ton_amount)?
                    .store_bit(false)?;
            }
            JettonMessage::Excesses => {}
        }
        Ok(())
    }

    fn load_fields(op: u32, s: &mut Slice<'_>) -> Result<Self, CodecError> {
        let msg = match op {
            op::TRANSFER => {
                let jetton_amount = s.load_coins()?;
                let destination = s.load_address()?;
                let response_destination = s.load_address_opt()?;
                // Custom payloads are accepted and dropped.
                s.load_maybe_ref()?;
                JettonMessage::Transfer {
                    jetton_amount,
                    destination,
                    response_destination,
                    forward_ton_amount: s.load_coins()?,
                    forward_payload: load_either(s)?,
                }
            }
            op::INTERNAL_TRANSFER => {
                let msg = JettonMessage::InternalTransfer {
                    jetton_amount: s.load_coins()?,
                    from: s.load_address()?,
                    response_address: s.load_address_opt()?,
                    forward_ton_amount: s.load_coins()?,
                };
                load_either(s)?;
                msg
            }
            op::EXCESSES => JettonMessage::Excesses,
            other => return Err(CodecError::UnknownOp(other)),
        };
        Ok(msg)
    }
}
