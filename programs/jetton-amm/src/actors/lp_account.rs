use tracing::{debug, info};

use crate::{
    actors::{require_sender, require_value, sweepable, Actor, ActorKind, Context, MsgValue, OutAction, OutboundMessage, Transition},
    error::{ActorError, Result},
    ledger::InternalMessage,
    math::{Coins, MAX_COINS},
    messages::{Envelope, JettonMessage, LpAccountMessage, Payload, PoolMessage, Reply},
    state::LpAccountState,
};

impl Actor for LpAccountState {
    const KIND: ActorKind = ActorKind::LpAccount;

    fn receive(&self, ctx: &Context<'_>, msg: &InternalMessage) -> Result<Transition<Self>> {
        if msg.bounced {
            debug!(sender = %msg.sender, "lp account: ignoring bounced message");
            return Ok(Transition::unchanged(self.clone()));
        }
        let Envelope { query_id, payload } = Envelope::<LpAccountMessage>::from_cell(&msg.body)?;
        debug!(
            op = format_args!("{:#010x}", payload.op()),
            query_id,
            sender = %msg.sender,
            "lp account: handling message"
        );

        let mut next = self.clone();
        let mut actions = Vec::new();
        match payload {
            LpAccountMessage::AddLiquidity {
                amount0,
                amount1,
                min_lp_out,
            } => {
                require_sender(msg, &next.pool)?;
                next.stored0 = add_staged(next.stored0, amount0)?;
                next.stored1 = add_staged(next.stored1, amount1)?;
                debug!(stored0 = next.stored0, stored1 = next.stored1, "lp account: staged");

                // Both sides present: hand the pair to the pool exactly once.
                if next.stored0 > 0 && next.stored1 > 0 {
                    let (amount0, amount1) = (next.stored0, next.stored1);
                    next.stored0 = 0;
                    next.stored1 = 0;
                    actions.push(next.callback_add(query_id, amount0, amount1, min_lp_out)?);
                }
            }
            LpAccountMessage::DirectAddLiquidity {
                amount0,
                amount1,
                min_lp_out,
            } => {
                require_sender(msg, &next.user)?;
                require_value(msg, ctx.config.min_forward_value)?;
                if amount0 == 0 || amount1 == 0 {
                    return Err(ActorError::InvalidAmount("direct deposit needs both sides"));
                }
                if amount0 > next.stored0 || amount1 > next.stored1 {
                    return Err(ActorError::InsufficientFunds {
                        available0: next.stored0,
                        available1: next.stored1,
                        requested0: amount0,
                        requested1: amount1,
                    });
                }
                next.stored0 -= amount0;
                next.stored1 -= amount1;
                actions.push(next.callback_add(query_id, amount0, amount1, min_lp_out)?);
            }
            LpAccountMessage::RefundMe => {
                require_sender(msg, &next.user)?;
                require_value(msg, ctx.config.min_forward_value)?;
                if next.stored0 == 0 && next.stored1 == 0 {
                    return Err(ActorError::InvalidAmount("nothing staged to refund"));
                }
                let body = PoolMessage::CbRefundMe {
                    amount0: next.stored0,
                    amount1: next.stored1,
                    user: next.user,
                };
                info!(user = %next.user, stored0 = next.stored0, stored1 = next.stored1, "lp account: refund requested");
                next.stored0 = 0;
                next.stored1 = 0;
                actions.push(OutAction::Send(OutboundMessage::new(
                    next.pool,
                    MsgValue::RemainingInbound,
                    query_id,
                    body,
                )?));
            }
            LpAccountMessage::ResetGas => {
                require_sender(msg, &next.user)?;
                let excess = sweepable(ctx)?;
                actions.push(OutAction::Send(
                    OutboundMessage::new(next.user, MsgValue::Exact(excess), query_id, JettonMessage::Excesses)?
                        .non_bounceable(),
                ));
            }
            LpAccountMessage::GetLpAccountData => {
                actions.push(OutAction::Send(
                    OutboundMessage::new(msg.sender, MsgValue::RemainingInbound, query_id, next.data())?
                        .non_bounceable(),
                ));
            }
        }
        Ok(Transition { state: next, actions })
    }
}

impl LpAccountState {
    pub fn data(&self) -> Reply {
        Reply::LpAccountData {
            user: self.user,
            pool: self.pool,
            amount0: self.stored0,
            amount1: self.stored1,
        }
    }

    fn callback_add(&self, query_id: u64, amount0: Coins, amount1: Coins, min_lp_out: Coins) -> Result<OutAction> {
        info!(user = %self.user, amount0, amount1, min_lp_out, "lp account: forwarding deposit to pool");
        let body = PoolMessage::CbAddLiquidity {
            amount0,
            amount1,
            user: self.user,
            min_lp_out,
        };
        Ok(OutAction::Send(OutboundMessage::new(
            self.pool,
            MsgValue::RemainingInbound,
            query_id,
            body,
        )?))
    }
}

fn add_staged(stored: Coins, amount: Coins) -> Result<Coins> {
    stored
        .checked_add(amount)
        .filter(|total| *total <= MAX_COINS)
        .ok_or(ActorError::MathOverflow)
}
