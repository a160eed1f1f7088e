use tracing::{debug, info, warn};

use crate::{
    actors::{require_sender, sweepable, Actor, ActorKind, Context, MsgValue, OutAction, OutboundMessage, Transition},
    address::{sort_pair, Identity},
    cell::Cell,
    constants::exit_code,
    error::{ActorError, Result},
    ledger::InternalMessage,
    math::Coins,
    messages::{Envelope, JettonMessage, JettonPayload, Payload, PoolMessage, Reply, RouterMessage},
    state::{Pending, RouterState},
};

/// Inbound message plus the parsed header.
struct Call<'a> {
    ctx: &'a Context<'a>,
    msg: &'a InternalMessage,
    query_id: u64,
}

impl Actor for RouterState {
    const KIND: ActorKind = ActorKind::Router;

    fn receive(&self, ctx: &Context<'_>, msg: &InternalMessage) -> Result<Transition<Self>> {
        if msg.bounced {
            debug!(sender = %msg.sender, "router: ignoring bounced message");
            return Ok(Transition::unchanged(self.clone()));
        }
        let Envelope { query_id, payload } = Envelope::<RouterMessage>::from_cell(&msg.body)?;
        debug!(
            op = format_args!("{:#010x}", payload.op()),
            query_id,
            sender = %msg.sender,
            "router: handling message"
        );

        let call = Call { ctx, msg, query_id };
        let mut next = self.clone();
        let actions = match payload {
            RouterMessage::TransferNotification {
                jetton_amount,
                from_user,
                forward_payload,
            } => next.route_jettons(&call, jetton_amount, from_user, &forward_payload)?,
            RouterMessage::PayTo {
                owner,
                exit_code,
                amount_a,
                wallet_a,
                amount_b,
                wallet_b,
            } => next.pay_to(&call, owner, exit_code, (amount_a, wallet_a), (amount_b, wallet_b))?,
            RouterMessage::GetPoolAddress { wallet_a, wallet_b } => {
                let address = next.pool_address(ctx.address, wallet_a, wallet_b)?;
                vec![reply(&call, Reply::PoolAddress { address })?]
            }
            admin_op => {
                if msg.sender != next.admin {
                    return Err(ActorError::AdminOnly {
                        sender: msg.sender,
                        op: admin_op.op(),
                    });
                }
                next.admin_op(&call, admin_op)?
            }
        };
        Ok(Transition { state: next, actions })
    }
}

impl RouterState {
    /// Turn an incoming jetton transfer into a pool swap or deposit, or refund it.
    fn route_jettons(
        &self,
        call: &Call<'_>,
        jetton_amount: Coins,
        from_user: Identity,
        forward_payload: &Cell,
    ) -> Result<Vec<OutAction>> {
        let wallet = call.msg.sender;

        let payload = match JettonPayload::from_cell(forward_payload) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%wallet, %from_user, error = %err, "router: unreadable transfer payload, refunding");
                return refund(call, jetton_amount, from_user, exit_code::TRANSFER_BOUNCE_INVALID_REQUEST);
            }
        };
        if self.is_locked {
            warn!(%wallet, %from_user, jetton_amount, "router: trading locked, refunding");
            return refund(call, jetton_amount, from_user, exit_code::TRANSFER_BOUNCE_LOCKED);
        }
        let other_wallet = payload.other_wallet();
        if other_wallet == wallet {
            warn!(%wallet, "router: pair of identical wallets, refunding");
            return refund(call, jetton_amount, from_user, exit_code::TRANSFER_BOUNCE_INVALID_REQUEST);
        }

        let pool_init = self.pool_state_init(call.ctx.address, wallet, other_wallet)?;
        let pool = pool_init.address()?;
        let forward = match payload {
            JettonPayload::Swap {
                min_out,
                to_address,
                referral,
                ..
            } => PoolMessage::Swap {
                from_user,
                token_wallet: wallet,
                jetton_amount,
                min_out,
                to_address,
                referral,
            },
            JettonPayload::ProvideLiquidity { min_lp_out, .. } => {
                let (wallet0, _) = sort_pair(wallet, other_wallet);
                let (amount0, amount1) = if wallet == wallet0 {
                    (jetton_amount, 0)
                } else {
                    (0, jetton_amount)
                };
                PoolMessage::ProvideLiquidity {
                    from_user,
                    min_lp_out,
                    amount0,
                    amount1,
                }
            }
        };
        debug!(%pool, %from_user, jetton_amount, "router: forwarding to pool");
        let out = OutboundMessage::new(pool, MsgValue::RemainingInbound, call.query_id, forward)?
            .with_state_init(pool_init);
        Ok(vec![OutAction::Send(out)])
    }

    /// Release tokens on behalf of the pool that owns `wallet_a`/`wallet_b`.
    fn pay_to(
        &self,
        call: &Call<'_>,
        owner: Identity,
        code: u32,
        leg_a: (Coins, Identity),
        leg_b: (Coins, Identity),
    ) -> Result<Vec<OutAction>> {
        let pool = self.pool_address(call.ctx.address, leg_a.1, leg_b.1)?;
        require_sender(call.msg, &pool)?;

        let legs: Vec<(Coins, Identity)> = [leg_a, leg_b]
            .into_iter()
            .filter(|(amount, _)| *amount > 0)
            .collect();
        info!(%pool, %owner, exit_code = format_args!("{code:#010x}"), amount_a = leg_a.0, amount_b = leg_b.0, "router: pay out");

        if legs.is_empty() {
            let out = OutboundMessage::new(owner, MsgValue::RemainingInbound, call.query_id, JettonMessage::Excesses)?
                .non_bounceable();
            return Ok(vec![OutAction::Send(out)]);
        }

        let split = legs.len() > 1;
        let mut actions = Vec::with_capacity(legs.len());
        for (i, (amount, wallet)) in legs.into_iter().enumerate() {
            let value = if split && i == 0 {
                MsgValue::Exact(call.msg.value / 2)
            } else {
                MsgValue::RemainingInbound
            };
            let transfer = JettonMessage::transfer_with_code(amount, owner, code)?;
            actions.push(OutAction::Send(OutboundMessage::new(wallet, value, call.query_id, transfer)?));
        }
        Ok(actions)
    }

    fn admin_op(&mut self, call: &Call<'_>, op: RouterMessage) -> Result<Vec<OutAction>> {
        let now = call.ctx.now;
        let delay = call.ctx.config.upgrade_delay;
        let mut actions = Vec::new();

        match op {
            RouterMessage::SetFees {
                lp_fee,
                protocol_fee,
                ref_fee,
                protocol_fee_address,
                wallet_a,
                wallet_b,
            } => {
                let pool_init = self.pool_state_init(call.ctx.address, wallet_a, wallet_b)?;
                let pool = pool_init.address()?;
                let forward = PoolMessage::SetFees {
                    lp_fee,
                    protocol_fee,
                    ref_fee,
                    protocol_fee_address,
                };
                actions.push(OutAction::Send(
                    OutboundMessage::new(pool, MsgValue::RemainingInbound, call.query_id, forward)?
                        .with_state_init(pool_init),
                ));
            }
            RouterMessage::CollectFees { wallet_a, wallet_b } => {
                let pool = self.pool_address(call.ctx.address, wallet_a, wallet_b)?;
                actions.push(OutAction::Send(OutboundMessage::new(
                    pool,
                    MsgValue::RemainingInbound,
                    call.query_id,
                    PoolMessage::CollectFees,
                )?));
            }
            RouterMessage::ResetPoolGas { wallet_a, wallet_b } => {
                let pool = self.pool_address(call.ctx.address, wallet_a, wallet_b)?;
                actions.push(OutAction::Send(OutboundMessage::new(
                    pool,
                    MsgValue::RemainingInbound,
                    call.query_id,
                    PoolMessage::ResetGas,
                )?));
            }
            RouterMessage::Lock => {
                info!("router: trading locked");
                self.is_locked = true;
            }
            RouterMessage::Unlock => {
                info!("router: trading unlocked");
                self.is_locked = false;
            }
            RouterMessage::InitCodeUpgrade { code } => {
                let deadline = now.saturating_add(delay);
                info!(deadline, "router: code upgrade proposed");
                self.pending_code = Some(Pending { value: code, deadline });
            }
            RouterMessage::InitAdminUpgrade { admin } => {
                let deadline = now.saturating_add(delay);
                info!(%admin, deadline, "router: admin change proposed");
                self.pending_admin = Some(Pending { value: admin, deadline });
            }
            RouterMessage::CancelCodeUpgrade => {
                info!("router: code upgrade cancelled");
                self.pending_code = None;
            }
            RouterMessage::CancelAdminUpgrade => {
                info!("router: admin change cancelled");
                self.pending_admin = None;
            }
            RouterMessage::FinalizeUpgrades => {
                if self.pending_code.as_ref().is_some_and(|p| p.is_due(now)) {
                    if let Some(pending) = self.pending_code.take() {
                        info!("router: code upgrade applied");
                        actions.push(OutAction::SetCode(pending.value));
                    }
                }
                if self.pending_admin.as_ref().is_some_and(|p| p.is_due(now)) {
                    if let Some(pending) = self.pending_admin.take() {
                        info!(admin = %pending.value, "router: admin changed");
                        self.admin = pending.value;
                    }
                }
                if self.pending_code.is_some() || self.pending_admin.is_some() {
                    debug!(now, "router: upgrades still waiting for their timelock");
                }
            }
            RouterMessage::ResetGas => {
                let excess = sweepable(call.ctx)?;
                info!(excess, "router: sweeping excess balance to admin");
                actions.push(OutAction::Send(
                    OutboundMessage::new(self.admin, MsgValue::Exact(excess), call.query_id, JettonMessage::Excesses)?
                        .non_bounceable(),
                ));
            }
            RouterMessage::TransferNotification { .. }
            | RouterMessage::PayTo { .. }
            | RouterMessage::GetPoolAddress { .. } => {}
        }
        Ok(actions)
    }
}

/// Send the jettons back through the wallet they arrived in, tagged with `code`.
fn refund(call: &Call<'_>, jetton_amount: Coins, from_user: Identity, code: u32) -> Result<Vec<OutAction>> {
    let transfer = JettonMessage::transfer_with_code(jetton_amount, from_user, code)?;
    let out = OutboundMessage::new(call.msg.sender, MsgValue::RemainingInbound, call.query_id, transfer)?;
    Ok(vec![OutAction::Send(out)])
}

fn reply(call: &Call<'_>, reply: Reply) -> Result<OutAction> {
    let out = OutboundMessage::new(call.msg.sender, MsgValue::RemainingInbound, call.query_id, reply)?
        .non_bounceable();
    Ok(OutAction::Send(out))
}
