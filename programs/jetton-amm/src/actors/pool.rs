use tracing::{debug, info, warn};

use crate::{
    actors::{require_sender, require_value, sweepable, Actor, ActorKind, Context, MsgValue, OutAction, OutboundMessage, Transition},
    address::Identity,
    constants::exit_code,
    error::{ActorError, Result},
    ledger::InternalMessage,
    math::{self, Coins, SwapAmounts, MAX_COINS},
    messages::{Envelope, JettonMessage, LpAccountMessage, Payload, PoolMessage, Reply, RouterMessage},
    state::PoolState,
};

struct Call<'a> {
    ctx: &'a Context<'a>,
    msg: &'a InternalMessage,
    query_id: u64,
}

impl Actor for PoolState {
    const KIND: ActorKind = ActorKind::Pool;

    fn receive(&self, ctx: &Context<'_>, msg: &InternalMessage) -> Result<Transition<Self>> {
        if msg.bounced {
            debug!(sender = %msg.sender, "pool: ignoring bounced message");
            return Ok(Transition::unchanged(self.clone()));
        }
        let Envelope { query_id, payload } = Envelope::<PoolMessage>::from_cell(&msg.body)?;
        debug!(
            op = format_args!("{:#010x}", payload.op()),
            query_id,
            sender = %msg.sender,
            "pool: handling message"
        );

        let call = Call { ctx, msg, query_id };
        let mut next = self.clone();
        let actions = match payload {
            PoolMessage::Swap {
                from_user,
                token_wallet,
                jetton_amount,
                min_out,
                to_address,
                referral,
            } => {
                require_sender(msg, &next.router)?;
                next.swap(&call, from_user, token_wallet, jetton_amount, min_out, to_address, referral)?
            }
            PoolMessage::ProvideLiquidity {
                from_user,
                min_lp_out,
                amount0,
                amount1,
            } => {
                require_sender(msg, &next.router)?;
                next.provide_liquidity(&call, from_user, min_lp_out, amount0, amount1)?
            }
            PoolMessage::CbAddLiquidity {
                amount0,
                amount1,
                user,
                min_lp_out,
            } => {
                let lp_account = next.lp_account_address(ctx.address, user)?;
                require_sender(msg, &lp_account)?;
                next.mint(&call, amount0, amount1, user, min_lp_out)?
            }
            PoolMessage::CbRefundMe {
                amount0,
                amount1,
                user,
            } => {
                let lp_account = next.lp_account_address(ctx.address, user)?;
                require_sender(msg, &lp_account)?;
                info!(%user, amount0, amount1, "pool: returning staged liquidity");
                vec![next.pay_to(&call, user, exit_code::REFUND_OK, amount0, amount1, MsgValue::RemainingInbound)?]
            }
            PoolMessage::BurnNotification {
                jetton_amount,
                from_user,
                response_address,
            } => {
                let lp_wallet = next.lp_wallet_address(ctx.address, from_user)?;
                require_sender(msg, &lp_wallet)?;
                next.burn(&call, jetton_amount, from_user, response_address)?
            }
            PoolMessage::SetFees {
                lp_fee,
                protocol_fee,
                ref_fee,
                protocol_fee_address,
            } => {
                require_sender(msg, &next.router)?;
                next.set_fees(&call, lp_fee, protocol_fee, ref_fee, protocol_fee_address)?;
                Vec::new()
            }
            PoolMessage::CollectFees => next.collect_fees(&call)?,
            PoolMessage::ResetGas => {
                require_sender(msg, &next.router)?;
                let excess = sweepable(ctx)?;
                info!(excess, "pool: sweeping excess balance to router");
                vec![OutAction::Send(
                    OutboundMessage::new(next.router, MsgValue::Exact(excess), query_id, JettonMessage::Excesses)?
                        .non_bounceable(),
                )]
            }
            PoolMessage::GetPoolData => vec![reply(&call, next.pool_data())?],
            PoolMessage::GetExpectedOutputs {
                jetton_amount,
                token_wallet,
            } => {
                let quote = next.expected_outputs(ctx.config.fee_divider, jetton_amount, token_wallet)?;
                vec![reply(
                    &call,
                    Reply::ExpectedOutputs {
                        amount_out: quote.amount_out,
                        protocol_fee: quote.protocol_fee,
                        ref_fee: quote.ref_fee,
                    },
                )?]
            }
        };
        Ok(Transition { state: next, actions })
    }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

impl PoolState {
    /// `true` when `wallet` is the token-0 side, error when it is neither side.
    fn side_of(&self, wallet: Identity) -> Result<bool> {
        if wallet == self.wallet0 {
            Ok(true)
        } else if wallet == self.wallet1 {
            Ok(false)
        } else {
            Err(ActorError::WrongWallet { wallet })
        }
    }

    /// Amounts placed in the (token0, token1) slots for a one-sided payout.
    fn slots(sell0: bool, input_side: Coins, output_side: Coins) -> (Coins, Coins) {
        if sell0 {
            (input_side, output_side)
        } else {
            (output_side, input_side)
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn swap(
        &mut self,
        call: &Call<'_>,
        from_user: Identity,
        token_wallet: Identity,
        amount_in: Coins,
        min_out: Coins,
        to_address: Identity,
        referral: Option<Identity>,
    ) -> Result<Vec<OutAction>> {
        let sell0 = self.side_of(token_wallet)?;
        let (reserve_in, reserve_out) = if sell0 {
            (self.reserve0, self.reserve1)
        } else {
            (self.reserve1, self.reserve0)
        };

        let refund = |pool: &PoolState, code: u32| -> Result<Vec<OutAction>> {
            warn!(%from_user, amount_in, exit_code = format_args!("{code:#010x}"), "pool: swap refunded");
            let (amount0, amount1) = Self::slots(sell0, amount_in, 0);
            Ok(vec![pool.pay_to(call, from_user, code, amount0, amount1, MsgValue::RemainingInbound)?])
        };

        if reserve_in == 0 || reserve_out == 0 {
            return refund(self, exit_code::SWAP_REFUND_NO_LIQUIDITY);
        }
        let fees = self.fees(call.ctx.config.fee_divider);
        let Some(quote) = math::compute_swap(amount_in, reserve_in, reserve_out, &fees, referral.is_some()) else {
            return refund(self, exit_code::SWAP_REFUND_RESERVE_ERR);
        };
        if quote.amount_out == 0 || quote.amount_out < min_out {
            return refund(self, exit_code::SWAP_REFUND_SLIPPAGE);
        }
        let new_reserve_in = reserve_in.checked_add(amount_in).filter(|r| *r <= MAX_COINS);
        let collected_out = if sell0 {
            self.collected_token1_protocol_fee
        } else {
            self.collected_token0_protocol_fee
        };
        let new_collected = collected_out
            .checked_add(quote.protocol_fee)
            .filter(|c| *c <= MAX_COINS);
        let (Some(new_reserve_in), Some(new_collected)) = (new_reserve_in, new_collected) else {
            return refund(self, exit_code::SWAP_REFUND_RESERVE_ERR);
        };
        if quote.reserve_out_delta >= reserve_out {
            return refund(self, exit_code::SWAP_REFUND_RESERVE_ERR);
        }
        let new_reserve_out = reserve_out - quote.reserve_out_delta;

        // ── Commit ───────────────────────────────────────────────────────────
        if sell0 {
            self.reserve0 = new_reserve_in;
            self.reserve1 = new_reserve_out;
            self.collected_token1_protocol_fee = new_collected;
        } else {
            self.reserve1 = new_reserve_in;
            self.reserve0 = new_reserve_out;
            self.collected_token0_protocol_fee = new_collected;
        }
        info!(
            amount_in,
            amount_out = quote.amount_out,
            protocol_fee = quote.protocol_fee,
            ref_fee = quote.ref_fee,
            sell0,
            "pool: swap"
        );

        // Referral payout goes first and takes half of the inbound value.
        let mut actions = Vec::with_capacity(2);
        if let Some(referral) = referral.filter(|_| quote.ref_fee > 0) {
            let (amount0, amount1) = Self::slots(sell0, 0, quote.ref_fee);
            let value = MsgValue::Exact(call.msg.value / 2);
            actions.push(self.pay_to(call, referral, exit_code::SWAP_OK_REF, amount0, amount1, value)?);
        }
        let (amount0, amount1) = Self::slots(sell0, 0, quote.amount_out);
        actions.push(self.pay_to(call, to_address, exit_code::SWAP_OK, amount0, amount1, MsgValue::RemainingInbound)?);
        Ok(actions)
    }

    fn provide_liquidity(
        &mut self,
        call: &Call<'_>,
        from_user: Identity,
        min_lp_out: Coins,
        amount0: Coins,
        amount1: Coins,
    ) -> Result<Vec<OutAction>> {
        if amount0 == 0 && amount1 == 0 {
            return Err(ActorError::InvalidAmount("deposit of zero tokens"));
        }
        let account_init = self.lp_account_state_init(call.ctx.address, from_user)?;
        let account = account_init.address()?;
        debug!(%from_user, %account, amount0, amount1, "pool: staging liquidity");
        let out = OutboundMessage::new(
            account,
            MsgValue::RemainingInbound,
            call.query_id,
            LpAccountMessage::AddLiquidity {
                amount0,
                amount1,
                min_lp_out,
            },
        )?
        .with_state_init(account_init);
        Ok(vec![OutAction::Send(out)])
    }

    fn mint(
        &mut self,
        call: &Call<'_>,
        amount0: Coins,
        amount1: Coins,
        user: Identity,
        min_lp_out: Coins,
    ) -> Result<Vec<OutAction>> {
        let minted = math::lp_to_mint(amount0, amount1, self.reserve0, self.reserve1, self.total_supply_lp)
            .filter(|m| *m > 0 && *m >= min_lp_out);
        let reserve0 = self.reserve0.checked_add(amount0).filter(|r| *r <= MAX_COINS);
        let reserve1 = self.reserve1.checked_add(amount1).filter(|r| *r <= MAX_COINS);
        let supply = minted
            .and_then(|m| self.total_supply_lp.checked_add(m))
            .filter(|s| *s <= MAX_COINS);

        let (Some(minted), Some(reserve0), Some(reserve1), Some(supply)) = (minted, reserve0, reserve1, supply) else {
            warn!(%user, amount0, amount1, min_lp_out, "pool: mint rejected, refunding deposit");
            return Ok(vec![self.pay_to(
                call,
                user,
                exit_code::MINT_REFUND,
                amount0,
                amount1,
                MsgValue::RemainingInbound,
            )?]);
        };

        self.reserve0 = reserve0;
        self.reserve1 = reserve1;
        self.total_supply_lp = supply;
        info!(%user, amount0, amount1, minted, supply, "pool: liquidity added");

        let wallet_init = self.lp_wallet_state_init(call.ctx.address, user)?;
        let wallet = wallet_init.address()?;
        let out = OutboundMessage::new(
            wallet,
            MsgValue::RemainingInbound,
            call.query_id,
            JettonMessage::InternalTransfer {
                jetton_amount: minted,
                from: call.ctx.address,
                response_address: Some(user),
                forward_ton_amount: 0,
            },
        )?
        .with_state_init(wallet_init);
        Ok(vec![OutAction::Send(out)])
    }

    fn burn(
        &mut self,
        call: &Call<'_>,
        jetton_amount: Coins,
        from_user: Identity,
        response_address: Option<Identity>,
    ) -> Result<Vec<OutAction>> {
        if jetton_amount == 0 {
            return Err(ActorError::InvalidAmount("burn of zero LP tokens"));
        }
        if jetton_amount > self.total_supply_lp {
            return Err(ActorError::InvalidAmount("burn exceeds LP supply"));
        }
        let (amount0, amount1) =
            math::burn_amounts(jetton_amount, self.reserve0, self.reserve1, self.total_supply_lp)
                .ok_or(ActorError::MathOverflow)?;

        self.reserve0 -= amount0;
        self.reserve1 -= amount1;
        self.total_supply_lp -= jetton_amount;
        info!(%from_user, jetton_amount, amount0, amount1, "pool: liquidity burned");

        let recipient = response_address.unwrap_or(from_user);
        let mut actions = Vec::with_capacity(2);
        let forward = call.ctx.config.burn_forward_value;
        if call.msg.value > forward {
            actions.push(OutAction::Send(
                OutboundMessage::new(
                    recipient,
                    MsgValue::Exact(call.msg.value - forward),
                    call.query_id,
                    JettonMessage::Excesses,
                )?
                .non_bounceable(),
            ));
        }
        actions.push(self.pay_to(call, recipient, exit_code::BURN_OK, amount0, amount1, MsgValue::RemainingInbound)?);
        Ok(actions)
    }

    fn set_fees(
        &mut self,
        call: &Call<'_>,
        lp_fee: u8,
        protocol_fee: u8,
        ref_fee: u8,
        protocol_fee_address: Option<Identity>,
    ) -> Result<()> {
        let config = call.ctx.config;
        let within_cap = [lp_fee, protocol_fee, ref_fee].iter().all(|f| *f <= config.max_fee);
        let total = lp_fee as u32 + protocol_fee as u32 + ref_fee as u32;
        if !within_cap || total > config.fee_divider {
            return Err(ActorError::FeeOutOfRange {
                lp_fee,
                protocol_fee,
                ref_fee,
            });
        }
        self.lp_fee = lp_fee;
        self.protocol_fee = protocol_fee;
        self.ref_fee = ref_fee;
        self.protocol_fee_address = protocol_fee_address;
        info!(lp_fee, protocol_fee, ref_fee, "pool: fees updated");
        Ok(())
    }

    fn collect_fees(&mut self, call: &Call<'_>) -> Result<Vec<OutAction>> {
        let config = call.ctx.config;
        let from_router = call.msg.sender == self.router;
        let required = if from_router {
            config.collect_fees_router_min
        } else {
            config.collect_fees_public_min
        };
        require_value(call.msg, required)?;
        let recipient = self.protocol_fee_address.ok_or(ActorError::FeeAddressUnset)?;
        let (amount0, amount1) = (self.collected_token0_protocol_fee, self.collected_token1_protocol_fee);

        self.collected_token0_protocol_fee = 0;
        self.collected_token1_protocol_fee = 0;
        info!(%recipient, amount0, amount1, from_router, "pool: protocol fees collected");

        if from_router {
            return Ok(vec![self.pay_to(
                call,
                recipient,
                exit_code::COLLECT_FEES_OK,
                amount0,
                amount1,
                MsgValue::RemainingInbound,
            )?]);
        }
        // Public callers keep everything above the router threshold.
        Ok(vec![
            self.pay_to(
                call,
                recipient,
                exit_code::COLLECT_FEES_OK,
                amount0,
                amount1,
                MsgValue::Exact(config.collect_fees_router_min),
            )?,
            OutAction::Send(
                OutboundMessage::new(call.msg.sender, MsgValue::RemainingInbound, call.query_id, JettonMessage::Excesses)?
                    .non_bounceable(),
            ),
        ])
    }

    /// `payTo` through the Router, with amounts in canonical (token0, token1) order.
    fn pay_to(
        &self,
        call: &Call<'_>,
        owner: Identity,
        code: u32,
        amount0: Coins,
        amount1: Coins,
        value: MsgValue,
    ) -> Result<OutAction> {
        let body = RouterMessage::PayTo {
            owner,
            exit_code: code,
            amount_a: amount0,
            wallet_a: self.wallet0,
            amount_b: amount1,
            wallet_b: self.wallet1,
        };
        Ok(OutAction::Send(OutboundMessage::new(self.router, value, call.query_id, body)?))
    }
}

// ─── Getters ─────────────────────────────────────────────────────────────────

impl PoolState {
    /// Quote for selling `amount` through `token_wallet`, without a referral.
    pub fn expected_outputs(&self, divider: u32, amount: Coins, token_wallet: Identity) -> Result<SwapAmounts> {
        let sell0 = self.side_of(token_wallet)?;
        let (reserve_in, reserve_out) = if sell0 {
            (self.reserve0, self.reserve1)
        } else {
            (self.reserve1, self.reserve0)
        };
        if reserve_in == 0 || reserve_out == 0 {
            return Ok(SwapAmounts::default());
        }
        math::compute_swap(amount, reserve_in, reserve_out, &self.fees(divider), false)
            .ok_or(ActorError::MathOverflow)
    }

    /// LP tokens a deposit of `(amount0, amount1)` would mint right now.
    pub fn expected_tokens(&self, amount0: Coins, amount1: Coins) -> Coins {
        math::lp_to_mint(amount0, amount1, self.reserve0, self.reserve1, self.total_supply_lp).unwrap_or(0)
    }

    /// Reserve amounts that burning `jetton_amount` LP tokens would release.
    pub fn expected_liquidity(&self, jetton_amount: Coins) -> (Coins, Coins) {
        math::burn_amounts(jetton_amount, self.reserve0, self.reserve1, self.total_supply_lp).unwrap_or((0, 0))
    }

    pub fn pool_data(&self) -> Reply {
        Reply::PoolData {
            reserve0: self.reserve0,
            reserve1: self.reserve1,
            wallet0: self.wallet0,
            wallet1: self.wallet1,
            lp_fee: self.lp_fee,
            protocol_fee: self.protocol_fee,
            ref_fee: self.ref_fee,
            protocol_fee_address: self.protocol_fee_address,
            collected_token0_protocol_fee: self.collected_token0_protocol_fee,
            collected_token1_protocol_fee: self.collected_token1_protocol_fee,
        }
    }
}

fn reply(call: &Call<'_>, reply: Reply) -> Result<OutAction> {
    let out = OutboundMessage::new(call.msg.sender, MsgValue::RemainingInbound, call.query_id, reply)?
        .non_bounceable();
    Ok(OutAction::Send(out))
}
