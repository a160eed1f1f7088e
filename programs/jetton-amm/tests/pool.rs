mod common;

use common::*;
use jetton_amm::{
    actors::{Actor, MsgValue, OutAction},
    constants::{exit_code, ONE_TON},
    messages::{JettonMessage, LpAccountMessage, PoolMessage, Reply, RouterMessage},
    ActorError, Identity, InternalMessage, PoolState, ProtocolConfig,
};

fn swap(from: Identity, pool: Identity, wallet: Identity, amount: u128, min_out: u128, referral: Option<Identity>) -> InternalMessage {
    msg(
        from,
        pool,
        ONE_TON,
        PoolMessage::Swap {
            from_user: id("user"),
            token_wallet: wallet,
            jetton_amount: amount,
            min_out,
            to_address: id("user"),
            referral,
        },
    )
}

fn funded_pool(reserve: u128, lp_fee: u8, ref_fee: u8) -> (PoolState, Identity) {
    let (mut state, addr) = pool();
    state.reserve0 = reserve;
    state.reserve1 = reserve;
    state.total_supply_lp = reserve;
    state.lp_fee = lp_fee;
    state.ref_fee = ref_fee;
    (state, addr)
}

fn pay_to(out: &jetton_amm::OutboundMessage) -> (Identity, u32, u128, u128) {
    match decode::<RouterMessage>(out) {
        RouterMessage::PayTo {
            owner,
            exit_code,
            amount_a,
            amount_b,
            ..
        } => (owner, exit_code, amount_a, amount_b),
        other => panic!("expected payTo, got {other:?}"),
    }
}

#[test]
fn swap_only_from_router() {
    let config = ProtocolConfig::default();
    let (state, addr) = funded_pool(10u128.pow(15), 100, 10);
    let (w0, _) = wallets();

    let err = state
        .receive(&ctx(&config, addr, ONE_TON), &swap(id("mallory"), addr, w0, 1_000, 0, None))
        .unwrap_err();
    assert_eq!(err, ActorError::Unauthorized { sender: id("mallory") });
}

#[test]
fn swap_through_foreign_wallet_fails() {
    let config = ProtocolConfig::default();
    let (state, addr) = funded_pool(10u128.pow(15), 100, 10);
    let router = state.router;

    let err = state
        .receive(&ctx(&config, addr, ONE_TON), &swap(router, addr, id("stranger"), 1_000, 0, None))
        .unwrap_err();
    assert_eq!(err, ActorError::WrongWallet { wallet: id("stranger") });
    assert_eq!(err.exit_code(), 1008);
}

#[test]
fn empty_pool_refunds_swap() {
    let config = ProtocolConfig::default();
    let (state, addr) = pool();
    let (_, w1) = wallets();

    let t = state
        .receive(&ctx(&config, addr, ONE_TON), &swap(state.router, addr, w1, 500, 0, None))
        .unwrap();
    let out = sends(&t);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].destination, state.router);
    assert_eq!(pay_to(out[0]), (id("user"), exit_code::SWAP_REFUND_NO_LIQUIDITY, 0, 500));
    assert_eq!(t.state, state);
}

#[test]
fn swap_pays_constant_product_output() {
    let config = ProtocolConfig::default();
    let reserve = 10u128.pow(15);
    let (state, addr) = funded_pool(reserve, 100, 10);
    let (w0, _) = wallets();

    let t = state
        .receive(
            &ctx(&config, addr, ONE_TON),
            &swap(state.router, addr, w0, 20_000_000_000, 1, None),
        )
        .unwrap();
    let out = sends(&t);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].value, MsgValue::RemainingInbound);
    assert_eq!(pay_to(out[0]), (id("user"), exit_code::SWAP_OK, 0, 19_799_607_967));
    assert_eq!(t.state.reserve0, reserve + 20_000_000_000);
    assert_eq!(t.state.reserve1, reserve - 19_799_607_967);
    assert_eq!(t.state.total_supply_lp, reserve);
}

#[test]
fn referral_is_paid_first_in_output_token() {
    let config = ProtocolConfig::default();
    let reserve = 10u128.pow(33);
    let (state, addr) = funded_pool(reserve, 20, 10);
    let (_, w1) = wallets();

    let t = state
        .receive(
            &ctx(&config, addr, ONE_TON),
            &swap(state.router, addr, w1, 20_000, 0, Some(id("referrer"))),
        )
        .unwrap();
    let out = sends(&t);
    assert_eq!(out.len(), 2);
    assert_eq!(pay_to(out[0]), (id("referrer"), exit_code::SWAP_OK_REF, 20, 0));
    assert_eq!(out[0].value, MsgValue::Exact(ONE_TON / 2));
    assert_eq!(pay_to(out[1]), (id("user"), exit_code::SWAP_OK, 19_939, 0));
    assert_eq!(out[1].value, MsgValue::RemainingInbound);
    assert_eq!(t.state.reserve1, reserve + 20_000);
    assert_eq!(t.state.reserve0, reserve - 19_959);
}

#[test]
fn selling_token1_pays_out_token0() {
    let config = ProtocolConfig::default();
    let reserve = 10u128.pow(15);
    let (state, addr) = funded_pool(reserve, 100, 10);
    let (_, w1) = wallets();

    let t = state
        .receive(
            &ctx(&config, addr, ONE_TON),
            &swap(state.router, addr, w1, 20_000_000_000, 1, None),
        )
        .unwrap();
    assert_eq!(pay_to(sends(&t)[0]), (id("user"), exit_code::SWAP_OK, 19_799_607_967, 0));
    assert_eq!(t.state.reserve1, reserve + 20_000_000_000);
}

#[test]
fn slippage_guard_refunds_and_keeps_reserves() {
    let config = ProtocolConfig::default();
    let (state, addr) = funded_pool(10u128.pow(15), 100, 10);
    let (w0, _) = wallets();

    let t = state
        .receive(
            &ctx(&config, addr, ONE_TON),
            &swap(state.router, addr, w0, 20_000_000_000, 19_799_607_968, None),
        )
        .unwrap();
    assert_eq!(pay_to(sends(&t)[0]), (id("user"), exit_code::SWAP_REFUND_SLIPPAGE, 20_000_000_000, 0));
    assert_eq!(t.state, state);

    // Dust that rounds to nothing is refunded too.
    let t = state
        .receive(&ctx(&config, addr, ONE_TON), &swap(state.router, addr, w0, 1, 0, None))
        .unwrap();
    assert_eq!(pay_to(sends(&t)[0]).1, exit_code::SWAP_REFUND_SLIPPAGE);
}

#[test]
fn fees_that_swallow_the_output_refund_without_referral_payout() {
    let config = ProtocolConfig::default();
    let (mut state, addr) = funded_pool(10u128.pow(12), 20, 10);
    state.protocol_fee = 10;
    let (w0, _) = wallets();

    let t = state
        .receive(
            &ctx(&config, addr, ONE_TON),
            &swap(state.router, addr, w0, 3, 0, Some(id("referrer"))),
        )
        .unwrap();
    let out = sends(&t);
    assert_eq!(out.len(), 1);
    assert_eq!(pay_to(out[0]), (id("user"), exit_code::SWAP_REFUND_SLIPPAGE, 3, 0));
    assert_eq!(t.state, state);
}

#[test]
fn protocol_fee_accrues_in_output_token() {
    let config = ProtocolConfig::default();
    let reserve = 10u128.pow(12);
    let (mut state, addr) = funded_pool(reserve, 20, 0);
    state.protocol_fee = 10;
    let (w0, w1) = wallets();

    let t = state
        .receive(&ctx(&config, addr, ONE_TON), &swap(state.router, addr, w0, 1_000_000, 0, None))
        .unwrap();
    assert_eq!(pay_to(sends(&t)[0]), (id("user"), exit_code::SWAP_OK, 0, 997_001));
    assert_eq!(t.state.collected_token1_protocol_fee, 998);
    assert_eq!(t.state.collected_token0_protocol_fee, 0);
    assert_eq!(t.state.reserve0, reserve + 1_000_000);
    assert_eq!(t.state.reserve1, reserve - 997_999);

    let t = t
        .state
        .receive(&ctx(&config, addr, ONE_TON), &swap(state.router, addr, w1, 1_000_000, 0, None))
        .unwrap();
    assert_eq!(pay_to(sends(&t)[0]), (id("user"), exit_code::SWAP_OK, 997_002, 0));
    assert_eq!(t.state.collected_token0_protocol_fee, 998);
    assert_eq!(t.state.collected_token1_protocol_fee, 998);
}

#[test]
fn referral_and_protocol_fee_both_come_from_output() {
    let config = ProtocolConfig::default();
    let reserve = 10u128.pow(12);
    let (mut state, addr) = funded_pool(reserve, 20, 10);
    state.protocol_fee = 10;
    let (w0, _) = wallets();

    let t = state
        .receive(
            &ctx(&config, addr, ONE_TON),
            &swap(state.router, addr, w0, 1_000_000, 0, Some(id("referrer"))),
        )
        .unwrap();
    let out = sends(&t);
    assert_eq!(pay_to(out[0]), (id("referrer"), exit_code::SWAP_OK_REF, 0, 998));
    assert_eq!(pay_to(out[1]), (id("user"), exit_code::SWAP_OK, 0, 996_003));
    assert_eq!(t.state.collected_token1_protocol_fee, 998);
    // Output reserve gives up payout plus both slices.
    assert_eq!(t.state.reserve1, reserve - (996_003 + 998 + 998));
}

#[test]
fn provide_is_staged_in_lp_account() {
    let config = ProtocolConfig::default();
    let (state, addr) = pool();
    let account = state.lp_account_address(addr, id("user")).unwrap();

    let t = state
        .receive(
            &ctx(&config, addr, ONE_TON),
            &msg(
                state.router,
                addr,
                ONE_TON,
                PoolMessage::ProvideLiquidity {
                    from_user: id("user"),
                    min_lp_out: 1,
                    amount0: 1_000_001,
                    amount1: 0,
                },
            ),
        )
        .unwrap();
    let out = sends(&t);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].destination, account);
    assert!(out[0].state_init.is_some());
    assert_eq!(
        decode::<LpAccountMessage>(out[0]),
        LpAccountMessage::AddLiquidity {
            amount0: 1_000_001,
            amount1: 0,
            min_lp_out: 1,
        }
    );
    assert_eq!(t.state, state);
}

#[test]
fn first_deposit_mints_geometric_mean() {
    let config = ProtocolConfig::default();
    let (state, addr) = pool();
    let account = state.lp_account_address(addr, id("user")).unwrap();
    let lp_wallet = state.lp_wallet_address(addr, id("user")).unwrap();

    let t = state
        .receive(
            &ctx(&config, addr, ONE_TON),
            &msg(
                account,
                addr,
                ONE_TON,
                PoolMessage::CbAddLiquidity {
                    amount0: 1_000_001,
                    amount1: 100_000_001,
                    user: id("user"),
                    min_lp_out: 1,
                },
            ),
        )
        .unwrap();
    let out = sends(&t);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].destination, lp_wallet);
    assert!(out[0].state_init.is_some());
    assert_eq!(
        decode::<JettonMessage>(out[0]),
        JettonMessage::InternalTransfer {
            jetton_amount: 10_000_005,
            from: addr,
            response_address: Some(id("user")),
            forward_ton_amount: 0,
        }
    );
    assert_eq!(t.state.total_supply_lp, 10_000_005);
    assert_eq!((t.state.reserve0, t.state.reserve1), (1_000_001, 100_000_001));
}

#[test]
fn mint_below_minimum_is_refunded() {
    let config = ProtocolConfig::default();
    let (state, addr) = pool();
    let account = state.lp_account_address(addr, id("user")).unwrap();

    let t = state
        .receive(
            &ctx(&config, addr, ONE_TON),
            &msg(
                account,
                addr,
                ONE_TON,
                PoolMessage::CbAddLiquidity {
                    amount0: 4,
                    amount1: 9,
                    user: id("user"),
                    min_lp_out: 7,
                },
            ),
        )
        .unwrap();
    assert_eq!(pay_to(sends(&t)[0]), (id("user"), exit_code::MINT_REFUND, 4, 9));
    assert_eq!(t.state, state);
}

#[test]
fn mint_callback_from_stranger_is_rejected() {
    let config = ProtocolConfig::default();
    let (state, addr) = pool();

    let err = state
        .receive(
            &ctx(&config, addr, ONE_TON),
            &msg(
                id("user"),
                addr,
                ONE_TON,
                PoolMessage::CbAddLiquidity {
                    amount0: 4,
                    amount1: 9,
                    user: id("user"),
                    min_lp_out: 0,
                },
            ),
        )
        .unwrap_err();
    assert_eq!(err.exit_code(), 1001);
}

fn burn_fixture() -> (PoolState, Identity) {
    let (mut state, addr) = pool();
    state.reserve0 = 10_000;
    state.reserve1 = 204_030_300;
    state.total_supply_lp = 1_000;
    (state, addr)
}

fn burn(state: &PoolState, addr: Identity, amount: u128) -> InternalMessage {
    let lp_wallet = state.lp_wallet_address(addr, id("user")).unwrap();
    msg(
        lp_wallet,
        addr,
        ONE_TON,
        PoolMessage::BurnNotification {
            jetton_amount: amount,
            from_user: id("user"),
            response_address: None,
        },
    )
}

#[test]
fn burn_returns_proportional_reserves() {
    let config = ProtocolConfig::default();
    let (state, addr) = burn_fixture();

    let t = state.receive(&ctx(&config, addr, ONE_TON), &burn(&state, addr, 100)).unwrap();
    let out = sends(&t);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].destination, id("user"));
    assert_eq!(exact(out[0]), ONE_TON - config.burn_forward_value);
    assert_eq!(decode::<JettonMessage>(out[0]), JettonMessage::Excesses);
    assert_eq!(out[1].destination, state.router);
    assert_eq!(pay_to(out[1]), (id("user"), exit_code::BURN_OK, 1_000, 20_403_030));

    assert_eq!(t.state.reserve0, 9_000);
    assert_eq!(t.state.reserve1, 183_627_270);
    assert_eq!(t.state.total_supply_lp, 900);
}

#[test]
fn burn_rejects_zero_and_excess() {
    let config = ProtocolConfig::default();
    let (state, addr) = burn_fixture();

    for amount in [0, 1_001] {
        let err = state
            .receive(&ctx(&config, addr, ONE_TON), &burn(&state, addr, amount))
            .unwrap_err();
        assert!(matches!(err, ActorError::InvalidAmount(_)));
    }

    let mut forged = burn(&state, addr, 100);
    forged.sender = id("user");
    let err = state.receive(&ctx(&config, addr, ONE_TON), &forged).unwrap_err();
    assert_eq!(err, ActorError::Unauthorized { sender: id("user") });
}

#[test]
fn set_fees_validates_bounds() {
    let config = ProtocolConfig::default();
    let (state, addr) = pool();
    let set = |lp, protocol, referral| {
        msg(
            state.router,
            addr,
            ONE_TON,
            PoolMessage::SetFees {
                lp_fee: lp,
                protocol_fee: protocol,
                ref_fee: referral,
                protocol_fee_address: Some(id("treasury")),
            },
        )
    };

    let t = state.receive(&ctx(&config, addr, ONE_TON), &set(20, 10, 10)).unwrap();
    assert!(t.actions.is_empty());
    assert_eq!((t.state.lp_fee, t.state.protocol_fee, t.state.ref_fee), (20, 10, 10));
    assert_eq!(t.state.protocol_fee_address, Some(id("treasury")));

    let err = state.receive(&ctx(&config, addr, ONE_TON), &set(101, 0, 0)).unwrap_err();
    assert_eq!(
        err,
        ActorError::FeeOutOfRange {
            lp_fee: 101,
            protocol_fee: 0,
            ref_fee: 0
        }
    );
}

fn with_fees(state: &PoolState) -> PoolState {
    let mut state = state.clone();
    state.collected_token0_protocol_fee = 300;
    state.collected_token1_protocol_fee = 700;
    state.protocol_fee_address = Some(id("treasury"));
    state
}

#[test]
fn router_collect_fees_sends_one_payout() {
    let config = ProtocolConfig::default();
    let (state, addr) = pool();
    let state = with_fees(&state);

    let t = state
        .receive(
            &ctx(&config, addr, ONE_TON),
            &msg(state.router, addr, 3 * ONE_TON / 10, PoolMessage::CollectFees),
        )
        .unwrap();
    let out = sends(&t);
    assert_eq!(out.len(), 1);
    assert_eq!(pay_to(out[0]), (id("treasury"), exit_code::COLLECT_FEES_OK, 300, 700));
    assert_eq!(t.state.collected_token0_protocol_fee, 0);
    assert_eq!(t.state.collected_token1_protocol_fee, 0);
}

#[test]
fn public_collect_fees_needs_more_value_and_returns_excess() {
    let config = ProtocolConfig::default();
    let (state, addr) = pool();
    let state = with_fees(&state);

    let err = state
        .receive(&ctx(&config, addr, ONE_TON), &msg(id("anyone"), addr, ONE_TON, PoolMessage::CollectFees))
        .unwrap_err();
    assert!(matches!(err, ActorError::InsufficientValue { .. }));

    let t = state
        .receive(
            &ctx(&config, addr, 2 * ONE_TON),
            &msg(id("anyone"), addr, 11 * ONE_TON / 10, PoolMessage::CollectFees),
        )
        .unwrap();
    let out = sends(&t);
    assert_eq!(out.len(), 2);
    assert_eq!(exact(out[0]), config.collect_fees_router_min);
    assert_eq!(out[1].destination, id("anyone"));
    assert_eq!(out[1].value, MsgValue::RemainingInbound);
    assert!(!out[1].bounce);
}

#[test]
fn collect_fees_needs_address() {
    let config = ProtocolConfig::default();
    let (state, addr) = pool();
    let collect = msg(state.router, addr, ONE_TON, PoolMessage::CollectFees);

    let mut unset = with_fees(&state);
    unset.protocol_fee_address = None;
    let err = unset.receive(&ctx(&config, addr, ONE_TON), &collect).unwrap_err();
    assert_eq!(err, ActorError::FeeAddressUnset);

    let mut empty = with_fees(&state);
    empty.collected_token0_protocol_fee = 0;
    empty.collected_token1_protocol_fee = 0;
    let t = empty.receive(&ctx(&config, addr, ONE_TON), &collect).unwrap();
    let out = sends(&t);
    assert_eq!(out.len(), 1);
    assert_eq!(pay_to(out[0]), (id("treasury"), exit_code::COLLECT_FEES_OK, 0, 0));
    assert_eq!(t.state, empty);
}

#[test]
fn getters_reply_to_sender() {
    let config = ProtocolConfig::default();
    let (state, addr) = funded_pool(10u128.pow(15), 100, 10);
    let (w0, _) = wallets();

    let t = state
        .receive(&ctx(&config, addr, ONE_TON), &msg(id("anyone"), addr, ONE_TON, PoolMessage::GetPoolData))
        .unwrap();
    let out = sends(&t);
    assert_eq!(out[0].destination, id("anyone"));
    assert_eq!(decode::<Reply>(out[0]), state.pool_data());

    let t = state
        .receive(
            &ctx(&config, addr, ONE_TON),
            &msg(
                id("anyone"),
                addr,
                ONE_TON,
                PoolMessage::GetExpectedOutputs {
                    jetton_amount: 20_000_000_000,
                    token_wallet: w0,
                },
            ),
        )
        .unwrap();
    assert_eq!(
        decode::<Reply>(sends(&t)[0]),
        Reply::ExpectedOutputs {
            amount_out: 19_799_607_967,
            protocol_fee: 0,
            ref_fee: 0,
        }
    );
    assert_eq!(t.state, state);
}

#[test]
fn offchain_quotes() {
    let (state, _) = burn_fixture();
    assert_eq!(state.expected_liquidity(100), (1_000, 20_403_030));
    assert_eq!(state.expected_tokens(1_000, 20_403_030), 100);

    let (empty, _) = pool();
    let (w0, _) = wallets();
    assert_eq!(empty.expected_outputs(10_000, 1_000, w0).unwrap().amount_out, 0);
    assert_eq!(empty.expected_tokens(4, 9), 6);
}

#[test]
fn reset_gas_and_refund_callback() {
    let config = ProtocolConfig::default();
    let (state, addr) = pool();

    let t = state
        .receive(&ctx(&config, addr, 3 * ONE_TON), &msg(state.router, addr, 0, PoolMessage::ResetGas))
        .unwrap();
    let out = sends(&t);
    assert_eq!(out[0].destination, state.router);
    assert_eq!(exact(out[0]), 2 * ONE_TON);

    let account = state.lp_account_address(addr, id("user")).unwrap();
    let t = state
        .receive(
            &ctx(&config, addr, ONE_TON),
            &msg(
                account,
                addr,
                ONE_TON,
                PoolMessage::CbRefundMe {
                    amount0: 5,
                    amount1: 0,
                    user: id("user"),
                },
            ),
        )
        .unwrap();
    assert_eq!(pay_to(sends(&t)[0]), (id("user"), exit_code::REFUND_OK, 5, 0));
    assert!(matches!(t.actions[0], OutAction::Send(_)));
}
