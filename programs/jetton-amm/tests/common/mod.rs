#![allow(dead_code)]

use jetton_amm::{
    actors::{Context, MsgValue, OutAction, OutboundMessage, Transition},
    constants::ONE_TON,
    ledger::ActorState,
    messages::{Envelope, Payload},
    Builder, Cell, Identity, InternalMessage, Ledger, PoolState, ProtocolConfig, RouterState,
};

pub const NOW: u64 = 1_700_000_000;

pub fn code(tag: u32) -> Cell {
    Builder::new().store_u32(tag).unwrap().build()
}

pub fn pool_code() -> Cell {
    code(0x9001)
}

pub fn lp_wallet_code() -> Cell {
    code(0x9002)
}

pub fn lp_account_code() -> Cell {
    code(0x9003)
}

pub fn router_code() -> Cell {
    code(0x9000)
}

pub fn id(seed: &str) -> Identity {
    Identity::from_seed(seed)
}

pub fn ctx(config: &ProtocolConfig, address: Identity, balance: u128) -> Context<'_> {
    Context {
        now: NOW,
        address,
        balance,
        config,
    }
}

pub fn msg<P: Payload>(sender: Identity, destination: Identity, value: u128, payload: P) -> InternalMessage {
    InternalMessage::new(sender, destination, value, 0, payload).unwrap()
}

pub fn sends<S>(transition: &Transition<S>) -> Vec<&OutboundMessage> {
    transition.messages().collect()
}

pub fn decode<P: Payload>(out: &OutboundMessage) -> P {
    Envelope::<P>::from_cell(&out.body).unwrap().payload
}

pub fn exact(out: &OutboundMessage) -> u128 {
    match out.value {
        MsgValue::Exact(v) => v,
        MsgValue::RemainingInbound => panic!("expected an exact value"),
    }
}

pub fn set_code_count<S>(transition: &Transition<S>) -> usize {
    transition
        .actions
        .iter()
        .filter(|a| matches!(a, OutAction::SetCode(_)))
        .count()
}

pub fn router_state() -> RouterState {
    RouterState::new(id("admin"), pool_code(), lp_wallet_code(), lp_account_code())
}

/// Router state plus the address it would be deployed at.
pub fn router() -> (RouterState, Identity) {
    let state = router_state();
    let address = jetton_amm::StateInit::new(router_code(), state.to_cell().unwrap())
        .address()
        .unwrap();
    (state, address)
}

/// Router-owned jetton wallets in canonical order.
pub fn wallets() -> (Identity, Identity) {
    jetton_amm::address::sort_pair(id("router wallet A"), id("router wallet B"))
}

/// Pool for `wallets()` behind `router()`, plus its address.
pub fn pool() -> (PoolState, Identity) {
    let (router_state, router_address) = router();
    let (w0, w1) = wallets();
    let init = router_state.pool_state_init(router_address, w0, w1).unwrap();
    let state = PoolState::from_cell(&init.data).unwrap();
    (state, init.address().unwrap())
}

/// Ledger with a deployed router and the pool / LP-account codes registered.
pub fn ledger() -> (Ledger, Identity) {
    let mut ledger = Ledger::new(ProtocolConfig::default());
    ledger.set_now(NOW);
    let router = ledger
        .deploy(router_code(), ActorState::Router(router_state()), ONE_TON)
        .unwrap();
    ledger.register_code(jetton_amm::ActorKind::Pool, &pool_code());
    ledger.register_code(jetton_amm::ActorKind::LpAccount, &lp_account_code());
    (ledger, router)
}
