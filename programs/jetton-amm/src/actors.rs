//! Message handlers.
//!
//! Each handler sees a read-only snapshot of its actor and returns the next
//! state plus the messages to send. A handler that returns `Err` changes
//! nothing; the ledger then bounces the inbound value if the message allows it.
//!
//! Handlers:
//!   router      : jetton routing, payouts, admin and timelocked upgrades
//!   pool        : swaps, LP mint/burn, fee configuration and collection
//!   lp_account  : two-sided deposit staging, refunds

pub mod lp_account;
pub mod pool;
pub mod router;

use crate::{
    address::{Identity, StateInit},
    cell::Cell,
    config::ProtocolConfig,
    error::{ActorError, Result},
    ledger::InternalMessage,
    math::Coins,
    messages::{encode, Payload},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorKind {
    Router,
    Pool,
    LpAccount,
}

/// What a handler knows about its surroundings.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub now: u64,
    /// Address of the actor handling the message.
    pub address: Identity,
    /// Balance including the value of the inbound message.
    pub balance: Coins,
    pub config: &'a ProtocolConfig,
}

/// Value attached to an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgValue {
    Exact(Coins),
    /// Whatever is left of the inbound value after the earlier `Exact` sends.
    RemainingInbound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub destination: Identity,
    pub value: MsgValue,
    pub bounce: bool,
    pub body: Cell,
    /// Deploys the destination if it does not exist yet.
    pub state_init: Option<StateInit>,
}

impl OutboundMessage {
    pub fn new<P: Payload>(
        destination: Identity,
        value: MsgValue,
        query_id: u64,
        payload: P,
    ) -> Result<Self> {
        Ok(Self {
            destination,
            value,
            bounce: true,
            body: encode(query_id, payload)?,
            state_init: None,
        })
    }

    pub fn with_state_init(mut self, state_init: StateInit) -> Self {
        self.state_init = Some(state_init);
        self
    }

    pub fn non_bounceable(mut self) -> Self {
        self.bounce = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutAction {
    Send(OutboundMessage),
    /// Replace the actor's code once the transaction commits.
    SetCode(Cell),
}

/// Outcome of a successful handler run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition<S> {
    pub state: S,
    pub actions: Vec<OutAction>,
}

impl<S> Transition<S> {
    pub fn unchanged(state: S) -> Self {
        Self {
            state,
            actions: Vec::new(),
        }
    }

    /// Outbound messages in emission order.
    pub fn messages(&self) -> impl Iterator<Item = &OutboundMessage> {
        self.actions.iter().filter_map(|action| match action {
            OutAction::Send(msg) => Some(msg),
            OutAction::SetCode(_) => None,
        })
    }
}

/// A message-driven actor.
pub trait Actor: Clone + Sized {
    const KIND: ActorKind;

    fn receive(&self, ctx: &Context<'_>, msg: &InternalMessage) -> Result<Transition<Self>>;
}

pub(crate) fn require_sender(msg: &InternalMessage, expected: &Identity) -> Result<()> {
    if msg.sender != *expected {
        return Err(ActorError::Unauthorized { sender: msg.sender });
    }
    Ok(())
}

pub(crate) fn require_value(msg: &InternalMessage, required: Coins) -> Result<()> {
    if msg.value < required {
        return Err(ActorError::InsufficientValue {
            attached: msg.value,
            required,
        });
    }
    Ok(())
}

/// Excess above the reserve floor, or an error when there is nothing to sweep.
pub(crate) fn sweepable(ctx: &Context<'_>) -> Result<Coins> {
    match ctx.balance.checked_sub(ctx.config.min_ton_reserve) {
        Some(excess) if excess > 0 => Ok(excess),
        _ => Err(ActorError::InvalidAmount("balance is at or below the reserve floor")),
    }
}
