//! In-memory ledger that runs the actors.
//!
//! Accounts are keyed by [`Identity`]. Each holds code, a TON balance and typed
//! state. Delivery is FIFO and one message at a time:
//!
//! 1. Deploy the destination from the message's state-init if it does not exist
//!    yet and the code is registered.
//! 2. Credit the inbound value, then run the handler (compute phase).
//! 3. Value every outbound message against the balance (action phase).
//! 4. Commit state, balance and code, and enqueue the outbound messages.
//!
//! A failure in phase 2 or 3 leaves the state untouched. A bounceable message
//! then travels back to its sender with `0xffffffff` prepended to the body.
//! Destinations without actor code (jetton wallets, users) collect messages in
//! an inbox.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, trace, warn};

use crate::{
    actors::{Actor, ActorKind, Context, MsgValue, OutAction, Transition},
    address::{Identity, StateInit},
    cell::{Builder, Cell},
    config::ProtocolConfig,
    constants::{BOUNCE_PREFIX, MAX_LEDGER_STEPS},
    error::{ActorError, CodecError, LedgerError},
    math::Coins,
    messages::{encode, peek_op, Envelope, Payload},
    state::{LpAccountState, PoolState, RouterState},
};

/// Exit code of an action phase that ran out of balance.
pub const EXIT_NOT_ENOUGH_BALANCE: u32 = 37;

/// A message in flight between two identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalMessage {
    pub sender: Identity,
    pub destination: Identity,
    pub value: Coins,
    pub bounce: bool,
    pub bounced: bool,
    pub body: Cell,
    pub state_init: Option<StateInit>,
}

impl InternalMessage {
    /// Bounceable message with an encoded body.
    pub fn new<P: Payload>(
        sender: Identity,
        destination: Identity,
        value: Coins,
        query_id: u64,
        payload: P,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            sender,
            destination,
            value,
            bounce: true,
            bounced: false,
            body: encode(query_id, payload)?,
            state_init: None,
        })
    }

    pub fn with_state_init(mut self, state_init: StateInit) -> Self {
        self.state_init = Some(state_init);
        self
    }

    pub fn op(&self) -> Option<u32> {
        peek_op(&self.body)
    }

    /// Decode the body as `P`. Bounced bodies do not decode.
    pub fn decode<P: Payload>(&self) -> Result<Envelope<P>, CodecError> {
        Envelope::from_cell(&self.body)
    }

    fn bounce_back(&self) -> Self {
        let mut body = Builder::new();
        // A u32 always fits in an empty builder.
        if body.store_u32(BOUNCE_PREFIX).is_ok() {
            body.store_truncated(&self.body);
        }
        Self {
            sender: self.destination,
            destination: self.sender,
            value: self.value,
            bounce: false,
            bounced: true,
            body: body.build(),
            state_init: None,
        }
    }
}

/// Typed state of a deployed actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActorState {
    Router(RouterState),
    Pool(PoolState),
    LpAccount(LpAccountState),
}

impl ActorState {
    pub fn kind(&self) -> ActorKind {
        match self {
            ActorState::Router(_) => ActorKind::Router,
            ActorState::Pool(_) => ActorKind::Pool,
            ActorState::LpAccount(_) => ActorKind::LpAccount,
        }
    }

    pub fn from_data(kind: ActorKind, data: &Cell) -> Result<Self, CodecError> {
        Ok(match kind {
            ActorKind::Router => ActorState::Router(RouterState::from_cell(data)?),
            ActorKind::Pool => ActorState::Pool(PoolState::from_cell(data)?),
            ActorKind::LpAccount => ActorState::LpAccount(LpAccountState::from_cell(data)?),
        })
    }

    pub fn to_cell(&self) -> Result<Cell, CodecError> {
        match self {
            ActorState::Router(s) => s.to_cell(),
            ActorState::Pool(s) => s.to_cell(),
            ActorState::LpAccount(s) => s.to_cell(),
        }
    }

    fn receive(&self, ctx: &Context<'_>, msg: &InternalMessage) -> Result<(ActorState, Vec<OutAction>), ActorError> {
        match self {
            ActorState::Router(s) => step(s, ctx, msg, ActorState::Router),
            ActorState::Pool(s) => step(s, ctx, msg, ActorState::Pool),
            ActorState::LpAccount(s) => step(s, ctx, msg, ActorState::LpAccount),
        }
    }
}

fn step<A: Actor>(
    actor: &A,
    ctx: &Context<'_>,
    msg: &InternalMessage,
    wrap: fn(A) -> ActorState,
) -> Result<(ActorState, Vec<OutAction>), ActorError> {
    let Transition { state, actions } = actor.receive(ctx, msg)?;
    Ok((wrap(state), actions))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub code: Cell,
    pub balance: Coins,
    pub state: ActorState,
}

/// What happened to one delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    /// Handler succeeded; `messages` outbound messages were queued.
    Committed { messages: usize, code_replaced: bool },
    /// Handler or action phase failed; nothing changed.
    Failed { exit_code: u32, reason: String, bounced: bool },
    /// Destination has no actor code; the message sits in its inbox.
    Delivered,
}

/// Receipt for one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Logical time: position in the global delivery order.
    pub lt: u64,
    pub account: Identity,
    pub sender: Identity,
    pub op: Option<u32>,
    pub value: Coins,
    pub deployed: bool,
    pub outcome: TxOutcome,
}

impl Transaction {
    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, TxOutcome::Failed { .. })
    }

    pub fn exit_code(&self) -> Option<u32> {
        match &self.outcome {
            TxOutcome::Failed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Ledger {
    config: ProtocolConfig,
    now: u64,
    lt: u64,
    codes: HashMap<[u8; 32], ActorKind>,
    accounts: HashMap<Identity, Account>,
    inboxes: HashMap<Identity, Vec<InternalMessage>>,
    queue: VecDeque<InternalMessage>,
}

impl Ledger {
    pub fn new(config: ProtocolConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn set_now(&mut self, now: u64) {
        self.now = now;
    }

    pub fn advance(&mut self, seconds: u64) {
        self.now = self.now.saturating_add(seconds);
    }

    /// Messages carrying a state-init with this code deploy an actor of `kind`.
    pub fn register_code(&mut self, kind: ActorKind, code: &Cell) {
        self.codes.insert(code.hash(), kind);
    }

    /// Deploy an actor directly at the address derived from its code and state.
    pub fn deploy(&mut self, code: Cell, state: ActorState, balance: Coins) -> Result<Identity, LedgerError> {
        let address = StateInit::new(code.clone(), state.to_cell()?).address()?;
        if self.accounts.contains_key(&address) {
            return Err(LedgerError::AlreadyDeployed(address));
        }
        self.register_code(state.kind(), &code);
        debug!(%address, kind = ?state.kind(), "ledger: deployed");
        self.accounts.insert(address, Account { code, balance, state });
        Ok(address)
    }

    pub fn account(&self, id: &Identity) -> Option<&Account> {
        self.accounts.get(id)
    }

    pub fn router(&self, id: &Identity) -> Option<&RouterState> {
        match &self.accounts.get(id)?.state {
            ActorState::Router(s) => Some(s),
            _ => None,
        }
    }

    pub fn pool(&self, id: &Identity) -> Option<&PoolState> {
        match &self.accounts.get(id)?.state {
            ActorState::Pool(s) => Some(s),
            _ => None,
        }
    }

    pub fn lp_account(&self, id: &Identity) -> Option<&LpAccountState> {
        match &self.accounts.get(id)?.state {
            ActorState::LpAccount(s) => Some(s),
            _ => None,
        }
    }

    pub fn balance(&self, id: &Identity) -> Result<Coins, LedgerError> {
        self.accounts
            .get(id)
            .map(|a| a.balance)
            .ok_or(LedgerError::UnknownAccount(*id))
    }

    /// Messages received by an identity without actor code.
    pub fn inbox(&self, id: &Identity) -> &[InternalMessage] {
        self.inboxes.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn take_inbox(&mut self, id: &Identity) -> Vec<InternalMessage> {
        self.inboxes.remove(id).unwrap_or_default()
    }

    /// Queue a message from outside the protocol.
    pub fn send(&mut self, msg: InternalMessage) {
        self.queue.push_back(msg);
    }

    /// Queue `msg` and run until idle.
    pub fn execute(&mut self, msg: InternalMessage) -> Result<Vec<Transaction>, LedgerError> {
        self.send(msg);
        self.run()
    }

    /// Deliver queued messages, and everything they cause, until the queue is empty.
    pub fn run(&mut self) -> Result<Vec<Transaction>, LedgerError> {
        let mut receipts = Vec::new();
        while let Some(msg) = self.queue.pop_front() {
            if receipts.len() >= MAX_LEDGER_STEPS {
                self.queue.push_front(msg);
                return Err(LedgerError::Runaway(MAX_LEDGER_STEPS));
            }
            receipts.push(self.deliver(msg)?);
        }
        Ok(receipts)
    }

    fn deliver(&mut self, msg: InternalMessage) -> Result<Transaction, LedgerError> {
        self.lt += 1;
        let destination = msg.destination;
        let deployed = self.try_deploy(&msg)?;
        let mut tx = Transaction {
            lt: self.lt,
            account: destination,
            sender: msg.sender,
            op: msg.op(),
            value: msg.value,
            deployed,
            outcome: TxOutcome::Delivered,
        };

        let Some(account) = self.accounts.get(&destination) else {
            trace!(%destination, "ledger: delivered to inbox");
            self.inboxes.entry(destination).or_default().push(msg);
            return Ok(tx);
        };

        let balance = account.balance.saturating_add(msg.value);
        let ctx = Context {
            now: self.now,
            address: destination,
            balance,
            config: &self.config,
        };
        let result = account
            .state
            .receive(&ctx, &msg)
            .map_err(|e| (e.exit_code(), e.to_string()))
            .and_then(|(state, actions)| {
                settle(destination, balance, msg.value, actions).map(|settled| (state, settled))
            });

        match result {
            Ok((state, settled)) => {
                let messages = settled.messages.len();
                let code_replaced = settled.code.is_some();
                if let Some(account) = self.accounts.get_mut(&destination) {
                    account.state = state;
                    account.balance = settled.balance;
                    if let Some(code) = settled.code {
                        account.code = code;
                    }
                }
                self.queue.extend(settled.messages);
                tx.outcome = TxOutcome::Committed {
                    messages,
                    code_replaced,
                };
            }
            Err((exit_code, reason)) => {
                warn!(%destination, sender = %msg.sender, exit_code, %reason, "ledger: transaction failed");
                let bounced = msg.bounce && !msg.bounced;
                let kept = if bounced {
                    self.queue.push_back(msg.bounce_back());
                    balance - msg.value
                } else {
                    balance
                };
                if let Some(account) = self.accounts.get_mut(&destination) {
                    account.balance = kept;
                }
                tx.outcome = TxOutcome::Failed {
                    exit_code,
                    reason,
                    bounced,
                };
            }
        }
        Ok(tx)
    }

    /// Create the destination from the message's state-init when possible.
    fn try_deploy(&mut self, msg: &InternalMessage) -> Result<bool, LedgerError> {
        if self.accounts.contains_key(&msg.destination) {
            return Ok(false);
        }
        let Some(init) = &msg.state_init else {
            return Ok(false);
        };
        if init.address()? != msg.destination {
            warn!(destination = %msg.destination, "ledger: state-init does not match destination");
            return Ok(false);
        }
        let Some(kind) = self.codes.get(&init.code.hash()).copied() else {
            return Ok(false);
        };
        let state = ActorState::from_data(kind, &init.data)?;
        debug!(address = %msg.destination, ?kind, "ledger: deployed from state-init");
        self.accounts.insert(
            msg.destination,
            Account {
                code: init.code.clone(),
                balance: 0,
                state,
            },
        );
        Ok(true)
    }
}

struct Settled {
    balance: Coins,
    messages: Vec<InternalMessage>,
    code: Option<Cell>,
}

/// Action phase: attach values, check the balance, collect the code change.
fn settle(
    sender: Identity,
    balance: Coins,
    inbound: Coins,
    actions: Vec<OutAction>,
) -> Result<Settled, (u32, String)> {
    let mut settled = Settled {
        balance,
        messages: Vec::with_capacity(actions.len()),
        code: None,
    };
    let mut remaining = inbound;
    for action in actions {
        match action {
            OutAction::Send(out) => {
                let value = match out.value {
                    MsgValue::Exact(value) => value,
                    MsgValue::RemainingInbound => remaining,
                };
                settled.balance = settled.balance.checked_sub(value).ok_or_else(|| {
                    (
                        EXIT_NOT_ENOUGH_BALANCE,
                        format!("cannot send {value}, balance is {}", settled.balance),
                    )
                })?;
                remaining = remaining.saturating_sub(value);
                settled.messages.push(InternalMessage {
                    sender,
                    destination: out.destination,
                    value,
                    bounce: out.bounce,
                    bounced: false,
                    body: out.body,
                    state_init: out.state_init,
                });
            }
            OutAction::SetCode(code) => settled.code = Some(code),
        }
    }
    Ok(settled)
}
