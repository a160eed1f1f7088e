/// Jetton AMM: constant-product exchange built from three message-driven actors.
///
/// Actors:
///   Router     : entry point for jetton transfers; derives pools, relays payouts,
///                holds the admin key and the timelocked upgrade slots
///   Pool       : reserves, fee accounting, LP mint/burn for one wallet pair
///   LpAccount  : per-(user, pool) staging area for two-sided liquidity deposits
///
/// Every actor implements [`Actor`]: a pure function from (state, inbound message)
/// to (next state, ordered outbound actions). [`Ledger`] is the in-memory runtime
/// that delivers those actions as fresh messages until the system is idle.

pub mod actors;
pub mod address;
pub mod cell;
pub mod config;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod math;
pub mod messages;
pub mod state;

pub use actors::{Actor, ActorKind, Context, MsgValue, OutAction, OutboundMessage, Transition};
pub use address::{Identity, StateInit};
pub use cell::{Builder, Cell, Slice};
pub use config::ProtocolConfig;
pub use error::{ActorError, CodecError, ConfigError, LedgerError};
pub use ledger::{InternalMessage, Ledger, Transaction, TxOutcome};
pub use math::{Coins, U256};
pub use state::{LpAccountState, Pending, PoolState, RouterState};
