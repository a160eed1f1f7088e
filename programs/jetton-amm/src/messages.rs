//! Message bodies.
//!
//! Every body starts with the same header:
//!
//! ```text
//! op        u32   operation selector
//! query_id  u64   caller nonce, echoed by every message the request causes
//! ...             op-specific fields
//! ```
//!
//! Each actor has one enum of the messages it accepts. Decoding is strict: an
//! unknown opcode or any malformed field fails the whole message.

pub mod jetton;
pub mod lp_account;
pub mod pool;
pub mod reply;
pub mod router;

use crate::{
    cell::{Builder, Cell, Slice},
    error::CodecError,
};

pub use jetton::JettonMessage;
pub use lp_account::LpAccountMessage;
pub use pool::PoolMessage;
pub use reply::Reply;
pub use router::{JettonPayload, RouterMessage};

/// A message kind that can be written after and read after the common header.
pub trait Payload: Sized {
    fn op(&self) -> u32;

    fn store_fields(&self, b: &mut Builder) -> Result<(), CodecError>;

    fn load_fields(op: u32, s: &mut Slice<'_>) -> Result<Self, CodecError>;
}

/// Header plus payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope<P> {
    pub query_id: u64,
    pub payload: P,
}

impl<P: Payload> Envelope<P> {
    pub fn new(query_id: u64, payload: P) -> Self {
        Self { query_id, payload }
    }

    pub fn to_cell(&self) -> Result<Cell, CodecError> {
        let mut b = Builder::new();
        b.store_u32(self.payload.op())?.store_u64(self.query_id)?;
        self.payload.store_fields(&mut b)?;
        Ok(b.build())
    }

    pub fn from_cell(cell: &Cell) -> Result<Self, CodecError> {
        let mut s = cell.parse();
        let op = s.load_u32()?;
        let query_id = s.load_u64()?;
        let payload = P::load_fields(op, &mut s)?;
        Ok(Self { query_id, payload })
    }
}

/// Encode `payload` under a fresh header.
pub fn encode<P: Payload>(query_id: u64, payload: P) -> Result<Cell, CodecError> {
    Envelope::new(query_id, payload).to_cell()
}

/// Opcode of a body, if it has one.
pub fn peek_op(body: &Cell) -> Option<u32> {
    body.parse().load_u32().ok()
}

/// Query id of a body, if it carries a full header.
pub fn peek_query_id(body: &Cell) -> Option<u64> {
    let mut s = body.parse();
    s.load_u32().ok()?;
    s.load_u64().ok()
}

/// `Either X ^X`: a bit, then the payload inline or behind a reference.
pub(crate) fn load_either(s: &mut Slice<'_>) -> Result<Cell, CodecError> {
    if s.load_bit()? {
        s.load_ref()
    } else {
        Ok(s.load_remainder())
    }
}
