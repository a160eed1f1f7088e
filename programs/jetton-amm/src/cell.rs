//! Bit cells: the unit of message bodies and persistent data.
//!
//! A cell carries up to 1023 data bits and up to 4 references to child cells.
//! Its identity is the standard representation hash:
//!
//! ```text
//! sha256( d1 | d2 | data‖completion-tag | depth(ref_i) as u16 BE … | hash(ref_i) … )
//!   d1 = number of refs
//!   d2 = floor(bits/8) + ceil(bits/8)
//! ```

use std::{fmt, sync::Arc};

use sha2::{Digest, Sha256};

use crate::{
    address::Identity,
    error::CodecError,
    math::{Coins, MAX_COINS},
};

pub const MAX_BITS: usize = 1023;
pub const MAX_REFS: usize = 4;

type Result<T> = std::result::Result<T, CodecError>;

/// Immutable cell. Cheap to clone: children are shared.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl Cell {
    /// The empty cell.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn refs(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    /// Start reading from the first bit and first reference.
    pub fn parse(&self) -> Slice<'_> {
        Slice {
            cell: self,
            bit_pos: 0,
            ref_pos: 0,
        }
    }

    pub fn bit(&self, index: usize) -> bool {
        self.data[index / 8] & (0x80 >> (index % 8)) != 0
    }

    /// Depth of the reference tree below this cell.
    pub fn depth(&self) -> u16 {
        self.refs
            .iter()
            .map(|r| r.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Representation hash.
    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        let d1 = self.refs.len() as u8;
        let d2 = (self.bit_len / 8 + self.bit_len.div_ceil(8)) as u8;
        hasher.update([d1, d2]);

        let mut data = self.data.clone();
        if self.bit_len % 8 != 0 {
            data[self.bit_len / 8] |= 0x80 >> (self.bit_len % 8);
        }
        hasher.update(&data);

        for r in &self.refs {
            hasher.update(r.depth().to_be_bytes());
        }
        for r in &self.refs {
            hasher.update(r.hash());
        }
        hasher.finalize().into()
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cell{{{}:", self.bit_len)?;
        for byte in &self.data {
            write!(f, "{byte:02x}")?;
        }
        if !self.refs.is_empty() {
            f.debug_list().entries(self.refs.iter()).finish()?;
        }
        write!(f, "}}")
    }
}

/// Append-only cell builder. Every `store_*` checks capacity up front.
#[derive(Debug, Clone, Default)]
pub struct Builder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bits_left(&self) -> usize {
        MAX_BITS - self.bit_len
    }

    fn reserve(&self, bits: usize) -> Result<()> {
        if bits > self.bits_left() {
            return Err(CodecError::BitOverflow {
                needed: bits,
                available: self.bits_left(),
            });
        }
        Ok(())
    }

    fn push_bit(&mut self, bit: bool) {
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let last = self.data.len() - 1;
            self.data[last] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self> {
        self.reserve(1)?;
        self.push_bit(bit);
        Ok(self)
    }

    /// Store the low `bits` bits of `value`, most significant first.
    pub fn store_uint(&mut self, value: u128, bits: usize) -> Result<&mut Self> {
        if bits > 128 || (bits < 128 && value >> bits != 0) {
            return Err(CodecError::ValueTooWide { value, bits });
        }
        self.reserve(bits)?;
        for i in (0..bits).rev() {
            self.push_bit((value >> i) & 1 == 1);
        }
        Ok(self)
    }

    pub fn store_u8(&mut self, value: u8) -> Result<&mut Self> {
        self.store_uint(value as u128, 8)
    }

    pub fn store_u32(&mut self, value: u32) -> Result<&mut Self> {
        self.store_uint(value as u128, 32)
    }

    pub fn store_u64(&mut self, value: u64) -> Result<&mut Self> {
        self.store_uint(value as u128, 64)
    }

    /// VarUInteger 16: 4-bit byte length followed by the big-endian amount.
    pub fn store_coins(&mut self, amount: Coins) -> Result<&mut Self> {
        if amount > MAX_COINS {
            return Err(CodecError::CoinsOverflow(amount));
        }
        let len = (128 - amount.leading_zeros() as usize).div_ceil(8);
        self.reserve(4 + len * 8)?;
        self.store_uint(len as u128, 4)?;
        self.store_uint(amount, len * 8)
    }

    /// `addr_std$10 anycast:0 workchain:int8 hash:bits256`.
    pub fn store_address(&mut self, address: &Identity) -> Result<&mut Self> {
        self.reserve(267)?;
        self.store_uint(0b100, 3)?;
        self.store_u8(address.workchain as u8)?;
        for byte in address.hash {
            self.store_u8(byte)?;
        }
        Ok(self)
    }

    /// Like [`Builder::store_address`], writing `addr_none$00` for `None`.
    pub fn store_address_opt(&mut self, address: Option<&Identity>) -> Result<&mut Self> {
        match address {
            Some(address) => self.store_address(address),
            None => self.store_uint(0, 2),
        }
    }

    pub fn store_ref(&mut self, cell: Cell) -> Result<&mut Self> {
        if self.refs.len() >= MAX_REFS {
            return Err(CodecError::RefOverflow);
        }
        self.refs.push(Arc::new(cell));
        Ok(self)
    }

    /// `Maybe ^Cell`: a presence bit, then the reference when present.
    pub fn store_maybe_ref(&mut self, cell: Option<Cell>) -> Result<&mut Self> {
        match cell {
            Some(cell) => {
                if self.refs.len() >= MAX_REFS {
                    return Err(CodecError::RefOverflow);
                }
                self.store_bit(true)?.store_ref(cell)
            }
            None => self.store_bit(false),
        }
    }

    /// Append all bits and references of `cell` inline.
    pub fn store_cell_contents(&mut self, cell: &Cell) -> Result<&mut Self> {
        self.reserve(cell.bit_len)?;
        if self.refs.len() + cell.refs.len() > MAX_REFS {
            return Err(CodecError::RefOverflow);
        }
        for i in 0..cell.bit_len {
            self.push_bit(cell.bit(i));
        }
        self.refs.extend(cell.refs.iter().cloned());
        Ok(self)
    }

    /// Append as many leading bits of `cell` as fit, without its references.
    pub fn store_truncated(&mut self, cell: &Cell) -> &mut Self {
        let take = cell.bit_len.min(self.bits_left());
        for i in 0..take {
            self.push_bit(cell.bit(i));
        }
        self
    }

    pub fn build(&self) -> Cell {
        Cell {
            data: self.data.clone(),
            bit_len: self.bit_len,
            refs: self.refs.clone(),
        }
    }
}

/// Read cursor over a cell.
#[derive(Debug, Clone)]
pub struct Slice<'a> {
    cell: &'a Cell,
    bit_pos: usize,
    ref_pos: usize,
}

impl<'a> Slice<'a> {
    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len - self.bit_pos
    }

    pub fn remaining_refs(&self) -> usize {
        self.cell.refs.len() - self.ref_pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining_bits() == 0 && self.remaining_refs() == 0
    }

    fn require(&self, bits: usize) -> Result<()> {
        if bits > self.remaining_bits() {
            return Err(CodecError::BitUnderflow {
                needed: bits,
                remaining: self.remaining_bits(),
            });
        }
        Ok(())
    }

    pub fn skip_bits(&mut self, bits: usize) -> Result<()> {
        self.require(bits)?;
        self.bit_pos += bits;
        Ok(())
    }

    pub fn load_bit(&mut self) -> Result<bool> {
        self.require(1)?;
        let bit = self.cell.bit(self.bit_pos);
        self.bit_pos += 1;
        Ok(bit)
    }

    pub fn load_uint(&mut self, bits: usize) -> Result<u128> {
        if bits > 128 {
            return Err(CodecError::ValueTooWide { value: 0, bits });
        }
        self.require(bits)?;
        let mut value = 0u128;
        for _ in 0..bits {
            value = (value << 1) | self.cell.bit(self.bit_pos) as u128;
            self.bit_pos += 1;
        }
        Ok(value)
    }

    pub fn load_u8(&mut self) -> Result<u8> {
        Ok(self.load_uint(8)? as u8)
    }

    pub fn load_u32(&mut self) -> Result<u32> {
        Ok(self.load_uint(32)? as u32)
    }

    pub fn load_u64(&mut self) -> Result<u64> {
        Ok(self.load_uint(64)? as u64)
    }

    pub fn load_coins(&mut self) -> Result<Coins> {
        let len = self.load_uint(4)? as usize;
        self.load_uint(len * 8)
    }

    /// Read an optional std address; `addr_none` yields `None`.
    pub fn load_address_opt(&mut self) -> Result<Option<Identity>> {
        let tag = self.load_uint(2)? as u8;
        match tag {
            0b00 => Ok(None),
            0b10 => {
                if self.load_bit()? {
                    return Err(CodecError::AnycastAddress);
                }
                let workchain = self.load_u8()? as i8;
                let mut hash = [0u8; 32];
                for byte in hash.iter_mut() {
                    *byte = self.load_u8()?;
                }
                Ok(Some(Identity::new(workchain, hash)))
            }
            other => Err(CodecError::UnsupportedAddress(other)),
        }
    }

    pub fn load_address(&mut self) -> Result<Identity> {
        self.load_address_opt()?.ok_or(CodecError::MissingAddress)
    }

    pub fn load_ref(&mut self) -> Result<Cell> {
        let cell = self
            .cell
            .refs
            .get(self.ref_pos)
            .ok_or(CodecError::MissingRef)?;
        self.ref_pos += 1;
        Ok(Cell::clone(cell))
    }

    pub fn load_maybe_ref(&mut self) -> Result<Option<Cell>> {
        if self.load_bit()? {
            Ok(Some(self.load_ref()?))
        } else {
            Ok(None)
        }
    }

    /// Everything not yet read, as a standalone cell.
    pub fn load_remainder(&mut self) -> Cell {
        let mut b = Builder::new();
        for i in self.bit_pos..self.cell.bit_len {
            b.push_bit(self.cell.bit(i));
        }
        b.refs.extend(self.cell.refs[self.ref_pos..].iter().cloned());
        self.bit_pos = self.cell.bit_len;
        self.ref_pos = self.cell.refs.len();
        b.build()
    }
}
