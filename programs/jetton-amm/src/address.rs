//! Actor identities and their derivation from (code, initial data).

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    cell::{Builder, Cell},
    error::CodecError,
};

/// Basechain, where every protocol actor lives.
pub const BASECHAIN: i8 = 0;

/// Ledger address: workchain plus a 256-bit account hash.
///
/// Ordering is (workchain, hash), which fixes the canonical order of a wallet pair.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity {
    pub workchain: i8,
    pub hash: [u8; 32],
}

impl Identity {
    pub const fn new(workchain: i8, hash: [u8; 32]) -> Self {
        Self { workchain, hash }
    }

    /// Deterministic basechain identity for a label. Used for users and external wallets.
    pub fn from_seed(seed: &str) -> Self {
        Self::new(BASECHAIN, Sha256::digest(seed.as_bytes()).into())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.workchain)?;
        for byte in self.hash {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({self})")
    }
}

/// Parses the raw `workchain:hex` form.
impl FromStr for Identity {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CodecError::InvalidIdentity(s.to_string());
        let (wc, hex) = s.split_once(':').ok_or_else(invalid)?;
        // `i8` and `u8` parsing both accept a leading `+`.
        if wc.starts_with('+') {
            return Err(invalid());
        }
        let workchain = wc.parse::<i8>().map_err(|_| invalid())?;
        if hex.len() != 64 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let mut hash = [0u8; 32];
        for (i, byte) in hash.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Self::new(workchain, hash))
    }
}

impl TryFrom<String> for Identity {
    type Error = CodecError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.to_string()
    }
}

/// Code and initial data of an actor. Its hash is the actor's address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateInit {
    pub code: Cell,
    pub data: Cell,
}

impl StateInit {
    pub fn new(code: Cell, data: Cell) -> Self {
        Self { code, data }
    }

    /// `split_depth:0 special:0 code:1 data:1 library:0` followed by the two refs.
    pub fn to_cell(&self) -> Result<Cell, CodecError> {
        let mut b = Builder::new();
        b.store_uint(0b00110, 5)?
            .store_ref(self.code.clone())?
            .store_ref(self.data.clone())?;
        Ok(b.build())
    }

    pub fn address(&self) -> Result<Identity, CodecError> {
        Ok(Identity::new(BASECHAIN, self.to_cell()?.hash()))
    }
}

/// Order two wallet identities canonically.
pub fn sort_pair(a: Identity, b: Identity) -> (Identity, Identity) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
