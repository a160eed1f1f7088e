//! Error types for the codec, the actors, the ledger runtime and configuration.

use crate::{address::Identity, math::Coins};

/// Failures while building or parsing cells.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    // ── Building ─────────────────────────────────────────────────────────────
    #[error("cell overflow: {needed} bits requested, {available} available")]
    BitOverflow { needed: usize, available: usize },

    #[error("cell already holds the maximum of 4 references")]
    RefOverflow,

    #[error("value {value} does not fit in {bits} bits")]
    ValueTooWide { value: u128, bits: usize },

    #[error("coin amount {0} exceeds the 120-bit limit")]
    CoinsOverflow(Coins),

    // ── Parsing ──────────────────────────────────────────────────────────────
    #[error("cell underflow: {needed} bits requested, {remaining} remaining")]
    BitUnderflow { needed: usize, remaining: usize },

    #[error("missing cell reference")]
    MissingRef,

    #[error("unsupported address tag {0:#04b}")]
    UnsupportedAddress(u8),

    #[error("anycast addresses are not supported")]
    AnycastAddress,

    #[error("required address is addr_none")]
    MissingAddress,

    #[error("unexpected opcode {0:#010x}")]
    UnknownOp(u32),

    #[error("invalid identity {0:?}")]
    InvalidIdentity(String),
}

/// Reasons an actor rejects a message. A rejection leaves the actor state untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActorError {
    // ── Authorization ────────────────────────────────────────────────────────
    #[error("sender {sender} is not allowed to send this message")]
    Unauthorized { sender: Identity },

    /// Admin-only router op from another sender. Reported like an unknown op.
    #[error("op {op:#010x} from {sender} is reserved for the admin")]
    AdminOnly { sender: Identity, op: u32 },

    /// Token wallet is not one of the pool's two wallets.
    #[error("wallet {wallet} does not belong to this pool")]
    WrongWallet { wallet: Identity },

    // ── Value / amounts ──────────────────────────────────────────────────────
    #[error("attached value {attached} is below the required {required}")]
    InsufficientValue { attached: Coins, required: Coins },

    #[error("invalid amount: {0}")]
    InvalidAmount(&'static str),

    /// Staged LP-account balance cannot cover the requested deposit.
    #[error("insufficient staged funds: available ({available0}, {available1}), requested ({requested0}, {requested1})")]
    InsufficientFunds {
        available0: Coins,
        available1: Coins,
        requested0: Coins,
        requested1: Coins,
    },

    // ── Fees ─────────────────────────────────────────────────────────────────
    #[error("fee configuration out of range: lp={lp_fee} protocol={protocol_fee} ref={ref_fee}")]
    FeeOutOfRange { lp_fee: u8, protocol_fee: u8, ref_fee: u8 },

    #[error("protocol fee address is not set")]
    FeeAddressUnset,

    // ── Arithmetic ───────────────────────────────────────────────────────────
    #[error("integer overflow in pool math")]
    MathOverflow,

    #[error("malformed message: {0}")]
    Codec(#[from] CodecError),
}

impl ActorError {
    /// Exit code reported in transaction receipts.
    pub fn exit_code(&self) -> u32 {
        match self {
            ActorError::Codec(CodecError::UnknownOp(_)) | ActorError::AdminOnly { .. } => 0xffff,
            // Cell underflow and friends, as the VM reports them.
            ActorError::Codec(_) => 9,
            ActorError::Unauthorized { .. } => 1001,
            ActorError::InsufficientValue { .. } => 1002,
            ActorError::InvalidAmount(_) => 1003,
            ActorError::InsufficientFunds { .. } => 1004,
            ActorError::FeeOutOfRange { .. } => 1005,
            ActorError::FeeAddressUnset => 1006,
            ActorError::MathOverflow => 1007,
            ActorError::WrongWallet { .. } => 1008,
        }
    }
}

/// Runtime failures of the in-memory ledger itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("no account at {0}")]
    UnknownAccount(Identity),

    #[error("account {0} already exists")]
    AlreadyDeployed(Identity),

    #[error("message loop did not settle within {0} deliveries")]
    Runaway(usize),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Rejected [`crate::ProtocolConfig`] values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("fee_divider must be non-zero")]
    ZeroDivider,

    #[error("max_fee {max_fee} allows fees above the divider {divider}")]
    MaxFeeTooHigh { max_fee: u8, divider: u32 },

    #[error("public collect threshold {public} is below the router threshold {router}")]
    CollectThresholds { public: Coins, router: Coins },

    #[error("config parse error: {0}")]
    Parse(String),
}

/// Convenience alias for actor handlers.
pub type Result<T, E = ActorError> = std::result::Result<T, E>;
