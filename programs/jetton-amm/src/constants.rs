use crate::math::Coins;

/// One TON in nanotons.
pub const ONE_TON: Coins = 1_000_000_000;

/// Default fee scale: fees are expressed in 1/10_000 of the input amount.
pub const FEE_DIVIDER: u32 = 10_000;

/// Ceiling for each individual fee component (1 %).
pub const MAX_FEE: u8 = 100;

/// Governance timelock: 7 days.
pub const UPGRADE_DELAY: u64 = 7 * 24 * 60 * 60;

/// Hard cap on deliveries per [`crate::Ledger::run`] call.
pub const MAX_LEDGER_STEPS: usize = 10_000;

/// Body prefix of a bounced message.
pub const BOUNCE_PREFIX: u32 = 0xffff_ffff;

/// Message opcodes. Replies reuse the opcode of the query they answer.
pub mod op {
    // ─── Jetton standard ─────────────────────────────────────────────────────
    pub const TRANSFER: u32 = 0x0f8a_7ea5;
    pub const TRANSFER_NOTIFICATION: u32 = 0x7362_d09c;
    pub const INTERNAL_TRANSFER: u32 = 0x178d_4519;
    pub const EXCESSES: u32 = 0xd532_76db;
    pub const BURN_NOTIFICATION: u32 = 0x7bdd_97de;

    // ─── Router ──────────────────────────────────────────────────────────────
    pub const SWAP: u32 = 0x2593_8561;
    pub const PROVIDE_LP: u32 = 0xfcf9_e58f;
    pub const PAY_TO: u32 = 0xf93b_b43f;
    pub const GET_POOL_ADDRESS: u32 = 0xd1db_969b;
    pub const SET_FEES: u32 = 0x3554_23e5;
    pub const COLLECT_FEES: u32 = 0x1fcb_7d3d;
    pub const LOCK: u32 = 0x878f_9b0e;
    pub const UNLOCK: u32 = 0x6ae4_b0ef;
    pub const INIT_CODE_UPGRADE: u32 = 0xdf1e_233d;
    pub const INIT_ADMIN_UPGRADE: u32 = 0x2fb9_4384;
    pub const CANCEL_CODE_UPGRADE: u32 = 0x357c_cc67;
    pub const CANCEL_ADMIN_UPGRADE: u32 = 0xa4ed_9981;
    pub const FINALIZE_UPGRADES: u32 = 0x6378_509f;
    pub const RESET_POOL_GAS: u32 = 0xf6aa_9737;

    // ─── Pool ────────────────────────────────────────────────────────────────
    pub const CB_ADD_LIQUIDITY: u32 = 0x56df_eb8a;
    pub const CB_REFUND_ME: u32 = 0x8944_6a42;
    pub const GET_POOL_DATA: u32 = 0x43c0_34e6;
    pub const GET_EXPECTED_OUTPUTS: u32 = 0xed4d_8b67;

    // ─── LP account ──────────────────────────────────────────────────────────
    pub const ADD_LIQUIDITY: u32 = 0x3ebe_5431;
    pub const DIRECT_ADD_LIQUIDITY: u32 = 0x4cf8_2803;
    pub const REFUND_ME: u32 = 0x0bf3_f447;
    pub const GET_LP_ACCOUNT_DATA: u32 = 0xea97_bbef;

    // Shared by Router, Pool and LP account.
    pub const RESET_GAS: u32 = 0x42a0_fb43;
}

/// Exit codes carried by `payTo` and jetton refunds so wallets can tell outcomes apart.
pub mod exit_code {
    pub const SWAP_OK: u32 = 0xc643_70e5;
    pub const SWAP_OK_REF: u32 = 0x4507_8540;
    pub const SWAP_REFUND_NO_LIQUIDITY: u32 = 0x5ffe_1295;
    pub const SWAP_REFUND_SLIPPAGE: u32 = 0x3897_6e9b;
    pub const SWAP_REFUND_RESERVE_ERR: u32 = 0xe7a3_475f;
    pub const MINT_REFUND: u32 = 0x6a5f_1c3e;
    pub const BURN_OK: u32 = 0xdda4_8b6a;
    pub const REFUND_OK: u32 = 0xde7d_bbc2;
    pub const COLLECT_FEES_OK: u32 = 0x1fcb_7d3d;

    /// Trailing marker of a jetton refund issued while trading is locked.
    pub const TRANSFER_BOUNCE_LOCKED: u32 = 0x0a0d_bdcb;
    pub const TRANSFER_BOUNCE_INVALID_REQUEST: u32 = 0x1972_7ea8;
}
