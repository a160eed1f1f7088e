//! Persistent actor state and its data-cell layouts.
//!
//! The data cell of a freshly deployed actor is also its address seed, so the
//! initial layouts below fix every derived identity in the protocol.

use crate::{
    address::{sort_pair, Identity, StateInit},
    cell::{Builder, Cell},
    error::CodecError,
    math::{Coins, FeeSchedule},
};

type Result<T> = std::result::Result<T, CodecError>;

/// A governance change waiting for its timelock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pending<T> {
    pub value: T,
    /// Earliest time the change may be finalized.
    pub deadline: u64,
}

impl<T> Pending<T> {
    pub fn is_due(&self, now: u64) -> bool {
        now >= self.deadline
    }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Layout:
/// ```text
/// locked:bit admin:addr ^lp_wallet_code ^pool_code ^lp_account_code
/// ^(code_deadline:u64 admin_deadline:u64 pending_admin:addr? pending_code:(Maybe ^Cell))
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterState {
    pub is_locked: bool,
    pub admin: Identity,
    pub pending_code: Option<Pending<Cell>>,
    pub pending_admin: Option<Pending<Identity>>,
    pub pool_code: Cell,
    pub lp_wallet_code: Cell,
    pub lp_account_code: Cell,
}

impl RouterState {
    pub fn new(admin: Identity, pool_code: Cell, lp_wallet_code: Cell, lp_account_code: Cell) -> Self {
        Self {
            is_locked: false,
            admin,
            pending_code: None,
            pending_admin: None,
            pool_code,
            lp_wallet_code,
            lp_account_code,
        }
    }

    pub fn to_cell(&self) -> Result<Cell> {
        let mut upgrades = Builder::new();
        upgrades
            .store_u64(self.pending_code.as_ref().map_or(0, |p| p.deadline))?
            .store_u64(self.pending_admin.as_ref().map_or(0, |p| p.deadline))?
            .store_address_opt(self.pending_admin.as_ref().map(|p| &p.value))?
            .store_maybe_ref(self.pending_code.as_ref().map(|p| p.value.clone()))?;

        let mut b = Builder::new();
        b.store_bit(self.is_locked)?
            .store_address(&self.admin)?
            .store_ref(self.lp_wallet_code.clone())?
            .store_ref(self.pool_code.clone())?
            .store_ref(self.lp_account_code.clone())?
            .store_ref(upgrades.build())?;
        Ok(b.build())
    }

    pub fn from_cell(cell: &Cell) -> Result<Self> {
        let mut s = cell.parse();
        let is_locked = s.load_bit()?;
        let admin = s.load_address()?;
        let lp_wallet_code = s.load_ref()?;
        let pool_code = s.load_ref()?;
        let lp_account_code = s.load_ref()?;
        let upgrades = s.load_ref()?;

        let mut u = upgrades.parse();
        let code_deadline = u.load_u64()?;
        let admin_deadline = u.load_u64()?;
        let pending_admin = u.load_address_opt()?.map(|value| Pending {
            value,
            deadline: admin_deadline,
        });
        let pending_code = u.load_maybe_ref()?.map(|value| Pending {
            value,
            deadline: code_deadline,
        });

        Ok(Self {
            is_locked,
            admin,
            pending_code,
            pending_admin,
            pool_code,
            lp_wallet_code,
            lp_account_code,
        })
    }

    /// State-init of the pool for a wallet pair, in either order.
    pub fn pool_state_init(&self, router: Identity, wallet_a: Identity, wallet_b: Identity) -> Result<StateInit> {
        let pool = PoolState::new(
            router,
            wallet_a,
            wallet_b,
            self.lp_wallet_code.clone(),
            self.lp_account_code.clone(),
        );
        Ok(StateInit::new(self.pool_code.clone(), pool.to_cell()?))
    }

    /// Address of the pool for a wallet pair, in either order.
    pub fn pool_address(&self, router: Identity, wallet_a: Identity, wallet_b: Identity) -> Result<Identity> {
        self.pool_state_init(router, wallet_a, wallet_b)?.address()
    }
}

// ─── Pool ────────────────────────────────────────────────────────────────────

/// Layout:
/// ```text
/// router:addr lp_fee:u8 protocol_fee:u8 ref_fee:u8 wallet0:addr wallet1:addr supply:coins
/// ^(collected0:coins collected1:coins protocol_fee_address:addr? reserve0:coins reserve1:coins)
/// ^lp_wallet_code ^lp_account_code
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolState {
    pub router: Identity,
    pub lp_fee: u8,
    pub protocol_fee: u8,
    pub ref_fee: u8,
    /// Canonically ordered: `wallet0 < wallet1`.
    pub wallet0: Identity,
    pub wallet1: Identity,
    pub total_supply_lp: Coins,
    pub collected_token0_protocol_fee: Coins,
    pub collected_token1_protocol_fee: Coins,
    pub protocol_fee_address: Option<Identity>,
    pub reserve0: Coins,
    pub reserve1: Coins,
    pub lp_wallet_code: Cell,
    pub lp_account_code: Cell,
}

impl PoolState {
    /// Fresh pool: zero fees, zero reserves, wallets in canonical order.
    pub fn new(
        router: Identity,
        wallet_a: Identity,
        wallet_b: Identity,
        lp_wallet_code: Cell,
        lp_account_code: Cell,
    ) -> Self {
        let (wallet0, wallet1) = sort_pair(wallet_a, wallet_b);
        Self {
            router,
            lp_fee: 0,
            protocol_fee: 0,
            ref_fee: 0,
            wallet0,
            wallet1,
            total_supply_lp: 0,
            collected_token0_protocol_fee: 0,
            collected_token1_protocol_fee: 0,
            protocol_fee_address: None,
            reserve0: 0,
            reserve1: 0,
            lp_wallet_code,
            lp_account_code,
        }
    }

    pub fn fees(&self, divider: u32) -> FeeSchedule {
        FeeSchedule {
            lp_fee: self.lp_fee,
            protocol_fee: self.protocol_fee,
            ref_fee: self.ref_fee,
            divider,
        }
    }

    pub fn to_cell(&self) -> Result<Cell> {
        let mut accounting = Builder::new();
        accounting
            .store_coins(self.collected_token0_protocol_fee)?
            .store_coins(self.collected_token1_protocol_fee)?
            .store_address_opt(self.protocol_fee_address.as_ref())?
            .store_coins(self.reserve0)?
            .store_coins(self.reserve1)?;

        let mut b = Builder::new();
        b.store_address(&self.router)?
            .store_u8(self.lp_fee)?
            .store_u8(self.protocol_fee)?
            .store_u8(self.ref_fee)?
            .store_address(&self.wallet0)?
            .store_address(&self.wallet1)?
            .store_coins(self.total_supply_lp)?
            .store_ref(accounting.build())?
            .store_ref(self.lp_wallet_code.clone())?
            .store_ref(self.lp_account_code.clone())?;
        Ok(b.build())
    }

    pub fn from_cell(cell: &Cell) -> Result<Self> {
        let mut s = cell.parse();
        let router = s.load_address()?;
        let lp_fee = s.load_u8()?;
        let protocol_fee = s.load_u8()?;
        let ref_fee = s.load_u8()?;
        let wallet0 = s.load_address()?;
        let wallet1 = s.load_address()?;
        let total_supply_lp = s.load_coins()?;
        let accounting = s.load_ref()?;
        let lp_wallet_code = s.load_ref()?;
        let lp_account_code = s.load_ref()?;

        let mut a = accounting.parse();
        Ok(Self {
            router,
            lp_fee,
            protocol_fee,
            ref_fee,
            wallet0,
            wallet1,
            total_supply_lp,
            collected_token0_protocol_fee: a.load_coins()?,
            collected_token1_protocol_fee: a.load_coins()?,
            protocol_fee_address: a.load_address_opt()?,
            reserve0: a.load_coins()?,
            reserve1: a.load_coins()?,
            lp_wallet_code,
            lp_account_code,
        })
    }

    pub fn lp_account_state_init(&self, pool: Identity, user: Identity) -> Result<StateInit> {
        let account = LpAccountState::new(user, pool);
        Ok(StateInit::new(self.lp_account_code.clone(), account.to_cell()?))
    }

    pub fn lp_account_address(&self, pool: Identity, user: Identity) -> Result<Identity> {
        self.lp_account_state_init(pool, user)?.address()
    }

    /// State-init of the LP-token wallet owned by `owner`.
    ///
    /// ```text
    /// balance:coins(0) owner:addr master:addr ^lp_wallet_code
    /// ```
    pub fn lp_wallet_state_init(&self, pool: Identity, owner: Identity) -> Result<StateInit> {
        let mut data = Builder::new();
        data.store_coins(0)?
            .store_address(&owner)?
            .store_address(&pool)?
            .store_ref(self.lp_wallet_code.clone())?;
        Ok(StateInit::new(self.lp_wallet_code.clone(), data.build()))
    }

    pub fn lp_wallet_address(&self, pool: Identity, owner: Identity) -> Result<Identity> {
        self.lp_wallet_state_init(pool, owner)?.address()
    }
}

// ─── LP account ──────────────────────────────────────────────────────────────

/// Layout: `user:addr pool:addr amount0:coins amount1:coins`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LpAccountState {
    pub user: Identity,
    pub pool: Identity,
    pub stored0: Coins,
    pub stored1: Coins,
}

impl LpAccountState {
    pub fn new(user: Identity, pool: Identity) -> Self {
        Self {
            user,
            pool,
            stored0: 0,
            stored1: 0,
        }
    }

    pub fn to_cell(&self) -> Result<Cell> {
        let mut b = Builder::new();
        b.store_address(&self.user)?
            .store_address(&self.pool)?
            .store_coins(self.stored0)?
            .store_coins(self.stored1)?;
        Ok(b.build())
    }

    pub fn from_cell(cell: &Cell) -> Result<Self> {
        let mut s = cell.parse();
        Ok(Self {
            user: s.load_address()?,
            pool: s.load_address()?,
            stored0: s.load_coins()?,
            stored1: s.load_coins()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(tag: u32) -> Cell {
        Builder::new().store_u32(tag).unwrap().build()
    }

    fn router_state() -> RouterState {
        RouterState::new(Identity::from_seed("admin"), code(1), code(2), code(3))
    }

    #[test]
    fn router_layout_reads_back_with_pending_upgrades() {
        let mut state = router_state();
        assert_eq!(RouterState::from_cell(&state.to_cell().unwrap()).unwrap(), state);

        state.is_locked = true;
        state.pending_code = Some(Pending { value: code(9), deadline: 604_800 });
        state.pending_admin = Some(Pending {
            value: Identity::from_seed("next admin"),
            deadline: 700_000,
        });
        assert_eq!(RouterState::from_cell(&state.to_cell().unwrap()).unwrap(), state);
    }

    #[test]
    fn pool_address_ignores_wallet_order() {
        let router = router_state();
        let me = Identity::from_seed("router");
        let a = Identity::from_seed("wallet a");
        let b = Identity::from_seed("wallet b");
        assert_eq!(
            router.pool_address(me, a, b).unwrap(),
            router.pool_address(me, b, a).unwrap()
        );
        let c = Identity::from_seed("wallet c");
        assert_ne!(router.pool_address(me, a, b).unwrap(), router.pool_address(me, a, c).unwrap());
    }

    #[test]
    fn pool_layout_reads_back() {
        let mut pool = PoolState::new(
            Identity::from_seed("router"),
            Identity::from_seed("x"),
            Identity::from_seed("y"),
            code(2),
            code(3),
        );
        assert!(pool.wallet0 < pool.wallet1);
        pool.lp_fee = 20;
        pool.ref_fee = 10;
        pool.reserve0 = 1_310;
        pool.reserve1 = 203_333;
        pool.total_supply_lp = 10_000_000;
        pool.collected_token0_protocol_fee = 110;
        pool.collected_token1_protocol_fee = 440;
        pool.protocol_fee_address = Some(Identity::from_seed("treasury"));
        assert_eq!(PoolState::from_cell(&pool.to_cell().unwrap()).unwrap(), pool);
    }

    #[test]
    fn lp_account_address_is_per_user() {
        let pool = PoolState::new(
            Identity::from_seed("router"),
            Identity::from_seed("x"),
            Identity::from_seed("y"),
            code(2),
            code(3),
        );
        let me = Identity::from_seed("pool");
        let alice = pool.lp_account_address(me, Identity::from_seed("alice")).unwrap();
        let bob = pool.lp_account_address(me, Identity::from_seed("bob")).unwrap();
        assert_ne!(alice, bob);
        assert_ne!(alice, pool.lp_wallet_address(me, Identity::from_seed("alice")).unwrap());
    }

    #[test]
    fn lp_account_layout_reads_back() {
        let mut account = LpAccountState::new(Identity::from_seed("user"), Identity::from_seed("pool"));
        account.stored1 = 10;
        assert_eq!(LpAccountState::from_cell(&account.to_cell().unwrap()).unwrap(), account);
    }
}
