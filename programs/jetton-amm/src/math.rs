//! Pool arithmetic: constant-product swaps, LP mint and burn.
//!
//! Payouts floor and swap fee slices round up, so rounding never favors the
//! trader.

use uint::construct_uint;

construct_uint! {
    /// 256-bit unsigned integer for products of two 120-bit amounts.
    pub struct U256(4);
}

/// Token and TON amounts (VarUInteger 16 on the wire).
pub type Coins = u128;

/// Largest amount representable as `coins`: 2^120 - 1.
pub const MAX_COINS: Coins = (1 << 120) - 1;

/// `a * b / denom`, or `None` when the quotient leaves coin range or `denom == 0`.
pub fn mul_div(a: Coins, b: Coins, denom: Coins) -> Option<Coins> {
    if denom == 0 {
        return None;
    }
    let q = U256::from(a) * U256::from(b) / U256::from(denom);
    narrow(q)
}

fn narrow(v: U256) -> Option<Coins> {
    if v.bits() > 120 {
        return None;
    }
    Some(v.low_u128())
}

/// Integer square root via the Babylonian method.
pub fn isqrt(n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    let mut x = n;
    let mut y = (x + U256::one()) >> 1;
    while y < x {
        x = y;
        y = (x + n / x) >> 1;
    }
    x
}

/// Fee components of a pool, in units of `divider`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    pub lp_fee: u8,
    pub protocol_fee: u8,
    pub ref_fee: u8,
    pub divider: u32,
}

impl FeeSchedule {
    /// Total fee charged on an input, in units of `divider`.
    pub fn total(&self, has_ref: bool) -> u32 {
        let referral = if has_ref { self.ref_fee as u32 } else { 0 };
        self.lp_fee as u32 + self.protocol_fee as u32 + referral
    }
}

/// Result of a swap quote. Fees are denominated in the output token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwapAmounts {
    /// Tokens paid to the recipient.
    pub amount_out: Coins,
    /// Output tokens credited to the protocol fee counter.
    pub protocol_fee: Coins,
    /// Output tokens paid to the referrer.
    pub ref_fee: Coins,
    /// Amount removed from the output reserve (payout plus both fee slices).
    pub reserve_out_delta: Coins,
}

/// `ceil(a * b / denom)`, or `None` when out of coin range or `denom == 0`.
pub fn mul_div_ceil(a: Coins, b: Coins, denom: Coins) -> Option<Coins> {
    if denom == 0 {
        return None;
    }
    let d = U256::from(denom);
    let q = (U256::from(a) * U256::from(b) + d - U256::one()) / d;
    narrow(q)
}

/// Quote a constant-product swap.
///
/// The LP fee stays in the input reserve:
/// `base = x(D - lp) * Rout / (Rin * D + x(D - lp))`. Protocol and referral
/// slices are then taken from `base` in the output token, each rounded up.
///
/// * `amount_in`   – raw input amount
/// * `reserve_in`  – reserve of the token being sold
/// * `reserve_out` – reserve of the token being bought
/// * `fees`        – the pool's fee schedule
/// * `has_ref`     – whether a referral slice is charged
///
/// Returns `None` on overflow or a fee schedule whose total exceeds the divider.
/// When the fee slices swallow the whole output the quote pays nothing.
pub fn compute_swap(
    amount_in: Coins,
    reserve_in: Coins,
    reserve_out: Coins,
    fees: &FeeSchedule,
    has_ref: bool,
) -> Option<SwapAmounts> {
    let divider = fees.divider as Coins;
    if fees.total(has_ref) as Coins > divider {
        return None;
    }
    let keep = divider - fees.lp_fee as Coins;

    // ── Constant-product output after the LP fee ─────────────────────────────
    let with_fee = U256::from(amount_in) * U256::from(keep);
    let denom = U256::from(reserve_in) * U256::from(divider) + with_fee;
    if denom.is_zero() {
        return None;
    }
    let base_out = narrow(with_fee * U256::from(reserve_out) / denom)?;

    // ── Fee slices taken from the output ─────────────────────────────────────
    let protocol_fee = mul_div_ceil(base_out, fees.protocol_fee as Coins, divider)?;
    let ref_fee = if has_ref {
        mul_div_ceil(base_out, fees.ref_fee as Coins, divider)?
    } else {
        0
    };
    let Some(amount_out) = base_out.checked_sub(protocol_fee + ref_fee) else {
        return Some(SwapAmounts::default());
    };

    Some(SwapAmounts {
        amount_out,
        protocol_fee,
        ref_fee,
        reserve_out_delta: base_out,
    })
}

/// LP tokens minted for a deposit.
///
/// First deposit: `floor(sqrt(amount0 * amount1))`. Afterwards the smaller of the
/// two proportional shares. `None` when an existing pool has an empty reserve.
pub fn lp_to_mint(
    amount0: Coins,
    amount1: Coins,
    reserve0: Coins,
    reserve1: Coins,
    supply: Coins,
) -> Option<Coins> {
    if supply == 0 {
        let product = U256::from(amount0) * U256::from(amount1);
        return narrow(isqrt(product));
    }
    let share0 = mul_div(amount0, supply, reserve0)?;
    let share1 = mul_div(amount1, supply, reserve1)?;
    Some(share0.min(share1))
}

/// Reserve amounts released by burning `amount` LP tokens out of `supply`.
pub fn burn_amounts(
    amount: Coins,
    reserve0: Coins,
    reserve1: Coins,
    supply: Coins,
) -> Option<(Coins, Coins)> {
    if amount > supply {
        return None;
    }
    Some((
        mul_div(reserve0, amount, supply)?,
        mul_div(reserve1, amount, supply)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fees(lp: u8, protocol: u8, referral: u8) -> FeeSchedule {
        FeeSchedule {
            lp_fee: lp,
            protocol_fee: protocol,
            ref_fee: referral,
            divider: 10_000,
        }
    }

    #[test]
    fn isqrt_matches_floor_sqrt() {
        assert_eq!(isqrt(U256::zero()), U256::zero());
        assert_eq!(isqrt(U256::from(1u64)), U256::from(1u64));
        assert_eq!(isqrt(U256::from(15u64)), U256::from(3u64));
        assert_eq!(isqrt(U256::from(16u64)), U256::from(4u64));
        let big = U256::from(1_000_001u64) * U256::from(100_000_001u64);
        assert_eq!(isqrt(big), U256::from(10_000_005u64));
    }

    #[test]
    fn swap_without_referral_matches_reference_quote() {
        let out = compute_swap(20_000_000_000, 10u128.pow(15), 10u128.pow(15), &fees(100, 0, 10), false)
            .unwrap();
        assert_eq!(out.amount_out, 19_799_607_967);
        assert_eq!(out.protocol_fee, 0);
        assert_eq!(out.ref_fee, 0);
        assert_eq!(out.reserve_out_delta, 19_799_607_967);
    }

    #[test]
    fn referral_is_taken_from_output() {
        let out = compute_swap(20_000, 10u128.pow(33), 10u128.pow(33), &fees(20, 0, 10), true).unwrap();
        assert_eq!(out.amount_out, 19_939);
        // ceil(19_959 * 10 / 10_000)
        assert_eq!(out.ref_fee, 20);
        assert_eq!(out.reserve_out_delta, 19_959);
    }

    #[test]
    fn protocol_fee_is_taken_from_output() {
        let out = compute_swap(1_000_000, 10u128.pow(12), 10u128.pow(12), &fees(20, 10, 0), false).unwrap();
        assert_eq!(out.reserve_out_delta, 997_999);
        assert_eq!(out.protocol_fee, 998);
        assert_eq!(out.amount_out, 997_001);
        assert_eq!(out.amount_out + out.protocol_fee + out.ref_fee, out.reserve_out_delta);
    }

    #[test]
    fn higher_fee_strictly_lowers_output() {
        let r = 10u128.pow(15);
        let mut last = Coins::MAX;
        for lp in [0u8, 10, 20, 50, 100] {
            let out = compute_swap(5_000_000_000_000, r, r, &fees(lp, 0, 0), false).unwrap();
            assert!(out.amount_out < last, "lp {lp}: {} !< {last}", out.amount_out);
            last = out.amount_out;
        }
        assert_eq!(last, 4_925_618_189_959);

        let plain = compute_swap(5_000_000_000_000, r, r, &fees(20, 0, 10), false).unwrap();
        let referred = compute_swap(5_000_000_000_000, r, r, &fees(20, 0, 10), true).unwrap();
        assert!(referred.amount_out < plain.amount_out);
    }

    #[test]
    fn dust_input_quotes_nothing() {
        let r = 10u128.pow(12);
        assert_eq!(compute_swap(1, r, r, &fees(20, 10, 10), true), Some(SwapAmounts::default()));
        // Fee slices round up and swallow a two-token output.
        let out = compute_swap(3, r, r, &fees(20, 10, 10), true).unwrap();
        assert_eq!(out.amount_out, 0);
        let greedy = FeeSchedule {
            lp_fee: 60,
            protocol_fee: 30,
            ref_fee: 20,
            divider: 100,
        };
        assert_eq!(compute_swap(1_000, r, r, &greedy, true), None);
    }

    #[test]
    fn mul_div_ceil_rounds_up() {
        assert_eq!(mul_div_ceil(19_959, 10, 10_000), Some(20));
        assert_eq!(mul_div_ceil(10_000, 10, 10_000), Some(10));
        assert_eq!(mul_div_ceil(0, 10, 10_000), Some(0));
        assert_eq!(mul_div_ceil(1, 1, 0), None);
    }

    #[test]
    fn first_mint_is_geometric_mean() {
        assert_eq!(lp_to_mint(1_000_001, 100_000_001, 0, 0, 0), Some(10_000_005));
    }

    #[test]
    fn later_mint_takes_smaller_share() {
        // 10% of reserve0 but 5% of reserve1.
        assert_eq!(lp_to_mint(100, 50, 1_000, 1_000, 10_000), Some(500));
        assert_eq!(lp_to_mint(1, 1, 0, 1_000, 10_000), None);
    }

    #[test]
    fn burn_is_proportional_and_floored() {
        assert_eq!(burn_amounts(100, 10_000, 204_030_300, 1_000), Some((1_000, 20_403_030)));
        assert_eq!(burn_amounts(100, 1_310, 203_333, 10_000_000), Some((0, 2)));
        assert_eq!(burn_amounts(2, 10, 10, 1), None);
    }

    #[test]
    fn mint_then_burn_never_returns_more() {
        let (r0, r1, s) = (1_234_567u128, 7_654_321u128, 3_000_000u128);
        let minted = lp_to_mint(10_000, 61_000, r0, r1, s).unwrap();
        let (o0, o1) = burn_amounts(minted, r0 + 10_000, r1 + 61_000, s + minted).unwrap();
        assert!(o0 <= 10_000);
        assert!(o1 <= 61_000);
    }

    #[test]
    fn mul_div_rejects_out_of_range() {
        assert_eq!(mul_div(MAX_COINS, 2, 1), None);
        assert_eq!(mul_div(1, 1, 0), None);
        assert_eq!(mul_div(MAX_COINS, MAX_COINS, MAX_COINS), Some(MAX_COINS));
    }
}
