use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use jetton_amm::{
    address::sort_pair,
    constants::{op, ONE_TON},
    ledger::ActorState,
    math::{self, FeeSchedule},
    messages::{JettonMessage, JettonPayload, PoolMessage, RouterMessage},
    Builder, Cell, Identity, InternalMessage, Ledger, ProtocolConfig, RouterState, Transaction, TxOutcome,
};
use serde_json::{json, Value};
use tracing::{debug, info, Level};

// ─── CLI definition ───────────────────────────────────────────────────────────

/// jetton-amm: constant-product AMM for jetton pairs.
///
/// Quotes run against reserves you pass on the command line; `demo` runs the
/// full router → pool → LP-account flow on an in-memory ledger.
/// Every command supports --json for machine-readable output.
#[derive(Parser)]
#[command(
    name    = "jetton-amm",
    version = env!("CARGO_PKG_VERSION"),
    about   = "Constant-product AMM for jetton pairs: quotes and an in-memory walkthrough.",
    after_help = "\
ENVIRONMENT:
  JETTON_AMM_CONFIG    Path to a JSON protocol config (missing fields take defaults)

QUICK START:
  jetton-amm simulate --reserve-in 1000000000000000 --reserve-out 1000000000000000 --amount 20000000000 --lp-fee 100
  jetton-amm provide  --amount0 1000001 --amount1 100000001
  jetton-amm burn     --reserve0 10000 --reserve1 204030300 --supply 1000 --amount 100
  jetton-amm demo --json"
)]
struct Cli {
    /// JSON file overriding protocol defaults (fee divider, thresholds, timelock)
    #[arg(long, global = true, value_name = "PATH", env = "JETTON_AMM_CONFIG")]
    config: Option<String>,

    /// Output machine-readable JSON instead of human-readable text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Log protocol events to stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Quote a swap against the given reserves
    #[command(
        after_help = "\
EXAMPLES:
  # 1% LP fee, no referral
  jetton-amm simulate --reserve-in 1000000000000000 --reserve-out 1000000000000000 \\
                      --amount 20000000000 --lp-fee 100

  # 0.2% LP fee plus a 0.1% referral slice
  jetton-amm simulate --reserve-in 1000000 --reserve-out 1000000 --amount 20000 \\
                      --lp-fee 20 --ref-fee 10 --referral"
    )]
    Simulate {
        /// Reserve of the token being sold
        #[arg(long, value_name = "AMOUNT")]
        reserve_in: u128,

        /// Reserve of the token being bought
        #[arg(long, value_name = "AMOUNT")]
        reserve_out: u128,

        /// Amount sold (atomic units)
        #[arg(long, value_name = "AMOUNT")]
        amount: u128,

        /// LP fee, in units of 1 / fee_divider
        #[arg(long, value_name = "FEE", default_value_t = 20)]
        lp_fee: u8,

        /// Protocol fee, in units of 1 / fee_divider
        #[arg(long, value_name = "FEE", default_value_t = 0)]
        protocol_fee: u8,

        /// Referral fee, charged only with --referral
        #[arg(long, value_name = "FEE", default_value_t = 10)]
        ref_fee: u8,

        /// Charge the referral slice
        #[arg(long, default_value_t = false)]
        referral: bool,
    },

    /// Quote the LP tokens minted for a deposit
    ///
    /// With an empty pool (supply 0) the mint is floor(sqrt(amount0 * amount1)).
    Provide {
        #[arg(long, value_name = "AMOUNT", default_value_t = 0)]
        reserve0: u128,

        #[arg(long, value_name = "AMOUNT", default_value_t = 0)]
        reserve1: u128,

        /// Current LP supply
        #[arg(long, value_name = "AMOUNT", default_value_t = 0)]
        supply: u128,

        #[arg(long, value_name = "AMOUNT")]
        amount0: u128,

        #[arg(long, value_name = "AMOUNT")]
        amount1: u128,
    },

    /// Quote the reserves released by burning LP tokens
    Burn {
        #[arg(long, value_name = "AMOUNT")]
        reserve0: u128,

        #[arg(long, value_name = "AMOUNT")]
        reserve1: u128,

        /// Current LP supply
        #[arg(long, value_name = "AMOUNT")]
        supply: u128,

        /// LP tokens to burn
        #[arg(long, value_name = "AMOUNT")]
        amount: u128,
    },

    /// Deploy a router on an in-memory ledger and walk through provide, swap and burn
    Demo {
        /// Token-0 amount deposited
        #[arg(long, value_name = "AMOUNT", default_value_t = 1_000_000_000)]
        amount0: u128,

        /// Token-1 amount deposited
        #[arg(long, value_name = "AMOUNT", default_value_t = 1_000_000_000)]
        amount1: u128,

        /// Token-0 amount swapped after the deposit
        #[arg(long, value_name = "AMOUNT", default_value_t = 1_000_000)]
        swap: u128,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    debug!(?config, "protocol config loaded");

    match &cli.command {
        Commands::Simulate {
            reserve_in,
            reserve_out,
            amount,
            lp_fee,
            protocol_fee,
            ref_fee,
            referral,
        } => {
            let fees = FeeSchedule {
                lp_fee: *lp_fee,
                protocol_fee: *protocol_fee,
                ref_fee: *ref_fee,
                divider: config.fee_divider,
            };
            cmd_simulate(&config, *reserve_in, *reserve_out, *amount, &fees, *referral, cli.json)?;
        }
        Commands::Provide {
            reserve0,
            reserve1,
            supply,
            amount0,
            amount1,
        } => {
            cmd_provide(*reserve0, *reserve1, *supply, *amount0, *amount1, cli.json)?;
        }
        Commands::Burn {
            reserve0,
            reserve1,
            supply,
            amount,
        } => {
            cmd_burn(*reserve0, *reserve1, *supply, *amount, cli.json)?;
        }
        Commands::Demo { amount0, amount1, swap } => {
            cmd_demo(config, *amount0, *amount1, *swap, cli.json)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => return,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&str>) -> Result<ProtocolConfig> {
    let Some(path) = path else {
        return Ok(ProtocolConfig::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("read config '{path}'"))?;
    ProtocolConfig::from_json(&text).with_context(|| format!("parse config '{path}'"))
}

// ─── simulate ────────────────────────────────────────────────────────────────

fn cmd_simulate(
    config: &ProtocolConfig,
    reserve_in: u128,
    reserve_out: u128,
    amount_in: u128,
    fees: &FeeSchedule,
    referral: bool,
    json_output: bool,
) -> Result<()> {
    if amount_in == 0 {
        return Err(anyhow!("--amount must be > 0"));
    }
    if reserve_in == 0 || reserve_out == 0 {
        return Err(anyhow!("Pool has no liquidity: both reserves must be > 0."));
    }
    for (name, fee) in [("--lp-fee", fees.lp_fee), ("--protocol-fee", fees.protocol_fee), ("--ref-fee", fees.ref_fee)] {
        if fee > config.max_fee {
            return Err(anyhow!("{name} {fee} exceeds the maximum of {}", config.max_fee));
        }
    }

    let quote = math::compute_swap(amount_in, reserve_in, reserve_out, fees, referral)
        .ok_or_else(|| anyhow!("swap overflows the coin range"))?;
    let lp_fee = math::mul_div(amount_in, fees.lp_fee as u128, fees.divider as u128).unwrap_or(0);

    if json_output {
        println!("{}", json!({
            "status":           "ok",
            "command":          "simulate",
            "amount_in":        amount_in.to_string(),
            "reserve_in":       reserve_in.to_string(),
            "reserve_out":      reserve_out.to_string(),
            "lp_fee":           fees.lp_fee,
            "protocol_fee":     fees.protocol_fee,
            "ref_fee":          fees.ref_fee,
            "fee_divider":      fees.divider,
            "referral":         referral,
            "amount_out":       quote.amount_out.to_string(),
            "protocol_fee_out": quote.protocol_fee.to_string(),
            "ref_fee_out":      quote.ref_fee.to_string(),
            "lp_fee_out":       lp_fee.to_string(),
            "reserve_in_after": reserve_in.saturating_add(amount_in).to_string(),
            "reserve_out_after": reserve_out.saturating_sub(quote.reserve_out_delta).to_string(),
        }));
    } else {
        let pct = |fee: u8| fee as f64 * 100.0 / fees.divider as f64;
        println!("─── Swap Simulation ──────────────────────────────────────────────");
        println!("  Reserve in       {:>24}", reserve_in);
        println!("  Reserve out      {:>24}", reserve_out);
        println!();
        println!("  ─── Fee Breakdown ────────────────────────────────");
        println!("  Amount in        {:>24}", amount_in);
        println!("  LP fee (input)   {:>24}  ({:.2}%  →  reserves)", lp_fee, pct(fees.lp_fee));
        println!();
        println!("  ─── Output Estimate ──────────────────────────────");
        println!("  Gross out        {:>24}", quote.reserve_out_delta);
        println!("  Protocol fee     {:>24}  ({:.2}%  →  collected)", quote.protocol_fee, pct(fees.protocol_fee));
        if referral {
            println!("  Referral fee     {:>24}  ({:.2}%  →  referrer)", quote.ref_fee, pct(fees.ref_fee));
        }
        println!("  Amount out       {:>24}", quote.amount_out);
        println!("  Reserve out after{:>24}", reserve_out.saturating_sub(quote.reserve_out_delta));
    }
    Ok(())
}

// ─── provide ─────────────────────────────────────────────────────────────────

fn cmd_provide(
    reserve0: u128,
    reserve1: u128,
    supply: u128,
    amount0: u128,
    amount1: u128,
    json_output: bool,
) -> Result<()> {
    if amount0 == 0 || amount1 == 0 {
        return Err(anyhow!("--amount0 and --amount1 must both be > 0"));
    }
    if supply > 0 && (reserve0 == 0 || reserve1 == 0) {
        return Err(anyhow!("A pool with LP supply needs non-zero reserves."));
    }
    let minted = math::lp_to_mint(amount0, amount1, reserve0, reserve1, supply)
        .ok_or_else(|| anyhow!("deposit overflows the coin range"))?;

    if json_output {
        println!("{}", json!({
            "status":     "ok",
            "command":    "provide",
            "amount0":    amount0.to_string(),
            "amount1":    amount1.to_string(),
            "reserve0":   reserve0.to_string(),
            "reserve1":   reserve1.to_string(),
            "supply":     supply.to_string(),
            "lp_minted":  minted.to_string(),
            "first_deposit": supply == 0,
        }));
    } else {
        println!("─── Liquidity Quote ──────────────────────────────────────────────");
        println!("  Deposit token0   {:>24}", amount0);
        println!("  Deposit token1   {:>24}", amount1);
        println!("  LP supply        {:>24}", supply);
        println!();
        println!("  LP minted        {:>24}", minted);
        if minted == 0 {
            println!("  A zero mint is refunded in full by the pool.");
        }
    }
    Ok(())
}

// ─── burn ────────────────────────────────────────────────────────────────────

fn cmd_burn(reserve0: u128, reserve1: u128, supply: u128, amount: u128, json_output: bool) -> Result<()> {
    if amount == 0 {
        return Err(anyhow!("--amount must be > 0"));
    }
    let (out0, out1) = math::burn_amounts(amount, reserve0, reserve1, supply)
        .ok_or_else(|| anyhow!("cannot burn {amount} out of a supply of {supply}"))?;

    if json_output {
        println!("{}", json!({
            "status":   "ok",
            "command":  "burn",
            "amount":   amount.to_string(),
            "supply":   supply.to_string(),
            "amount0":  out0.to_string(),
            "amount1":  out1.to_string(),
        }));
    } else {
        println!("─── Burn Quote ───────────────────────────────────────────────────");
        println!("  LP burned        {:>24}  of {}", amount, supply);
        println!("  Token0 out       {:>24}", out0);
        println!("  Token1 out       {:>24}", out1);
    }
    Ok(())
}

// ─── demo ────────────────────────────────────────────────────────────────────

fn code(tag: u32) -> Result<Cell> {
    let mut b = Builder::new();
    b.store_u32(tag)?;
    Ok(b.build())
}

fn notify(router: Identity, wallet: Identity, amount: u128, payload: JettonPayload) -> Result<InternalMessage> {
    let body = RouterMessage::TransferNotification {
        jetton_amount: amount,
        from_user: Identity::from_seed("demo user"),
        forward_payload: payload.to_cell()?,
    };
    Ok(InternalMessage::new(wallet, router, ONE_TON, 0, body)?)
}

fn describe(tx: &Transaction) -> Value {
    let outcome = match &tx.outcome {
        TxOutcome::Committed { messages, code_replaced } => json!({
            "status": "committed",
            "messages": messages,
            "code_replaced": code_replaced,
        }),
        TxOutcome::Failed { exit_code, reason, bounced } => json!({
            "status": "failed",
            "exit_code": exit_code,
            "reason": reason,
            "bounced": bounced,
        }),
        TxOutcome::Delivered => json!({ "status": "delivered" }),
    };
    json!({
        "lt":       tx.lt,
        "account":  tx.account.to_string(),
        "sender":   tx.sender.to_string(),
        "op":       tx.op.map(|op| format!("{op:#010x}")),
        "value":    tx.value.to_string(),
        "deployed": tx.deployed,
        "outcome":  outcome,
    })
}

fn cmd_demo(config: ProtocolConfig, amount0: u128, amount1: u128, swap: u128, json_output: bool) -> Result<()> {
    let admin = Identity::from_seed("demo admin");
    let user = Identity::from_seed("demo user");
    let (pool_code, lp_wallet_code, lp_account_code) = (code(0x9001)?, code(0x9002)?, code(0x9003)?);

    let mut ledger = Ledger::new(config);
    let router_state = RouterState::new(admin, pool_code.clone(), lp_wallet_code, lp_account_code.clone());
    let router = ledger.deploy(code(0x9000)?, ActorState::Router(router_state.clone()), ONE_TON)?;
    ledger.register_code(jetton_amm::ActorKind::Pool, &pool_code);
    ledger.register_code(jetton_amm::ActorKind::LpAccount, &lp_account_code);
    info!(%router, "router deployed");

    let (wallet0, wallet1) = sort_pair(
        Identity::from_seed("demo router wallet A"),
        Identity::from_seed("demo router wallet B"),
    );
    let pool = router_state.pool_address(router, wallet0, wallet1)?;

    let mut steps: Vec<(&str, Vec<Transaction>)> = Vec::new();
    let provide0 = JettonPayload::ProvideLiquidity { other_wallet: wallet1, min_lp_out: 1 };
    steps.push(("provide token0", ledger.execute(notify(router, wallet0, amount0, provide0)?)?));
    let provide1 = JettonPayload::ProvideLiquidity { other_wallet: wallet0, min_lp_out: 1 };
    steps.push(("provide token1", ledger.execute(notify(router, wallet1, amount1, provide1)?)?));

    let swap_payload = JettonPayload::Swap {
        other_wallet: wallet1,
        min_out: 1,
        to_address: user,
        referral: None,
    };
    steps.push(("swap token0 → token1", ledger.execute(notify(router, wallet0, swap, swap_payload)?)?));

    let state = ledger.pool(&pool).ok_or_else(|| anyhow!("pool {pool} was not deployed"))?.clone();
    let lp_wallet = state.lp_wallet_address(pool, user)?;
    let burn_amount = state.total_supply_lp / 2;
    let burn = InternalMessage::new(
        lp_wallet,
        pool,
        ONE_TON,
        0,
        PoolMessage::BurnNotification {
            jetton_amount: burn_amount,
            from_user: user,
            response_address: None,
        },
    )?;
    steps.push(("burn half of the LP supply", ledger.execute(burn)?));

    let state = ledger.pool(&pool).ok_or_else(|| anyhow!("pool {pool} was not deployed"))?;
    let payouts: Vec<Value> = [wallet0, wallet1]
        .iter()
        .flat_map(|wallet| {
            ledger.inbox(wallet).iter().filter_map(move |msg| {
                match msg.decode::<JettonMessage>().ok()?.payload {
                    JettonMessage::Transfer { jetton_amount, destination, .. } => Some(json!({
                        "wallet": wallet.to_string(),
                        "to": destination.to_string(),
                        "amount": jetton_amount.to_string(),
                    })),
                    _ => None,
                }
            })
        })
        .collect();

    if json_output {
        let steps: Vec<Value> = steps
            .iter()
            .map(|(name, receipts)| json!({
                "step": name,
                "transactions": receipts.iter().map(describe).collect::<Vec<_>>(),
            }))
            .collect();
        println!("{}", json!({
            "status":   "ok",
            "command":  "demo",
            "router":   router.to_string(),
            "pool":     pool.to_string(),
            "steps":    steps,
            "payouts":  payouts,
            "pool_state": {
                "reserve0":        state.reserve0.to_string(),
                "reserve1":        state.reserve1.to_string(),
                "total_supply_lp": state.total_supply_lp.to_string(),
            },
        }));
        return Ok(());
    }

    println!("─── In-memory Walkthrough ────────────────────────────────────────");
    println!("  Router   {router}");
    println!("  Pool     {pool}");
    for (name, receipts) in &steps {
        println!();
        println!("  ─── {name} ───");
        for tx in receipts {
            let op = tx.op.map(op_name).unwrap_or("-");
            let outcome = match &tx.outcome {
                TxOutcome::Committed { messages, .. } => format!("ok, {messages} out"),
                TxOutcome::Failed { exit_code, reason, .. } => format!("failed {exit_code}: {reason}"),
                TxOutcome::Delivered => "delivered".to_string(),
            };
            let deployed = if tx.deployed { "  (deployed)" } else { "" };
            println!("  #{:<3} {:<22} → {}  {outcome}{deployed}", tx.lt, op, tx.account);
        }
    }
    println!();
    println!("  ─── Pool ───");
    println!("  Reserve0         {:>24}", state.reserve0);
    println!("  Reserve1         {:>24}", state.reserve1);
    println!("  LP supply        {:>24}", state.total_supply_lp);
    println!();
    println!("  ─── Jetton payouts ───");
    for payout in &payouts {
        let field = |key: &str| payout[key].as_str().unwrap_or_default().to_string();
        println!("  {} → {}  {}", field("wallet"), field("to"), field("amount"));
    }
    Ok(())
}

fn op_name(code: u32) -> &'static str {
    match code {
        op::TRANSFER_NOTIFICATION => "transfer_notification",
        op::TRANSFER => "transfer",
        op::INTERNAL_TRANSFER => "internal_transfer",
        op::EXCESSES => "excesses",
        op::BURN_NOTIFICATION => "burn_notification",
        op::SWAP => "swap",
        op::PROVIDE_LP => "provide_lp",
        op::PAY_TO => "pay_to",
        op::CB_ADD_LIQUIDITY => "cb_add_liquidity",
        op::CB_REFUND_ME => "cb_refund_me",
        op::ADD_LIQUIDITY => "add_liquidity",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn op_names_cover_saga() {
        assert_eq!(op_name(op::PAY_TO), "pay_to");
        assert_eq!(op_name(0), "other");
    }
}
