use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use fiat_pool_sdk::{
    AddLiquidityRequest, ApiRequest, CreatePoolRequest, DepositRequest, FiatPoolClient,
    JsonFileStore, RemoveLiquidityRequest, ServiceConfig, SetRateRequest, SetStatusRequest,
    SnapshotStore, SwapDirection, SwapEthForTokensRequest, SwapTokensForEthRequest,
    TransactionReceipt, WithdrawalRequest, DEFAULT_OWNER,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// Wei per ETH, for human-readable output only.
const WEI_PER_ETH: f64 = 1e18;

/// Parse a non-negative integer amount in the smallest unit.
fn parse_amount(s: &str) -> std::result::Result<u128, String> {
    fiat_pool::decimal::parse(s).map_err(|e| e.to_string())
}

// ─── Version banner ───────────────────────────────────────────────────────────

/// Print the Fiat Pool banner to stdout.
fn print_banner() {
    let ver = env!("CARGO_PKG_VERSION");
    println!();
    println!("  Fiat Pool  v{ver}  ·  ETH / fiat liquidity for the payment gateway");
    println!("  {}", "─".repeat(62));
    println!("  Pools     USD · EUR · GBP  (owner can add more)");
    println!("  Curve     constant product  x · y = k");
    println!("  Fees      0.01%–1.00% LP (per pool, default 0.30%)");
    println!();
}

// ─── CLI definition ───────────────────────────────────────────────────────────

/// Fiat Pool: constant-product ETH / fiat-token liquidity pools.
///
/// Every command supports --json for machine-readable output.
/// Global options can also be set via environment variables:
///   FIAT_POOL_STATE  snapshot file the ledger is loaded from and saved to
///   FIAT_POOL_OWNER  admin address allowed to manage pools and rates
#[derive(Parser)]
#[command(
    name        = "fiat-pool",
    version     = env!("CARGO_PKG_VERSION"),
    long_version = concat!(
        env!("CARGO_PKG_VERSION"), "\n",
        "Curve:        constant product (x · y = k)\n",
        "LP fee range: 1–100 bps  (0.01%–1.00%, set per pool)\n",
        "Amounts:      integers in the smallest unit (wei / token units)\n",
        "License:      MIT",
    ),
    about   = "ETH / fiat-token liquidity pools for a fiat payment gateway.",
    after_help = "\
ENVIRONMENT:
  FIAT_POOL_STATE   Snapshot file  [default: fiat-pool-state.json]
  FIAT_POOL_OWNER   Admin address  [default: 0xD9A6e4718919BCE695FC0Cd984b7f28B08d044D3]
  RUST_LOG          Log filter when --log-level is not given  [default: warn]

QUICK START:
  fiat-pool add-liquidity --currency USD --address 0xA1… --eth 1000000 --token 1800000000
  fiat-pool simulate      --currency USD --direction eth-to-token --amount 1000
  fiat-pool swap          --currency USD --direction eth-to-token --amount 1000 --address 0xB2…
  fiat-pool pool-info     --currency USD"
)]
struct Cli {
    /// Snapshot file holding pools, positions, rates and fiat transactions
    #[arg(
        long,
        global     = true,
        value_name = "PATH",
        default_value = "fiat-pool-state.json",
        env = "FIAT_POOL_STATE"
    )]
    state: String,

    /// Admin address for owner-only commands
    #[arg(
        long,
        global     = true,
        value_name = "ADDRESS",
        default_value = DEFAULT_OWNER,
        env = "FIAT_POOL_OWNER"
    )]
    owner: String,

    /// Output machine-readable JSON instead of human-readable text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Log filter (e.g. `debug`, `fiat_pool=info`); logs go to stderr
    #[arg(long, global = true, value_name = "FILTER")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every pool with reserves, shares and status
    Pools,

    /// Show one pool's reserves, total shares, fee and spot price
    PoolInfo {
        /// Currency symbol, e.g. USD
        #[arg(long, value_name = "SYMBOL")]
        currency: String,
    },

    /// Show LP positions for an address
    ///
    /// With --currency, shows that pool only (zero if the address holds
    /// nothing). Without it, lists every non-zero position.
    Position {
        #[arg(long, value_name = "ADDRESS")]
        address: String,

        #[arg(long, value_name = "SYMBOL")]
        currency: Option<String>,
    },

    /// Deposit ETH and fiat tokens, receive LP shares
    #[command(
        after_help = "\
EXAMPLES:
  # Seed an empty pool at 1800 tokens per wei-unit of ETH
  fiat-pool add-liquidity --currency USD --address 0xA1… --eth 1000000 --token 1800000000

NOTES:
  The first deposit sets the price and mints sqrt(eth × token) shares.
  Later deposits mint the smaller of the two pro-rata share counts;
  any excess on the other side stays in the pool."
    )]
    AddLiquidity {
        #[arg(long, value_name = "SYMBOL")]
        currency: String,

        #[arg(long, value_name = "ADDRESS")]
        address: String,

        /// ETH amount in wei
        #[arg(long, value_name = "AMOUNT", value_parser = parse_amount)]
        eth: u128,

        /// Fiat-token amount in smallest units
        #[arg(long, value_name = "AMOUNT", value_parser = parse_amount)]
        token: u128,
    },

    /// Burn LP shares and receive both reserves pro rata (rounded down)
    RemoveLiquidity {
        #[arg(long, value_name = "SYMBOL")]
        currency: String,

        #[arg(long, value_name = "ADDRESS")]
        address: String,

        #[arg(long, value_name = "SHARES", value_parser = parse_amount)]
        shares: u128,
    },

    /// Execute a swap against a pool
    #[command(
        after_help = "\
EXAMPLES:
  # Sell 1000 wei for USD tokens, refuse anything under 1700000
  fiat-pool swap --currency USD --direction eth-to-token --amount 1000 \\
                 --address 0xB2… --min-out 1700000

  # Sell tokens back for ETH
  fiat-pool swap --currency USD --direction token-to-eth --amount 1800000 --address 0xB2…"
    )]
    Swap {
        #[arg(long, value_name = "SYMBOL")]
        currency: String,

        /// eth-to-token or token-to-eth
        #[arg(long, value_name = "DIRECTION")]
        direction: SwapDirection,

        /// Input amount in the input asset's smallest unit
        #[arg(long, value_name = "AMOUNT", value_parser = parse_amount)]
        amount: u128,

        #[arg(long, value_name = "ADDRESS")]
        address: String,

        /// Fail instead of receiving less than this
        #[arg(long, value_name = "AMOUNT", value_parser = parse_amount, default_value = "0")]
        min_out: u128,
    },

    /// Quote a swap: fee, output and price impact; nothing is changed
    Simulate {
        #[arg(long, value_name = "SYMBOL")]
        currency: String,

        #[arg(long, value_name = "DIRECTION")]
        direction: SwapDirection,

        #[arg(long, value_name = "AMOUNT", value_parser = parse_amount)]
        amount: u128,
    },

    /// Create an empty pool (owner only)
    CreatePool {
        #[arg(long, value_name = "SYMBOL")]
        currency: String,

        /// LP fee in basis points; defaults to 30
        #[arg(long, value_name = "BPS")]
        fee_bps: Option<u16>,

        /// Calling address; defaults to --owner
        #[arg(long, value_name = "ADDRESS")]
        caller: Option<String>,
    },

    /// List fiat exchange rates
    Rates,

    /// Convert a fiat amount to wei at the current rate
    Convert {
        #[arg(long, value_name = "SYMBOL")]
        currency: String,

        /// Whole fiat units
        #[arg(long, value_name = "AMOUNT", value_parser = parse_amount)]
        amount: u128,
    },

    /// Check whether an address is the configured owner
    CheckOwner {
        #[arg(long, value_name = "ADDRESS")]
        address: String,
    },

    /// Set a currency's exchange rate (owner only)
    SetRate {
        #[arg(long, value_name = "SYMBOL")]
        currency: String,

        /// Fiat units per ETH scaled by 10^decimals
        #[arg(long, value_name = "RATE", value_parser = parse_amount)]
        rate: u128,

        #[arg(long, value_name = "N", default_value_t = 8)]
        decimals: u8,

        #[arg(long, value_name = "ADDRESS")]
        caller: Option<String>,
    },

    /// Activate or deactivate a currency and its pool (owner only)
    SetStatus {
        #[arg(long, value_name = "SYMBOL")]
        currency: String,

        #[arg(long, value_name = "BOOL", action = clap::ArgAction::Set)]
        active: bool,

        #[arg(long, value_name = "ADDRESS")]
        caller: Option<String>,
    },

    /// Record a completed fiat deposit (idempotent per transaction hash)
    Deposit {
        #[arg(long, value_name = "ADDRESS")]
        address: String,

        #[arg(long, value_name = "SYMBOL")]
        currency: String,

        #[arg(long, value_name = "AMOUNT", value_parser = parse_amount)]
        amount: u128,

        #[arg(long, value_name = "HASH")]
        tx_hash: String,
    },

    /// Record a completed fiat withdrawal (idempotent per transaction hash)
    ///
    /// Refused when the amount exceeds what the address has deposited in
    /// that currency, net of earlier withdrawals.
    Withdraw {
        #[arg(long, value_name = "ADDRESS")]
        address: String,

        #[arg(long, value_name = "SYMBOL")]
        currency: String,

        #[arg(long, value_name = "AMOUNT", value_parser = parse_amount)]
        amount: u128,

        #[arg(long, value_name = "HASH")]
        tx_hash: String,
    },

    /// List recorded deposits and withdrawals for an address
    #[command(alias = "deposits")]
    Transactions {
        #[arg(long, value_name = "ADDRESS")]
        address: String,
    },

    /// Run a file of JSON requests, one per line
    #[command(
        after_help = "\
FORMAT:
  One object per line, tagged by \"op\"; amounts are decimal strings.
  Blank lines and lines starting with # are skipped.

  {\"op\":\"add-liquidity\",\"currency\":\"USD\",\"address\":\"0xA1…\",\"ethAmount\":\"100\",\"tokenAmount\":\"400\"}
  {\"op\":\"swap-eth-to-token\",\"currency\":\"USD\",\"address\":\"0xB2…\",\"ethIn\":\"10\",\"minOut\":\"30\"}

OUTPUT:
  One JSON line per request: {\"line\", \"status\", \"body\"}.
  A failed request does not stop the batch."
    )]
    Batch {
        #[arg(value_name = "FILE")]
        file: String,
    },

    /// Service status and counts
    Health,
}

impl Commands {
    /// Commands whose effects must be written back to the state file.
    fn mutates(&self) -> bool {
        matches!(
            self,
            Commands::AddLiquidity { .. }
                | Commands::RemoveLiquidity { .. }
                | Commands::Swap { .. }
                | Commands::CreatePool { .. }
                | Commands::SetRate { .. }
                | Commands::SetStatus { .. }
                | Commands::Deposit { .. }
                | Commands::Withdraw { .. }
                | Commands::Batch { .. }
        )
    }

    fn name(&self) -> &'static str {
        match self {
            Commands::Pools                => "pools",
            Commands::PoolInfo { .. }      => "pool-info",
            Commands::Position { .. }      => "position",
            Commands::AddLiquidity { .. }  => "add-liquidity",
            Commands::RemoveLiquidity { .. } => "remove-liquidity",
            Commands::Swap { .. }          => "swap",
            Commands::Simulate { .. }      => "simulate",
            Commands::CreatePool { .. }    => "create-pool",
            Commands::Rates                => "rates",
            Commands::Convert { .. }       => "convert",
            Commands::CheckOwner { .. }    => "check-owner",
            Commands::SetRate { .. }       => "set-rate",
            Commands::SetStatus { .. }     => "set-status",
            Commands::Deposit { .. }       => "deposit",
            Commands::Withdraw { .. }      => "withdraw",
            Commands::Transactions { .. }  => "transactions",
            Commands::Batch { .. }         => "batch",
            Commands::Health               => "health",
        }
    }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

fn main() {
    // When invoked with no arguments, show banner + full help and exit cleanly.
    if std::env::args().len() == 1 {
        print_banner();
        Cli::command().print_long_help().ok();
        println!();
        return;
    }

    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    if let Err(err) = run(&cli) {
        if cli.json {
            let (kind, message) = match err.downcast_ref::<fiat_pool_sdk::Error>() {
                Some(sdk) => (sdk.kind(), sdk.to_string()),
                None      => ("Error", format!("{err:#}")),
            };
            println!("{}", json!({
                "status":  "error",
                "command": cli.command.name(),
                "error":   kind,
                "message": message,
            }));
        } else {
            eprintln!("Error: {err:#}");
        }
        std::process::exit(1);
    }
}

/// stderr logging; `--log-level` wins over `RUST_LOG`, default `warn`.
fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let store  = JsonFileStore::new(&cli.state);
    // Held from load through save so concurrent writers apply one at a time
    let _lock = if cli.command.mutates() {
        let lock = store
            .lock()
            .with_context(|| format!("locking state file '{}'", cli.state))?;
        Some(lock)
    } else {
        None
    };
    let client = open_client(&store, &cli.owner)?;
    let owner  = cli.owner.as_str();
    let json   = cli.json;

    match &cli.command {
        Commands::Pools => cmd_pools(&client, json)?,
        Commands::PoolInfo { currency } => cmd_pool_info(&client, currency, json)?,
        Commands::Position { address, currency } => {
            cmd_position(&client, address, currency.as_deref(), json)?
        }
        Commands::AddLiquidity { currency, address, eth, token } => {
            cmd_add_liquidity(&client, currency, address, *eth, *token, json)?
        }
        Commands::RemoveLiquidity { currency, address, shares } => {
            cmd_remove_liquidity(&client, currency, address, *shares, json)?
        }
        Commands::Swap { currency, direction, amount, address, min_out } => {
            cmd_swap(&client, currency, *direction, *amount, address, *min_out, json)?
        }
        Commands::Simulate { currency, direction, amount } => {
            cmd_simulate(&client, currency, *direction, *amount, json)?
        }
        Commands::CreatePool { currency, fee_bps, caller } => {
            cmd_create_pool(&client, caller.as_deref().unwrap_or(owner), currency, *fee_bps, json)?
        }
        Commands::Rates => cmd_rates(&client, json)?,
        Commands::Convert { currency, amount } => cmd_convert(&client, currency, *amount, json)?,
        Commands::CheckOwner { address } => cmd_check_owner(&client, address, json)?,
        Commands::SetRate { currency, rate, decimals, caller } => cmd_set_rate(
            &client, caller.as_deref().unwrap_or(owner), currency, *rate, *decimals, json,
        )?,
        Commands::SetStatus { currency, active, caller } => {
            cmd_set_status(&client, caller.as_deref().unwrap_or(owner), currency, *active, json)?
        }
        Commands::Deposit { address, currency, amount, tx_hash } => {
            cmd_deposit(&client, address, currency, *amount, tx_hash, json)?
        }
        Commands::Withdraw { address, currency, amount, tx_hash } => {
            cmd_withdraw(&client, address, currency, *amount, tx_hash, json)?
        }
        Commands::Transactions { address } => cmd_transactions(&client, address, json)?,
        Commands::Batch { file } => cmd_batch(&client, Path::new(file))?,
        Commands::Health => cmd_health(&client, &store, json)?,
    }

    if cli.command.mutates() {
        store
            .save(&client.snapshot())
            .with_context(|| format!("saving state to '{}'", cli.state))?;
    }
    Ok(())
}

/// Resume from the state file, or start a fresh service if there is none.
fn open_client(store: &JsonFileStore, owner: &str) -> Result<FiatPoolClient> {
    let config = ServiceConfig::default().with_owner(owner);
    let loaded = store
        .load()
        .with_context(|| format!("loading state from '{}'", store.path().display()))?;
    let client = match loaded {
        Some(snapshot) => FiatPoolClient::from_snapshot(config, snapshot)?,
        None => FiatPoolClient::new(config)?,
    };
    Ok(client)
}

fn eth(wei: u128) -> f64 {
    wei as f64 / WEI_PER_ETH
}

fn spot_price(pool: &fiat_pool_sdk::Pool) -> f64 {
    fiat_pool_sdk::math::spot_price(pool)
}

fn status_label(is_active: bool) -> &'static str {
    if is_active { "active" } else { "INACTIVE" }
}

// ─── pools ────────────────────────────────────────────────────────────────────

fn cmd_pools(client: &FiatPoolClient, json_output: bool) -> Result<()> {
    let pools = client.pools();
    if json_output {
        println!("{}", json!({
            "status":  "ok",
            "command": "pools",
            "pools":   pools,
        }));
    } else {
        println!("─── Pools ({}) ───────────────────────────────────────────────────", pools.len());
        println!("  {:<8} {:>22} {:>22} {:>18}  {:>5}  Status", "Symbol", "ETH reserve", "Token reserve", "Shares", "Fee");
        for p in &pools {
            println!(
                "  {:<8} {:>22} {:>22} {:>18}  {:>5}  {}",
                p.symbol, p.eth_reserve, p.token_reserve, p.total_shares,
                p.fee_rate_bps, status_label(p.is_active)
            );
        }
    }
    Ok(())
}

// ─── pool-info ────────────────────────────────────────────────────────────────

fn cmd_pool_info(client: &FiatPoolClient, currency: &str, json_output: bool) -> Result<()> {
    let pool = client.pool_info(currency)?;
    let spot = spot_price(&pool);

    if json_output {
        println!("{}", json!({
            "status":             "ok",
            "command":            "pool-info",
            "pool":               pool,
            "fee_rate_pct":       pool.fee_rate_bps as f64 / 100.0,
            "spot_price_token_per_eth": spot,
        }));
    } else {
        println!("─── Pool Info: {} ──────────────────────────────────────────────", pool.symbol);
        println!("  Status           {}", status_label(pool.is_active));
        println!("  ETH reserve      {:>24}  ({:.6} ETH)", pool.eth_reserve, eth(pool.eth_reserve));
        println!("  Token reserve    {:>24}", pool.token_reserve);
        println!("  Total shares     {:>24}", pool.total_shares);
        println!("  Fee rate         {} bps  ({:.2}% per swap)",
                 pool.fee_rate_bps, pool.fee_rate_bps as f64 / 100.0);
        if pool.is_empty() {
            println!("  Spot price       — (pool is empty, no liquidity)");
        } else {
            println!("  Spot price       {spot:.8}  {}/ETH  (raw units)", pool.symbol);
        }
    }
    Ok(())
}

// ─── position ─────────────────────────────────────────────────────────────────

fn cmd_position(
    client: &FiatPoolClient,
    address: &str,
    currency: Option<&str>,
    json_output: bool,
) -> Result<()> {
    let rows: Vec<(String, fiat_pool_sdk::PositionView)> = match currency {
        Some(currency) => {
            let pool = client.pool_info(currency)?;
            vec![(pool.symbol, client.position(currency, address)?)]
        }
        None => client
            .positions(address)?
            .into_iter()
            .map(|e| (e.currency, e.position))
            .collect(),
    };

    if json_output {
        let items: Vec<_> = rows.iter().map(|(currency, pos)| json!({
            "currency":   currency,
            "shares":     pos.shares.to_string(),
            "ethShare":   pos.eth_share.to_string(),
            "tokenShare": pos.token_share.to_string(),
        })).collect();
        println!("{}", json!({
            "status":    "ok",
            "command":   "position",
            "address":   address,
            "positions": items,
        }));
    } else {
        println!("─── Positions: {address} ─────────────");
        if rows.is_empty() {
            println!("  No positions.");
        }
        for (currency, pos) in &rows {
            println!();
            println!("  {currency}");
            println!("    Shares         {:>24}", pos.shares);
            println!("    ETH claim      {:>24}", pos.eth_share);
            println!("    Token claim    {:>24}", pos.token_share);
        }
    }
    Ok(())
}

// ─── add-liquidity ────────────────────────────────────────────────────────────

fn cmd_add_liquidity(
    client: &FiatPoolClient,
    currency: &str,
    address: &str,
    eth_amount: u128,
    token_amount: u128,
    json_output: bool,
) -> Result<()> {
    let result = client.add_liquidity(currency, AddLiquidityRequest {
        address: address.to_string(),
        eth_amount,
        token_amount,
    })?;

    if json_output {
        println!("{}", json!({
            "status":       "ok",
            "command":      "add-liquidity",
            "address":      address,
            "ethAmount":    eth_amount.to_string(),
            "tokenAmount":  token_amount.to_string(),
            "sharesMinted": result.shares_minted.to_string(),
            "pool":         result.pool,
        }));
    } else {
        println!("─── Liquidity Added ──────────────────────────────────────────────");
        println!("  Pool             {}", result.pool.symbol);
        println!("  ETH in           {:>24}", eth_amount);
        println!("  Token in         {:>24}", token_amount);
        println!("  Shares minted    {:>24}", result.shares_minted);
        println!();
        println!("  ETH reserve      {:>24}", result.pool.eth_reserve);
        println!("  Token reserve    {:>24}", result.pool.token_reserve);
        println!("  Total shares     {:>24}", result.pool.total_shares);
    }
    Ok(())
}

// ─── remove-liquidity ─────────────────────────────────────────────────────────

fn cmd_remove_liquidity(
    client: &FiatPoolClient,
    currency: &str,
    address: &str,
    shares: u128,
    json_output: bool,
) -> Result<()> {
    let result = client.remove_liquidity(currency, RemoveLiquidityRequest {
        address: address.to_string(),
        share_amount: shares,
    })?;

    if json_output {
        println!("{}", json!({
            "status":        "ok",
            "command":       "remove-liquidity",
            "address":       address,
            "sharesBurned":  shares.to_string(),
            "ethReturned":   result.eth_returned.to_string(),
            "tokenReturned": result.token_returned.to_string(),
            "pool":          result.pool,
        }));
    } else {
        println!("─── Liquidity Removed ────────────────────────────────────────────");
        println!("  Pool             {}", result.pool.symbol);
        println!("  Shares burned    {:>24}", shares);
        println!("  ETH returned     {:>24}", result.eth_returned);
        println!("  Token returned   {:>24}", result.token_returned);
        println!();
        println!("  ETH reserve      {:>24}", result.pool.eth_reserve);
        println!("  Token reserve    {:>24}", result.pool.token_reserve);
    }
    Ok(())
}

// ─── swap ─────────────────────────────────────────────────────────────────────

fn cmd_swap(
    client: &FiatPoolClient,
    currency: &str,
    direction: SwapDirection,
    amount_in: u128,
    address: &str,
    min_out: u128,
    json_output: bool,
) -> Result<()> {
    let address = address.to_string();
    let (amount_out, pool) = match direction {
        SwapDirection::EthToToken => {
            let r = client.swap_eth_for_tokens(currency, SwapEthForTokensRequest {
                address: address.clone(), eth_in: amount_in, min_out,
            })?;
            (r.token_out, r.pool)
        }
        SwapDirection::TokenToEth => {
            let r = client.swap_tokens_for_eth(currency, SwapTokensForEthRequest {
                address: address.clone(), token_in: amount_in, min_out,
            })?;
            (r.eth_out, r.pool)
        }
    };
    let (asset_in, asset_out) = match direction {
        SwapDirection::EthToToken => ("ETH", pool.symbol.as_str()),
        SwapDirection::TokenToEth => (pool.symbol.as_str(), "ETH"),
    };

    if json_output {
        println!("{}", json!({
            "status":    "ok",
            "command":   "swap",
            "address":   address,
            "direction": direction,
            "amountIn":  amount_in.to_string(),
            "amountOut": amount_out.to_string(),
            "minOut":    min_out.to_string(),
            "pool":      pool,
        }));
    } else {
        println!("─── Swap Executed ────────────────────────────────────────────────");
        println!("  {asset_in} → {asset_out}");
        println!("  Sold             {:>24}  {asset_in}", amount_in);
        println!("  Received         {:>24}  {asset_out}", amount_out);
        if min_out > 0 {
            println!("  Min out          {:>24}", min_out);
        }
        println!();
        println!("  ETH reserve      {:>24}", pool.eth_reserve);
        println!("  Token reserve    {:>24}", pool.token_reserve);
    }
    Ok(())
}

// ─── simulate ─────────────────────────────────────────────────────────────────

fn cmd_simulate(
    client: &FiatPoolClient,
    currency: &str,
    direction: SwapDirection,
    amount_in: u128,
    json_output: bool,
) -> Result<()> {
    if amount_in == 0 {
        return Err(anyhow!("--amount must be > 0 (smallest units: wei for ETH)"));
    }
    let sim = client.simulate(currency, direction, amount_in)?;

    if json_output {
        println!("{}", json!({
            "status":  "ok",
            "command": "simulate",
            "quote":   sim,
        }));
    } else {
        println!("─── Swap Simulation ──────────────────────────────────────────────");
        println!("  {}  [{}]", sim.currency, direction.as_str());
        println!("  Reserve in       {:>24}", sim.reserve_in);
        println!("  Reserve out      {:>24}", sim.reserve_out);
        println!();
        println!("  ─── Fee Breakdown ────────────────────────────────");
        println!("  Amount in        {:>24}", sim.amount_in);
        println!("  LP fee           {:>24}  ({:.2}%  →  stays in pool)",
                 sim.fee_amount, sim.fee_rate_bps as f64 / 100.0);
        println!("  After fee        {:>24}", sim.after_fee);
        println!();
        println!("  ─── Output Estimate ──────────────────────────────");
        println!("  Estimated out    {:>24}", sim.estimated_out);
        println!("  Effective rate   {:>24.8}  (raw units)", sim.effective_rate);
        println!("  Price impact     {:>23.4}%", sim.price_impact_pct);
        println!();
        println!("  Nothing executed.  To swap:");
        println!("    fiat-pool swap --currency {} --direction {} --amount {} --address <ADDRESS>",
                 sim.currency, direction.as_str(), amount_in);
    }
    Ok(())
}

// ─── create-pool ──────────────────────────────────────────────────────────────

fn cmd_create_pool(
    client: &FiatPoolClient,
    caller: &str,
    currency: &str,
    fee_bps: Option<u16>,
    json_output: bool,
) -> Result<()> {
    let pool = client.create_pool(CreatePoolRequest {
        caller: caller.to_string(),
        currency: currency.to_string(),
        fee_rate_bps: fee_bps,
    })?;

    if json_output {
        println!("{}", json!({
            "status":  "ok",
            "command": "create-pool",
            "pool":    pool,
        }));
    } else {
        println!("─── Pool Created ─────────────────────────────────────────────────");
        println!("  Currency         {}", pool.symbol);
        println!("  Fee rate         {} bps  ({:.2}%)", pool.fee_rate_bps, pool.fee_rate_bps as f64 / 100.0);
        println!();
        println!("  The pool is empty. Seed it with:");
        println!("    fiat-pool add-liquidity --currency {} --address <ADDRESS> --eth <WEI> --token <UNITS>",
                 pool.symbol);
    }
    Ok(())
}

// ─── rates / convert ──────────────────────────────────────────────────────────

fn cmd_rates(client: &FiatPoolClient, json_output: bool) -> Result<()> {
    let rates = client.rates();
    if json_output {
        println!("{}", json!({
            "status":  "ok",
            "command": "rates",
            "rates":   rates,
        }));
    } else {
        println!("─── Fiat Rates ───────────────────────────────────────────────────");
        for entry in &rates {
            let scale = 10f64.powi(entry.rate.decimals as i32);
            println!(
                "  {:<8} {:>18.4} per ETH   (raw {} / 10^{})  {}",
                entry.currency,
                entry.rate.rate as f64 / scale,
                entry.rate.rate,
                entry.rate.decimals,
                status_label(entry.rate.is_active)
            );
        }
    }
    Ok(())
}

fn cmd_convert(client: &FiatPoolClient, currency: &str, amount: u128, json_output: bool) -> Result<()> {
    let conv = client.convert_fiat_to_eth(currency, amount)?;
    if json_output {
        println!("{}", json!({
            "status":     "ok",
            "command":    "convert",
            "currency":   conv.currency,
            "fiatAmount": conv.fiat_amount.to_string(),
            "ethAmount":  conv.eth_amount.to_string(),
            "rate":       conv.rate,
        }));
    } else {
        println!("─── Fiat → ETH ───────────────────────────────────────────────────");
        println!("  {} {}", conv.fiat_amount, conv.currency);
        println!("  = {} wei  ({:.8} ETH)", conv.eth_amount, eth(conv.eth_amount));
    }
    Ok(())
}

// ─── admin ────────────────────────────────────────────────────────────────────

fn cmd_check_owner(client: &FiatPoolClient, address: &str, json_output: bool) -> Result<()> {
    let is_owner = client.check_owner(address);
    if json_output {
        println!("{}", json!({
            "status":  "ok",
            "command": "check-owner",
            "address": address,
            "isOwner": is_owner,
        }));
    } else if is_owner {
        println!("{address} is the owner.");
    } else {
        println!("{address} is not the owner.");
    }
    Ok(())
}

fn cmd_set_rate(
    client: &FiatPoolClient,
    caller: &str,
    currency: &str,
    rate: u128,
    decimals: u8,
    json_output: bool,
) -> Result<()> {
    let entry = client.set_rate(SetRateRequest {
        caller: caller.to_string(),
        currency: currency.to_string(),
        rate,
        decimals,
    })?;
    if json_output {
        println!("{}", json!({
            "status":  "ok",
            "command": "set-rate",
            "rate":    entry,
        }));
    } else {
        println!("─── Rate Updated ─────────────────────────────────────────────────");
        println!("  {}  {} / 10^{}  ({})", entry.currency, entry.rate.rate, entry.rate.decimals,
                 status_label(entry.rate.is_active));
    }
    Ok(())
}

fn cmd_set_status(
    client: &FiatPoolClient,
    caller: &str,
    currency: &str,
    active: bool,
    json_output: bool,
) -> Result<()> {
    let resp = client.set_status(SetStatusRequest {
        caller: caller.to_string(),
        currency: currency.to_string(),
        is_active: active,
    })?;
    if json_output {
        println!("{}", json!({
            "status":   "ok",
            "command":  "set-status",
            "currency": resp.currency,
            "isActive": resp.is_active,
            "pool":     resp.pool,
        }));
    } else {
        println!("─── Status Updated ───────────────────────────────────────────────");
        println!("  {}  {}", resp.currency, status_label(resp.is_active));
        if resp.pool.is_none() {
            println!("  (no pool for this currency; rate only)");
        }
    }
    Ok(())
}

// ─── fiat transactions ────────────────────────────────────────────────────────

fn cmd_deposit(
    client: &FiatPoolClient,
    address: &str,
    currency: &str,
    amount: u128,
    tx_hash: &str,
    json_output: bool,
) -> Result<()> {
    let receipt = client.record_deposit(DepositRequest {
        address: address.to_string(),
        currency: currency.to_string(),
        amount,
        transaction_hash: tx_hash.to_string(),
    })?;
    print_receipt("deposit", "Deposit Recorded", &receipt, json_output);
    Ok(())
}

fn cmd_withdraw(
    client: &FiatPoolClient,
    address: &str,
    currency: &str,
    amount: u128,
    tx_hash: &str,
    json_output: bool,
) -> Result<()> {
    let receipt = client.record_withdrawal(WithdrawalRequest {
        address: address.to_string(),
        currency: currency.to_string(),
        amount,
        transaction_hash: tx_hash.to_string(),
    })?;
    print_receipt("withdraw", "Withdrawal Recorded", &receipt, json_output);
    Ok(())
}

fn print_receipt(command: &str, title: &str, receipt: &TransactionReceipt, json_output: bool) {
    let tx = &receipt.transaction;
    if json_output {
        println!("{}", json!({
            "status":      "ok",
            "command":     command,
            "transaction": tx,
            "balance":     receipt.balance.to_string(),
        }));
    } else {
        println!("─── {title} {}", "─".repeat(60usize.saturating_sub(title.len())));
        println!("  Address          {}", tx.address);
        println!("  Amount           {} {}", tx.amount, tx.currency);
        println!("  Transaction      {}", tx.transaction_hash);
        println!("  Timestamp        {}", tx.timestamp);
        println!("  Balance          {} {}", receipt.balance, tx.currency);
    }
}

fn cmd_transactions(client: &FiatPoolClient, address: &str, json_output: bool) -> Result<()> {
    let resp = client.transactions(address)?;
    if json_output {
        println!("{}", json!({
            "status":       "ok",
            "command":      "transactions",
            "address":      resp.address,
            "transactions": resp.transactions,
        }));
    } else {
        println!("─── Fiat Transactions: {} ─────────────", resp.address);
        if resp.transactions.is_empty() {
            println!("  No transactions.");
        }
        for t in &resp.transactions {
            println!(
                "  {:>14}  {:<10} {:>12} {:<5}  {}",
                t.timestamp, t.kind.as_str(), t.amount, t.currency, t.transaction_hash
            );
        }
    }
    Ok(())
}

// ─── batch ────────────────────────────────────────────────────────────────────

/// Always prints JSON lines, whatever `--json` says.
fn cmd_batch(client: &FiatPoolClient, file: &Path) -> Result<()> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("reading batch file '{}'", file.display()))?;
    for line in run_batch(client, &text) {
        println!("{line}");
    }
    Ok(())
}

fn run_batch(client: &FiatPoolClient, text: &str) -> Vec<serde_json::Value> {
    let mut out = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let entry = match serde_json::from_str::<ApiRequest>(line) {
            Ok(req) => {
                let resp = client.respond(req);
                json!({ "line": idx + 1, "status": resp.status, "body": resp.body })
            }
            Err(e) => {
                tracing::warn!(line = idx + 1, %e, "unparseable batch request");
                json!({
                    "line":   idx + 1,
                    "status": 400,
                    "body":   { "error": "InvalidRequest", "message": e.to_string() },
                })
            }
        };
        out.push(entry);
    }
    out
}

// ─── health ───────────────────────────────────────────────────────────────────

fn cmd_health(client: &FiatPoolClient, store: &JsonFileStore, json_output: bool) -> Result<()> {
    let health = client.health();
    if json_output {
        println!("{}", json!({
            "status":  "ok",
            "command": "health",
            "health":  health,
            "backend": store.backend_type(),
            "state":   store.path().display().to_string(),
        }));
    } else {
        println!("─── Health ───────────────────────────────────────────────────────");
        println!("  Status           {}", health.status);
        println!("  Version          {}", health.version);
        println!("  Pools            {}  ({} active)", health.pools, health.active_pools);
        println!("  Currencies       {}", health.currencies);
        println!("  Transactions     {}", health.transactions);
        println!("  State            {}  ({})", store.path().display(), store.backend_type());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LP: &str = "0x00000000000000000000000000000000000000a1";

    #[test]
    fn amounts_are_strict_decimals() {
        assert_eq!(parse_amount("1000000000000000000000000"), Ok(1_000_000_000_000_000_000_000_000));
        assert!(parse_amount("-5").is_err());
        assert!(parse_amount("1.5").is_err());
    }

    #[test]
    fn cli_parses_swap() {
        let cli = Cli::try_parse_from([
            "fiat-pool", "--json", "swap",
            "--currency", "usd", "--direction", "token-to-eth",
            "--amount", "40", "--address", LP, "--min-out", "5",
        ])
        .unwrap();
        assert!(cli.json);
        assert!(cli.command.mutates());
        match cli.command {
            Commands::Swap { direction, amount, min_out, .. } => {
                assert_eq!(direction, SwapDirection::TokenToEth);
                assert_eq!((amount, min_out), (40, 5));
            }
            _ => panic!("expected swap"),
        }
    }

    #[test]
    fn cli_rejects_unknown_direction() {
        assert!(Cli::try_parse_from([
            "fiat-pool", "simulate", "--currency", "USD", "--direction", "sideways", "--amount", "1",
        ])
        .is_err());
    }

    #[test]
    fn batch_reports_each_line() {
        let client = FiatPoolClient::with_defaults();
        let text = format!(
            "# seed\n\
             {{\"op\":\"add-liquidity\",\"currency\":\"USD\",\"address\":\"{LP}\",\"ethAmount\":\"100\",\"tokenAmount\":\"400\"}}\n\
             \n\
             {{\"op\":\"swap-eth-to-token\",\"currency\":\"USD\",\"address\":\"{LP}\",\"ethIn\":\"10\",\"minOut\":\"99\"}}\n\
             not json\n\
             {{\"op\":\"swap-eth-to-token\",\"currency\":\"USD\",\"address\":\"{LP}\",\"ethIn\":\"10\"}}\n"
        );
        let out = run_batch(&client, &text);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0]["line"], 2);
        assert_eq!(out[0]["body"]["sharesMinted"], "200");
        assert_eq!(out[1]["status"], 400);
        assert_eq!(out[1]["body"]["error"], "SlippageExceeded");
        assert_eq!(out[2]["body"]["error"], "InvalidRequest");
        assert_eq!(out[3]["body"]["tokenOut"], "36");
    }

    #[test]
    fn state_file_persists_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));

        let first = open_client(&store, DEFAULT_OWNER).unwrap();
        first
            .add_liquidity("GBP", AddLiquidityRequest { address: LP.into(), eth_amount: 9, token_amount: 16 })
            .unwrap();
        store.save(&first.snapshot()).unwrap();

        let second = open_client(&store, DEFAULT_OWNER).unwrap();
        assert_eq!(second.position("GBP", LP).unwrap().shares, 12);
    }

    #[test]
    fn concurrent_runs_on_one_state_file_keep_every_deposit() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json").to_string_lossy().into_owned();

        let handles: Vec<_> = (1..=4u32)
            .map(|i| {
                let address = format!("0x{i:040x}");
                let cli = Cli::try_parse_from([
                    "fiat-pool", "--json", "--state", state.as_str(), "add-liquidity",
                    "--currency", "USD", "--address", address.as_str(),
                    "--eth", "100", "--token", "400",
                ])
                .unwrap();
                std::thread::spawn(move || run(&cli).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let client = open_client(&JsonFileStore::new(&state), DEFAULT_OWNER).unwrap();
        let pool = client.pool_info("USD").unwrap();
        assert_eq!((pool.eth_reserve, pool.token_reserve, pool.total_shares), (400, 1_600, 800));
        for i in 1..=4u32 {
            assert_eq!(client.position("USD", &format!("0x{i:040x}")).unwrap().shares, 200);
        }
    }

    #[test]
    fn withdraw_runs_against_recorded_deposits() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json").to_string_lossy().into_owned();
        let cmd = |args: &[&str]| {
            let mut argv = vec!["fiat-pool", "--json", "--state", state.as_str()];
            argv.extend_from_slice(args);
            run(&Cli::try_parse_from(argv).unwrap())
        };
        let fiat = |sub: &'static str, amount: &'static str, hash: &'static str| {
            [sub, "--address", LP, "--currency", "USD", "--amount", amount, "--tx-hash", hash]
        };

        cmd(&fiat("deposit", "500", "0xd1")).unwrap();
        cmd(&fiat("withdraw", "200", "0xw1")).unwrap();
        let err = cmd(&fiat("withdraw", "301", "0xw2")).unwrap_err();
        assert_eq!(
            err.downcast_ref::<fiat_pool_sdk::Error>().map(|e| e.kind()),
            Some("InsufficientFiatBalance")
        );
        cmd(&["deposits", "--address", LP]).unwrap();

        let client = open_client(&JsonFileStore::new(&state), DEFAULT_OWNER).unwrap();
        assert_eq!(client.fiat_balance(LP, "USD").unwrap(), 300);
        assert_eq!(client.transactions(LP).unwrap().transactions.len(), 2);
    }
}
