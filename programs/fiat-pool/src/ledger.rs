//! [`PoolLedger`]: the authoritative in-process store of pools and positions.
//!
//! Each currency's [`PoolEntry`] lives behind its own mutex. The outer map
//! lock is held only long enough to find (or insert) an entry, so operations
//! on different currencies never wait on each other, while operations on the
//! same currency are applied one at a time in lock-acquisition order.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::{
    constants::*,
    error::{require, PoolError, Result},
    instructions::{
        add_liquidity, initialize_pool, remove_liquidity, swap, AddLiquidityResult,
        RemoveLiquidityResult, SwapResult,
    },
    state::{
        normalize_address, normalize_symbol, validate_symbol, LedgerSnapshot, Pool, PoolEntry,
        PoolRecord, PositionRecord, PositionView, SwapDirection,
    },
};

type SharedEntry = Arc<Mutex<PoolEntry>>;

#[derive(Debug, Default)]
pub struct PoolLedger {
    pools: RwLock<HashMap<String, SharedEntry>>,
}

impl PoolLedger {
    /// Ledger with no pools.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger seeded with empty, active USD / EUR / GBP pools at the default fee.
    pub fn with_default_pools() -> Self {
        let ledger = Self::new();
        for symbol in DEFAULT_CURRENCIES {
            if let Err(err) = ledger.create_pool(symbol, FEE_RATE_DEFAULT_BPS) {
                tracing::warn!(currency = %symbol, %err, "default pool not created");
            }
        }
        ledger
    }

    // ── Pool lifecycle ───────────────────────────────────────────────────────

    /// Create an empty pool for `symbol`.
    pub fn create_pool(&self, symbol: &str, fee_rate_bps: u16) -> Result<Pool> {
        let entry = initialize_pool::handler(symbol, fee_rate_bps)?;
        let pool = entry.pool.clone();

        let mut pools = self.pools.write();
        require!(
            !pools.contains_key(&pool.symbol),
            PoolError::PoolExists(pool.symbol.clone())
        );
        pools.insert(pool.symbol.clone(), Arc::new(Mutex::new(entry)));
        Ok(pool)
    }

    /// Activate or deactivate the pool for `symbol`.
    pub fn set_pool_active(&self, symbol: &str, is_active: bool) -> Result<Pool> {
        self.with_entry(symbol, |entry| Ok(initialize_pool::set_active(entry, is_active)))
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    pub fn get_pool_info(&self, symbol: &str) -> Result<Pool> {
        let pool = self.with_entry(symbol, |entry| Ok(entry.pool.clone()))?;
        tracing::debug!(currency = %pool.symbol, "pool info");
        Ok(pool)
    }

    /// Every pool, ordered by symbol.
    pub fn list_pools(&self) -> Vec<Pool> {
        let mut pools: Vec<Pool> = self
            .entries()
            .into_iter()
            .map(|entry| entry.lock().pool.clone())
            .collect();
        pools.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        pools
    }

    /// Shares and derived reserve claims of `address` in `symbol`'s pool.
    /// An address that never deposited reads as an all-zero position; no
    /// record is created.
    pub fn get_user_position(&self, symbol: &str, address: &str) -> Result<PositionView> {
        let address = normalize_address(address);
        self.with_entry(symbol, |entry| {
            let view = entry.pool.position_view(entry.shares_of(&address))?;
            tracing::debug!(currency = %entry.pool.symbol, %address, shares = %view.shares, "position");
            Ok(view)
        })
    }

    /// Every non-zero position held by `address`, ordered by symbol.
    pub fn positions_of(&self, address: &str) -> Result<Vec<(String, PositionView)>> {
        let address = normalize_address(address);
        let mut out = Vec::new();
        for entry in self.entries() {
            let entry = entry.lock();
            let shares = entry.shares_of(&address);
            if shares > 0 {
                out.push((entry.pool.symbol.clone(), entry.pool.position_view(shares)?));
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }

    // ── Mutations ────────────────────────────────────────────────────────────

    pub fn add_liquidity(
        &self,
        symbol: &str,
        eth_amount: u128,
        token_amount: u128,
        address: &str,
    ) -> Result<AddLiquidityResult> {
        let address = normalize_address(address);
        self.with_entry(symbol, |entry| {
            add_liquidity::handler(entry, &address, eth_amount, token_amount)
        })
    }

    pub fn remove_liquidity(
        &self,
        symbol: &str,
        share_amount: u128,
        address: &str,
    ) -> Result<RemoveLiquidityResult> {
        let address = normalize_address(address);
        self.with_entry(symbol, |entry| remove_liquidity::handler(entry, &address, share_amount))
    }

    pub fn swap_exact_eth_for_tokens(
        &self,
        symbol: &str,
        eth_in: u128,
        address: &str,
    ) -> Result<SwapResult> {
        self.swap(symbol, SwapDirection::EthToToken, eth_in, 0, address)
    }

    pub fn swap_exact_tokens_for_eth(
        &self,
        symbol: &str,
        token_in: u128,
        address: &str,
    ) -> Result<SwapResult> {
        self.swap(symbol, SwapDirection::TokenToEth, token_in, 0, address)
    }

    /// Swap in either direction with an optional minimum output.
    pub fn swap(
        &self,
        symbol: &str,
        direction: SwapDirection,
        amount_in: u128,
        min_out: u128,
        address: &str,
    ) -> Result<SwapResult> {
        let address = normalize_address(address);
        self.with_entry(symbol, |entry| {
            swap::handler(entry, &address, direction, amount_in, min_out)
        })
    }

    // ── Snapshots ────────────────────────────────────────────────────────────

    /// Consistent copy of one pool at a time; pools are ordered by symbol and
    /// positions by address, zero balances omitted.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let mut pools: Vec<PoolRecord> = self
            .entries()
            .into_iter()
            .map(|entry| {
                let entry = entry.lock();
                let mut positions: Vec<PositionRecord> = entry
                    .positions
                    .iter()
                    .filter(|(_, shares)| **shares > 0)
                    .map(|(address, shares)| PositionRecord {
                        address: address.clone(),
                        shares: *shares,
                    })
                    .collect();
                positions.sort_by(|a, b| a.address.cmp(&b.address));
                PoolRecord { pool: entry.pool.clone(), positions }
            })
            .collect();
        pools.sort_by(|a, b| a.pool.symbol.cmp(&b.pool.symbol));
        LedgerSnapshot { pools }
    }

    /// Rebuild a ledger, refusing any snapshot that breaks a pool invariant.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Result<Self> {
        let mut pools = HashMap::with_capacity(snapshot.pools.len());
        for record in snapshot.pools {
            let mut pool = record.pool;
            pool.symbol = validate_symbol(&pool.symbol)
                .map_err(|e| PoolError::CorruptSnapshot(e.to_string()))?;

            let mut entry = PoolEntry::new(pool);
            for position in record.positions {
                let address = normalize_address(&position.address);
                let shares = entry
                    .shares_of(&address)
                    .checked_add(position.shares)
                    .ok_or(PoolError::MathOverflow)?;
                entry.positions.insert(address, shares);
            }
            entry.check_invariants()?;

            let symbol = entry.pool.symbol.clone();
            require!(
                !pools.contains_key(&symbol),
                PoolError::CorruptSnapshot(format!("duplicate pool {symbol}"))
            );
            pools.insert(symbol, Arc::new(Mutex::new(entry)));
        }
        tracing::debug!(pools = pools.len(), "ledger restored from snapshot");
        Ok(Self { pools: RwLock::new(pools) })
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn entries(&self) -> Vec<SharedEntry> {
        self.pools.read().values().cloned().collect()
    }

    fn entry(&self, symbol: &str) -> Result<SharedEntry> {
        let symbol = normalize_symbol(symbol);
        self.pools
            .read()
            .get(&symbol)
            .cloned()
            .ok_or(PoolError::NotFound(symbol))
    }

    /// Run `f` with exclusive access to one pool. The map lock is released
    /// before the pool lock is taken.
    fn with_entry<T>(
        &self,
        symbol: &str,
        f: impl FnOnce(&mut PoolEntry) -> Result<T>,
    ) -> Result<T> {
        let shared = self.entry(symbol)?;
        let mut entry = shared.lock();
        let out = f(&mut entry)?;
        debug_assert!(entry.check_invariants().is_ok(), "pool invariant broken: {:?}", entry.pool);
        Ok(out)
    }
}
