use crate::{
    constants::*,
    error::{require, PoolError, Result},
    state::{validate_symbol, Pool, PoolEntry},
};

/// Build a new, empty, active pool for `symbol`.
/// The creator sets the fee tier (1–100 bps); reserves start at zero and the
/// first `add_liquidity` fixes the price.
pub fn handler(symbol: &str, fee_rate_bps: u16) -> Result<PoolEntry> {
    require!(
        (FEE_RATE_MIN_BPS..=FEE_RATE_MAX_BPS).contains(&fee_rate_bps),
        PoolError::InvalidFeeRate(fee_rate_bps)
    );
    let symbol = validate_symbol(symbol)?;

    tracing::info!(currency = %symbol, fee_rate_bps, "pool created");
    Ok(PoolEntry::new(Pool::new(symbol, fee_rate_bps)))
}

/// Activate or deactivate a pool. Reserves and positions are untouched;
/// an inactive pool only refuses mutations.
pub fn set_active(entry: &mut PoolEntry, is_active: bool) -> Pool {
    if entry.pool.is_active != is_active {
        entry.pool.is_active = is_active;
        tracing::info!(
            currency = %entry.pool.symbol,
            is_active,
            "pool {}", if is_active { "activated" } else { "deactivated" }
        );
    }
    entry.pool.clone()
}
