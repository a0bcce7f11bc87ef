use primitive_types::U256;
use serde::Serialize;

use crate::{
    error::{require, PoolError, Result},
    math::{mul_div, narrow, wide_mul},
    state::{Pool, PoolEntry},
};

// ─── Integer square root (Babylonian method) ──────────────────────────────
pub fn isqrt(n: U256) -> U256 {
    if n.is_zero() {
        return n;
    }
    let mut x = n;
    // (n + 1) / 2 without overflowing at U256::MAX
    let mut y = (x >> 1) + (x & U256::one());
    while y < x {
        x = y;
        y = (y + n / y) >> 1;
    }
    x
}

/// Shares minted for a deposit of `eth_amount` + `token_amount`.
///
/// First deposit: `sqrt(eth · token)`, which fixes the initial share price.
/// Later deposits: proportional to the smaller of the two ratios so a
/// lopsided deposit cannot dilute existing holders. The excess side is kept
/// by the pool.
pub fn compute_shares(pool: &Pool, eth_amount: u128, token_amount: u128) -> Result<u128> {
    if pool.total_shares == 0 {
        // sqrt of a product of two u128 values always fits back in a u128
        return narrow(isqrt(wide_mul(eth_amount, token_amount)));
    }

    require!(pool.eth_reserve > 0 && pool.token_reserve > 0, PoolError::InsufficientLiquidity);
    let by_eth = mul_div(eth_amount, pool.total_shares, pool.eth_reserve)?;
    let by_token = mul_div(token_amount, pool.total_shares, pool.token_reserve)?;
    Ok(by_eth.min(by_token))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLiquidityResult {
    #[serde(with = "crate::decimal")]
    pub shares_minted: u128,
    pub pool: Pool,
}

// ─── Handler ──────────────────────────────────────────────────────────────
/// Deposit both assets and credit the caller with freshly minted shares.
pub fn handler(
    entry: &mut PoolEntry,
    address: &str,
    eth_amount: u128,
    token_amount: u128,
) -> Result<AddLiquidityResult> {
    require!(
        eth_amount > 0 && token_amount > 0,
        PoolError::InvalidAmount("eth and token amounts must be greater than zero")
    );
    require!(entry.pool.is_active, PoolError::PoolInactive(entry.pool.symbol.clone()));

    let shares_minted = compute_shares(&entry.pool, eth_amount, token_amount)?;
    require!(shares_minted > 0, PoolError::InsufficientLiquidity);

    // Compute every new value before writing any of them
    let eth_reserve = entry.pool.eth_reserve
        .checked_add(eth_amount)
        .ok_or(PoolError::MathOverflow)?;
    let token_reserve = entry.pool.token_reserve
        .checked_add(token_amount)
        .ok_or(PoolError::MathOverflow)?;
    let total_shares = entry.pool.total_shares
        .checked_add(shares_minted)
        .ok_or(PoolError::MathOverflow)?;
    let holder_shares = entry
        .shares_of(address)
        .checked_add(shares_minted)
        .ok_or(PoolError::MathOverflow)?;

    entry.pool.eth_reserve = eth_reserve;
    entry.pool.token_reserve = token_reserve;
    entry.pool.total_shares = total_shares;
    entry.positions.insert(address.to_string(), holder_shares);

    tracing::info!(
        currency = %entry.pool.symbol,
        %address,
        eth_amount = %eth_amount,
        token_amount = %token_amount,
        shares_minted = %shares_minted,
        "liquidity added"
    );
    Ok(AddLiquidityResult { shares_minted, pool: entry.pool.clone() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FEE_RATE_DEFAULT_BPS;

    fn empty_entry() -> PoolEntry {
        PoolEntry::new(Pool::new("USD", FEE_RATE_DEFAULT_BPS))
    }

    #[test]
    fn isqrt_floors() {
        let sqrt = |n: u128| isqrt(U256::from(n)).low_u128();
        assert_eq!(sqrt(0), 0);
        assert_eq!(sqrt(1), 1);
        assert_eq!(sqrt(3), 1);
        assert_eq!(sqrt(4), 2);
        assert_eq!(sqrt(40_000), 200);
        assert_eq!(sqrt(40_001), 200);
        assert_eq!(sqrt(u128::MAX), u64::MAX as u128);
        assert_eq!(isqrt(U256::MAX), U256::from(u128::MAX));
    }

    #[test]
    fn first_deposit_mints_geometric_mean() {
        let mut entry = empty_entry();
        let res = handler(&mut entry, "0xabc", 100, 400).unwrap();
        assert_eq!(res.shares_minted, 200);
        assert_eq!(res.pool.eth_reserve, 100);
        assert_eq!(res.pool.token_reserve, 400);
        assert_eq!(res.pool.total_shares, 200);
        assert_eq!(entry.shares_of("0xabc"), 200);
    }

    #[test]
    fn later_deposit_uses_limiting_ratio() {
        let mut entry = empty_entry();
        handler(&mut entry, "0xa", 100, 400).unwrap();
        // 50 eth would mint 100, 100 tokens only 50: the token side limits
        let res = handler(&mut entry, "0xb", 50, 100).unwrap();
        assert_eq!(res.shares_minted, 50);
        assert_eq!(res.pool.eth_reserve, 150);
        assert_eq!(res.pool.token_reserve, 500);
        assert_eq!(res.pool.total_shares, 250);
        entry.check_invariants().unwrap();
    }

    #[test]
    fn wei_scale_first_deposit_mints_geometric_mean() {
        let mut entry = empty_entry();
        let eth = 1_000 * 10u128.pow(18);
        let usd = 1_800_000 * 10u128.pow(8);
        let res = handler(&mut entry, "0xa", eth, usd).unwrap();
        // sqrt(1e21 · 1.8e14) = sqrt(1.8e35)
        assert_eq!(res.shares_minted, 424_264_068_711_928_514);

        // a matching second deposit mints the same amount again
        let res = handler(&mut entry, "0xb", eth, usd).unwrap();
        assert_eq!(res.shares_minted, 424_264_068_711_928_514);
        entry.check_invariants().unwrap();
    }

    #[test]
    fn zero_share_deposit_is_rejected_without_mutation() {
        let mut entry = empty_entry();
        handler(&mut entry, "0xa", 100, 1_000_000).unwrap();
        // 1 token against a 1_000_000 token reserve is worth 0.01 shares
        let before = entry.pool.clone();
        assert_eq!(handler(&mut entry, "0xb", 1, 1), Err(PoolError::InsufficientLiquidity));
        assert_eq!(entry.pool, before);
        assert_eq!(entry.shares_of("0xb"), 0);
    }

    #[test]
    fn rejects_zero_amounts_and_inactive_pool() {
        let mut entry = empty_entry();
        assert!(matches!(handler(&mut entry, "0xa", 0, 10), Err(PoolError::InvalidAmount(_))));
        assert!(matches!(handler(&mut entry, "0xa", 10, 0), Err(PoolError::InvalidAmount(_))));
        entry.pool.is_active = false;
        assert_eq!(
            handler(&mut entry, "0xa", 10, 10),
            Err(PoolError::PoolInactive("USD".into()))
        );
        assert!(entry.pool.is_empty());
    }
}
