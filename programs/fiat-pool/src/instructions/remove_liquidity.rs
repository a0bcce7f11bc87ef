use serde::Serialize;

use crate::{
    error::{require, PoolError, Result},
    state::{Pool, PoolEntry},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveLiquidityResult {
    #[serde(with = "crate::decimal")]
    pub eth_returned: u128,
    #[serde(with = "crate::decimal")]
    pub token_returned: u128,
    pub pool: Pool,
}

/// Burn `share_amount` of the caller's shares and pay out the pro-rata
/// reserves, rounded down in the pool's favour.
pub fn handler(
    entry: &mut PoolEntry,
    address: &str,
    share_amount: u128,
) -> Result<RemoveLiquidityResult> {
    require!(share_amount > 0, PoolError::InvalidAmount("share amount must be greater than zero"));
    require!(entry.pool.is_active, PoolError::PoolInactive(entry.pool.symbol.clone()));

    let owned = entry.shares_of(address);
    require!(
        share_amount <= owned,
        PoolError::InsufficientShares { requested: share_amount, owned }
    );
    require!(entry.pool.total_shares > 0, PoolError::InsufficientLiquidity);

    // Proportional amounts to return
    let (eth_returned, token_returned) = entry.pool.redeemable(share_amount)?;

    // owned ≤ total_shares and returned ≤ reserve, so none of these underflow
    entry.pool.eth_reserve -= eth_returned;
    entry.pool.token_reserve -= token_returned;
    entry.pool.total_shares -= share_amount;
    entry.positions.insert(address.to_string(), owned - share_amount);

    tracing::info!(
        currency = %entry.pool.symbol,
        %address,
        shares_burned = %share_amount,
        eth_returned = %eth_returned,
        token_returned = %token_returned,
        "liquidity removed"
    );
    Ok(RemoveLiquidityResult { eth_returned, token_returned, pool: entry.pool.clone() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FEE_RATE_DEFAULT_BPS;
    use crate::instructions::add_liquidity;

    fn seeded() -> PoolEntry {
        let mut entry = PoolEntry::new(Pool::new("USD", FEE_RATE_DEFAULT_BPS));
        add_liquidity::handler(&mut entry, "0xa", 100, 400).unwrap();
        entry
    }

    #[test]
    fn quarter_of_supply_returns_quarter_of_reserves() {
        let mut entry = seeded();
        let res = handler(&mut entry, "0xa", 50).unwrap();
        assert_eq!(res.eth_returned, 25);
        assert_eq!(res.token_returned, 100);
        assert_eq!(res.pool.total_shares, 150);
        assert_eq!(entry.shares_of("0xa"), 150);
        entry.check_invariants().unwrap();
    }

    #[test]
    fn burning_everything_empties_the_pool() {
        let mut entry = seeded();
        let res = handler(&mut entry, "0xa", 200).unwrap();
        assert_eq!((res.eth_returned, res.token_returned), (100, 400));
        assert!(entry.pool.is_empty());
        assert_eq!(entry.pool.eth_reserve, 0);
        assert_eq!(entry.pool.token_reserve, 0);
        entry.check_invariants().unwrap();
    }

    #[test]
    fn over_withdrawal_is_rejected_without_mutation() {
        let mut entry = seeded();
        let before = entry.pool.clone();
        assert_eq!(
            handler(&mut entry, "0xa", 201),
            Err(PoolError::InsufficientShares { requested: 201, owned: 200 })
        );
        assert_eq!(
            handler(&mut entry, "0xstranger", 1),
            Err(PoolError::InsufficientShares { requested: 1, owned: 0 })
        );
        assert_eq!(entry.pool, before);
    }

    #[test]
    fn inactive_pool_rejects_withdrawal() {
        let mut entry = seeded();
        entry.pool.is_active = false;
        assert_eq!(handler(&mut entry, "0xa", 10), Err(PoolError::PoolInactive("USD".into())));
        assert_eq!(entry.shares_of("0xa"), 200);
    }
}
