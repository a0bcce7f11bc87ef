//! Swap quotes.
//!
//! Uses the ledger's own fee math, so a quote matches the swap that would
//! execute against the same reserves.

use fiat_pool::{instructions::compute_swap, Pool, PoolError, SwapDirection};

use crate::error::Result;
use crate::types::SimulateResult;

/// Full fee and slippage breakdown for swapping `amount_in` through `pool`.
///
/// Fails exactly where the swap itself would fail on liquidity grounds: an
/// empty pool, a zero output, or an output that would drain the reserve.
/// Pool status is not checked; inactive pools can still be quoted.
pub fn simulate_detailed(
    pool:      &Pool,
    direction: SwapDirection,
    amount_in: u128,
) -> Result<SimulateResult> {
    let (reserve_in, reserve_out) = pool.reserves(direction);
    let amounts = compute_swap(amount_in, pool.fee_rate_bps, reserve_in, reserve_out)?;

    if amounts.amount_out == 0 || amounts.amount_out >= reserve_out {
        return Err(PoolError::InsufficientLiquidity.into());
    }

    let effective_rate = amounts.amount_out as f64 / amount_in as f64;
    let price_impact_pct =
        amounts.after_fee as f64 / (reserve_in as f64 + amounts.after_fee as f64) * 100.0;

    Ok(SimulateResult {
        currency:      pool.symbol.clone(),
        direction,
        amount_in,
        fee_amount:    amounts.fee_amount,
        after_fee:     amounts.after_fee,
        estimated_out: amounts.amount_out,
        effective_rate,
        price_impact_pct,
        fee_rate_bps:  pool.fee_rate_bps,
        reserve_in,
        reserve_out,
    })
}

/// Token units per ETH at the current reserves; `0.0` for an empty pool.
pub fn spot_price(pool: &Pool) -> f64 {
    if pool.eth_reserve == 0 {
        0.0
    } else {
        pool.token_reserve as f64 / pool.eth_reserve as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn pool(eth: u128, token: u128) -> Pool {
        Pool {
            symbol: "USD".into(),
            eth_reserve: eth,
            token_reserve: token,
            total_shares: 200,
            fee_rate_bps: 30,
            is_active: true,
        }
    }

    #[test]
    fn quote_matches_swap_formula() {
        let sim = simulate_detailed(&pool(100, 400), SwapDirection::EthToToken, 10).unwrap();
        assert_eq!(sim.estimated_out, 36);
        assert_eq!(sim.reserve_in, 100);
        assert_eq!(sim.reserve_out, 400);
        assert!((sim.effective_rate - 3.6).abs() < 1e-9);
    }

    #[test]
    fn reverse_direction_uses_token_reserve_as_input() {
        let sim = simulate_detailed(&pool(100, 400), SwapDirection::TokenToEth, 40).unwrap();
        assert_eq!(sim.reserve_in, 400);
        assert_eq!(sim.reserve_out, 100);
        // 100·40·9970 / (400·10000 + 40·9970) = 39_880_000 / 4_398_800
        assert_eq!(sim.estimated_out, 9);
    }

    #[test]
    fn empty_pool_has_no_quote() {
        let empty = Pool::new("EUR", 30);
        assert!(matches!(
            simulate_detailed(&empty, SwapDirection::EthToToken, 10),
            Err(Error::Pool(PoolError::InsufficientLiquidity))
        ));
        assert_eq!(spot_price(&empty), 0.0);
    }

    #[test]
    fn dust_input_has_no_quote() {
        assert!(matches!(
            simulate_detailed(&pool(1_000_000, 10), SwapDirection::EthToToken, 1),
            Err(Error::Pool(PoolError::InsufficientLiquidity))
        ));
    }
}
