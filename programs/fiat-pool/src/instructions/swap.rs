use serde::Serialize;

use crate::{
    error::{require, PoolError, Result},
    instructions::fee_math::compute_swap,
    state::{Pool, PoolEntry, SwapDirection},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResult {
    pub direction: SwapDirection,
    #[serde(with = "crate::decimal")]
    pub amount_in: u128,
    #[serde(with = "crate::decimal")]
    pub amount_out: u128,
    pub pool: Pool,
}

/// Core constant-product swap: eth · token = k.
///
/// The fee (pool.fee_rate_bps, default 0.30 %) is taken from the input and
/// stays in the input reserve, so k grows with every trade. The output
/// reserve can never be drained to zero.
///
/// * `min_out` – slippage guard; `0` accepts any positive output
pub fn handler(
    entry: &mut PoolEntry,
    address: &str,
    direction: SwapDirection,
    amount_in: u128,
    min_out: u128,
) -> Result<SwapResult> {
    require!(amount_in > 0, PoolError::InvalidAmount("swap input must be greater than zero"));
    require!(entry.pool.is_active, PoolError::PoolInactive(entry.pool.symbol.clone()));

    let (reserve_in, reserve_out) = entry.pool.reserves(direction);
    let amounts = compute_swap(amount_in, entry.pool.fee_rate_bps, reserve_in, reserve_out)?;
    let amount_out = amounts.amount_out;

    require!(amount_out > 0 && amount_out < reserve_out, PoolError::InsufficientLiquidity);
    require!(
        amount_out >= min_out,
        PoolError::SlippageExceeded { estimated: amount_out, min: min_out }
    );

    let new_reserve_in = reserve_in
        .checked_add(amount_in)
        .ok_or(PoolError::MathOverflow)?;
    let new_reserve_out = reserve_out - amount_out;

    match direction {
        SwapDirection::EthToToken => {
            entry.pool.eth_reserve = new_reserve_in;
            entry.pool.token_reserve = new_reserve_out;
        }
        SwapDirection::TokenToEth => {
            entry.pool.token_reserve = new_reserve_in;
            entry.pool.eth_reserve = new_reserve_out;
        }
    }

    tracing::info!(
        currency = %entry.pool.symbol,
        %address,
        direction = direction.as_str(),
        amount_in = %amount_in,
        fee = %amounts.fee_amount,
        amount_out = %amount_out,
        "swap"
    );
    Ok(SwapResult { direction, amount_in, amount_out, pool: entry.pool.clone() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FEE_RATE_DEFAULT_BPS;
    use crate::instructions::add_liquidity;

    fn seeded(eth: u128, token: u128) -> PoolEntry {
        let mut entry = PoolEntry::new(Pool::new("USD", FEE_RATE_DEFAULT_BPS));
        add_liquidity::handler(&mut entry, "0xlp", eth, token).unwrap();
        entry
    }

    #[test]
    fn eth_for_tokens_moves_both_reserves() {
        let mut entry = seeded(100, 400);
        let res = handler(&mut entry, "0xt", SwapDirection::EthToToken, 10, 0).unwrap();
        assert_eq!(res.amount_out, 36);
        assert_eq!(res.pool.eth_reserve, 110);
        assert_eq!(res.pool.token_reserve, 364);
        assert!(110 * 364 >= 100 * 400);
    }

    #[test]
    fn tokens_for_eth_is_symmetric() {
        let mut entry = seeded(400, 100);
        let res = handler(&mut entry, "0xt", SwapDirection::TokenToEth, 10, 0).unwrap();
        assert_eq!(res.amount_out, 36);
        assert_eq!(res.pool.token_reserve, 110);
        assert_eq!(res.pool.eth_reserve, 364);
    }

    #[test]
    fn dust_swap_is_rejected() {
        let mut entry = seeded(1_000_000, 10);
        let before = entry.pool.clone();
        assert_eq!(
            handler(&mut entry, "0xt", SwapDirection::EthToToken, 1, 0),
            Err(PoolError::InsufficientLiquidity)
        );
        assert_eq!(entry.pool, before);
    }

    #[test]
    fn slippage_guard_blocks_low_output() {
        let mut entry = seeded(100, 400);
        assert_eq!(
            handler(&mut entry, "0xt", SwapDirection::EthToToken, 10, 37),
            Err(PoolError::SlippageExceeded { estimated: 36, min: 37 })
        );
        assert_eq!(entry.pool.eth_reserve, 100);
    }

    #[test]
    fn empty_pool_cannot_swap() {
        let mut entry = PoolEntry::new(Pool::new("USD", FEE_RATE_DEFAULT_BPS));
        assert_eq!(
            handler(&mut entry, "0xt", SwapDirection::EthToToken, 10, 0),
            Err(PoolError::InsufficientLiquidity)
        );
    }
}
