use primitive_types::U256;

use crate::{
    constants::*,
    error::{require, PoolError, Result},
    math::{mul_div, mul_div_wide, wide_mul},
};

/// Result of swap fee and output calculations, shared by `swap` and the
/// read-only quote path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapAmounts {
    /// Portion of amount_in retained by the pool as fee (informational;
    /// the fee stays in the reserve and grows k).
    pub fee_amount: u128,
    /// amount_in − fee_amount, the part that moves the curve.
    pub after_fee: u128,
    /// Tokens leaving the output reserve.
    pub amount_out: u128,
}

/// Constant-product output with the fee taken from the input side.
///
/// ```text
/// out = reserve_out · in · (10_000 − fee) / (reserve_in · 10_000 + in · (10_000 − fee))
/// ```
///
/// With `fee_rate_bps = 30` this is the familiar `997 / 1000` formula.
///
/// * `amount_in`    – raw amount the caller is selling
/// * `fee_rate_bps` – pool fee in basis points
/// * `reserve_in`   – pool balance of the input asset
/// * `reserve_out`  – pool balance of the output asset
pub fn compute_swap(
    amount_in: u128,
    fee_rate_bps: u16,
    reserve_in: u128,
    reserve_out: u128,
) -> Result<SwapAmounts> {
    require!(amount_in > 0, PoolError::InvalidAmount("swap input must be greater than zero"));
    require!(reserve_in > 0 && reserve_out > 0, PoolError::InsufficientLiquidity);

    let fee_bps = fee_rate_bps as u128;
    require!(fee_bps < BPS_DENOMINATOR, PoolError::InvalidFeeRate(fee_rate_bps));

    // ── Input net of fee, scaled by BPS_DENOMINATOR ──────────────────────────
    let in_with_fee = wide_mul(amount_in, BPS_DENOMINATOR - fee_bps);

    // ── Constant-product output: dy = y · dx' / (x + dx') ───────────────────
    // out < reserve_out, so only the intermediates need the extra width
    let denominator = wide_mul(reserve_in, BPS_DENOMINATOR) + in_with_fee;
    let amount_out = mul_div_wide(U256::from(reserve_out), in_with_fee, denominator)?;

    let fee_amount = mul_div(amount_in, fee_bps, BPS_DENOMINATOR)?;

    Ok(SwapAmounts {
        fee_amount,
        after_fee: amount_in - fee_amount,
        amount_out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_eth_into_hundred_four_hundred_pool() {
        // 400 · 10 · 997 / (100 · 1000 + 10 · 997) = 3_988_000 / 109_970
        let out = compute_swap(10, 30, 100, 400).unwrap();
        assert_eq!(out.amount_out, 36);
        assert_eq!(out.amount_out, 3_988_000 / 109_970);
    }

    #[test]
    fn matches_classic_997_formula() {
        let (r_in, r_out, a) = (1_000_000_000_000_000_000u128, 180_000_000_000u128, 5_000_000_000_000_000u128);
        let classic = r_out * a * 997 / (r_in * 1000 + a * 997);
        assert_eq!(compute_swap(a, 30, r_in, r_out).unwrap().amount_out, classic);
    }

    #[test]
    fn dust_input_rounds_to_zero_output() {
        let out = compute_swap(1, 30, 1_000_000, 10).unwrap();
        assert_eq!(out.amount_out, 0);
    }

    #[test]
    fn empty_reserves_are_rejected() {
        assert_eq!(compute_swap(10, 30, 0, 400), Err(PoolError::InsufficientLiquidity));
        assert_eq!(compute_swap(10, 30, 100, 0), Err(PoolError::InsufficientLiquidity));
    }

    #[test]
    fn wei_scale_reserves_do_not_overflow() {
        // 1 000 ETH against 1.8M USD at 8 decimals: y · dx' alone is ~2^175
        let eth = 1_000 * 10u128.pow(18);
        let usd = 1_800_000 * 10u128.pow(8);
        let out = compute_swap(eth, 30, eth, usd).unwrap();
        assert_eq!(out.amount_out, usd * 9_970 / 19_970);

        let out = compute_swap(u128::MAX, 30, u128::MAX, u128::MAX).unwrap();
        assert!(out.amount_out > u128::MAX / 3 && out.amount_out < u128::MAX / 2);
    }

    #[test]
    fn fee_amount_is_informational() {
        let out = compute_swap(10_000, 30, 1_000_000, 1_000_000).unwrap();
        assert_eq!(out.fee_amount, 30);
        assert_eq!(out.after_fee, 9_970);
    }
}
