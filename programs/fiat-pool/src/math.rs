//! Wide-intermediate integer helpers.
//!
//! Amounts are `u128` (wei on the ETH side), so `a · b` routinely exceeds
//! 128 bits long before `a · b / c` does. Every product is formed in
//! [`U256`] and only the final quotient is narrowed.

use primitive_types::{U256, U512};

use crate::error::{require, PoolError, Result};

/// `⌊a · b / denominator⌋`, failing only when the quotient itself does not
/// fit in a `u128`.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128> {
    require!(denominator > 0, PoolError::MathOverflow);
    narrow(U256::from(a) * U256::from(b) / U256::from(denominator))
}

/// Full 256-bit product of two amounts.
pub fn wide_mul(a: u128, b: u128) -> U256 {
    U256::from(a) * U256::from(b)
}

/// `⌊a · b / denominator⌋` for 256-bit operands, via a 512-bit product.
pub(crate) fn mul_div_wide(a: U256, b: U256, denominator: U256) -> Result<u128> {
    require!(!denominator.is_zero(), PoolError::MathOverflow);
    let quotient = a.full_mul(b) / U512::from(denominator);
    require!(quotient.bits() <= 128, PoolError::MathOverflow);
    Ok(quotient.low_u128())
}

pub(crate) fn narrow(value: U256) -> Result<u128> {
    require!(value.bits() <= 128, PoolError::MathOverflow);
    Ok(value.low_u128())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_beyond_u128_divides_back_down() {
        // 1e21 · 1e20 overflows u128, the quotient is 1e21
        let a = 1_000_000_000_000_000_000_000u128;
        let b = 100_000_000_000_000_000_000u128;
        assert!(a.checked_mul(b).is_none());
        assert_eq!(mul_div(a, b, b), Ok(a));
        assert_eq!(mul_div(u128::MAX, u128::MAX, u128::MAX), Ok(u128::MAX));
    }

    #[test]
    fn only_an_oversized_quotient_overflows() {
        assert_eq!(mul_div(u128::MAX, 2, 1), Err(PoolError::MathOverflow));
        assert_eq!(mul_div(1, 1, 0), Err(PoolError::MathOverflow));
        assert_eq!(mul_div(7, 3, 2), Ok(10));
    }

    #[test]
    fn wide_product_keeps_every_bit() {
        let p = wide_mul(u128::MAX, u128::MAX);
        assert_eq!(p.bits(), 256);
        assert_eq!(p / U256::from(u128::MAX), U256::from(u128::MAX));
    }

    #[test]
    fn wide_operands_use_a_512_bit_product() {
        let big = wide_mul(u128::MAX, 10_000);
        assert_eq!(mul_div_wide(big, U256::from(u128::MAX), big), Ok(u128::MAX));
        assert_eq!(mul_div_wide(big, big, U256::one()), Err(PoolError::MathOverflow));
    }
}
