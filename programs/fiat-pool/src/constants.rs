/// Default LP fee: 0.30 %
pub const FEE_RATE_DEFAULT_BPS: u16 = 30;

/// Allowed fee tier: 1–100 bps (0.01 %–1.00 %)
pub const FEE_RATE_MIN_BPS: u16 = 1;
pub const FEE_RATE_MAX_BPS: u16 = 100;

/// Denominator for basis-point math (u128 to avoid up-cast noise)
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Longest accepted currency symbol
pub const MAX_SYMBOL_LEN: usize = 10;

/// Currencies seeded at startup
pub const DEFAULT_CURRENCIES: &[&str] = &["USD", "EUR", "GBP"];
