use std::collections::HashMap;

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{require, PoolError, Result};
use crate::math::{mul_div, wide_mul};

// ─── Pool ──────────────────────────────────────────────────────────────────
// Constant-product pool (eth * token = k) for one fiat currency symbol.
// Either fully empty (all three counters zero) or fully funded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub symbol: String,
    /// ETH side of the pool, in wei
    #[serde(with = "crate::decimal")]
    pub eth_reserve: u128,
    /// Fiat-token side of the pool, in the token's smallest unit
    #[serde(with = "crate::decimal")]
    pub token_reserve: u128,
    /// Total LP shares outstanding; equals the sum of all positions
    #[serde(with = "crate::decimal")]
    pub total_shares: u128,
    /// Swap fee in basis points (e.g. 30 = 0.30 %)
    pub fee_rate_bps: u16,
    /// Inactive pools reject every mutating operation
    pub is_active: bool,
}

impl Pool {
    /// Empty, active pool.
    pub fn new(symbol: impl Into<String>, fee_rate_bps: u16) -> Self {
        Self {
            symbol: symbol.into(),
            eth_reserve: 0,
            token_reserve: 0,
            total_shares: 0,
            fee_rate_bps,
            is_active: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_shares == 0
    }

    /// `eth_reserve * token_reserve` (the curve's k), exact at any reserve size.
    pub fn product(&self) -> U256 {
        wide_mul(self.eth_reserve, self.token_reserve)
    }

    /// `(reserve_in, reserve_out)` for a swap in `direction`.
    pub fn reserves(&self, direction: SwapDirection) -> (u128, u128) {
        match direction {
            SwapDirection::EthToToken => (self.eth_reserve, self.token_reserve),
            SwapDirection::TokenToEth => (self.token_reserve, self.eth_reserve),
        }
    }

    /// Pro-rata claim of `shares` on both reserves, rounded down.
    pub fn redeemable(&self, shares: u128) -> Result<(u128, u128)> {
        if self.total_shares == 0 {
            return Ok((0, 0));
        }
        let eth = mul_div(shares, self.eth_reserve, self.total_shares)?;
        let token = mul_div(shares, self.token_reserve, self.total_shares)?;
        Ok((eth, token))
    }

    /// Derived view of a holder's position in this pool.
    pub fn position_view(&self, shares: u128) -> Result<PositionView> {
        let (eth_share, token_share) = self.redeemable(shares)?;
        Ok(PositionView { shares, eth_share, token_share })
    }

    /// All-zero or all-non-zero reserves and supply.
    pub fn check_invariants(&self) -> Result<()> {
        let zeros = [self.eth_reserve, self.token_reserve, self.total_shares]
            .iter()
            .filter(|v| **v == 0)
            .count();
        require!(
            zeros == 0 || zeros == 3,
            PoolError::CorruptSnapshot(format!(
                "pool {} is partially funded: eth={} token={} shares={}",
                self.symbol, self.eth_reserve, self.token_reserve, self.total_shares
            ))
        );
        require!(
            (FEE_RATE_MIN_BPS..=FEE_RATE_MAX_BPS).contains(&self.fee_rate_bps),
            PoolError::InvalidFeeRate(self.fee_rate_bps)
        );
        Ok(())
    }
}

// ─── Position ──────────────────────────────────────────────────────────────
// Shares are the only stored field; the reserve claims are derived on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionView {
    #[serde(with = "crate::decimal")]
    pub shares: u128,
    #[serde(with = "crate::decimal")]
    pub eth_share: u128,
    #[serde(with = "crate::decimal")]
    pub token_share: u128,
}

// ─── Swap direction ────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwapDirection {
    /// Sell ETH, receive fiat tokens
    EthToToken,
    /// Sell fiat tokens, receive ETH
    TokenToEth,
}

impl SwapDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SwapDirection::EthToToken => "eth-to-token",
            SwapDirection::TokenToEth => "token-to-eth",
        }
    }
}

impl std::str::FromStr for SwapDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eth-to-token" => Ok(SwapDirection::EthToToken),
            "token-to-eth" => Ok(SwapDirection::TokenToEth),
            other => Err(format!(
                "unknown swap direction '{other}' (expected eth-to-token or token-to-eth)"
            )),
        }
    }
}

// ─── Pool entry ────────────────────────────────────────────────────────────
// One pool plus every holder's share balance. Guarded as a unit by the ledger
// so a handler sees and mutates both atomically.
#[derive(Debug, Clone)]
pub struct PoolEntry {
    pub pool: Pool,
    pub positions: HashMap<String, u128>,
}

impl PoolEntry {
    pub fn new(pool: Pool) -> Self {
        Self { pool, positions: HashMap::new() }
    }

    pub fn shares_of(&self, address: &str) -> u128 {
        self.positions.get(address).copied().unwrap_or(0)
    }

    /// Pool invariants plus `total_shares == Σ positions`.
    pub fn check_invariants(&self) -> Result<()> {
        self.pool.check_invariants()?;
        let sum = self
            .positions
            .values()
            .try_fold(0u128, |acc, s| acc.checked_add(*s))
            .ok_or(PoolError::MathOverflow)?;
        require!(
            sum == self.pool.total_shares,
            PoolError::CorruptSnapshot(format!(
                "pool {} positions sum to {} but total_shares is {}",
                self.pool.symbol, sum, self.pool.total_shares
            ))
        );
        Ok(())
    }
}

// ─── Snapshot ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRecord {
    pub address: String,
    #[serde(with = "crate::decimal")]
    pub shares: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolRecord {
    #[serde(flatten)]
    pub pool: Pool,
    #[serde(default)]
    pub positions: Vec<PositionRecord>,
}

/// Serializable copy of every pool and position, ordered by symbol then address.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub pools: Vec<PoolRecord>,
}

// ─── Normalization ─────────────────────────────────────────────────────────

/// Upper-case currency symbol; `"usd"` and `"USD"` name the same pool.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

/// Validate a symbol for pool creation: 1–10 ASCII letters or digits.
pub fn validate_symbol(symbol: &str) -> Result<String> {
    let sym = normalize_symbol(symbol);
    require!(
        !sym.is_empty()
            && sym.len() <= MAX_SYMBOL_LEN
            && sym.bytes().all(|b| b.is_ascii_alphanumeric()),
        PoolError::InvalidSymbol(symbol.to_string())
    );
    Ok(sym)
}

/// Lower-case holder address; comparisons are case-insensitive.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded(eth: u128, token: u128, shares: u128) -> Pool {
        Pool {
            eth_reserve: eth,
            token_reserve: token,
            total_shares: shares,
            ..Pool::new("USD", FEE_RATE_DEFAULT_BPS)
        }
    }

    #[test]
    fn position_view_is_pro_rata() {
        let pool = funded(100, 400, 200);
        let view = pool.position_view(50).unwrap();
        assert_eq!(view, PositionView { shares: 50, eth_share: 25, token_share: 100 });
    }

    #[test]
    fn wei_scale_position_view_does_not_overflow() {
        let shares = 424_264_068_711_928_514;
        let pool = funded(1_000 * 10u128.pow(18), 1_800_000 * 10u128.pow(8), shares);
        // shares · eth_reserve alone is past u128::MAX
        assert!(shares.checked_mul(pool.eth_reserve).is_none());
        assert_eq!(pool.product(), U256::from(180u128) * U256::from(10u128.pow(33)));
        let view = pool.position_view(shares).unwrap();
        assert_eq!(view.eth_share, pool.eth_reserve);
        assert_eq!(view.token_share, pool.token_reserve);
        assert_eq!(pool.position_view(shares / 2).unwrap().eth_share, 500_000_000_000_000_000_000);
    }

    #[test]
    fn empty_pool_yields_zero_view() {
        let pool = Pool::new("USD", FEE_RATE_DEFAULT_BPS);
        assert_eq!(pool.position_view(0).unwrap(), PositionView::default());
    }

    #[test]
    fn partially_funded_pool_is_rejected() {
        assert!(funded(100, 0, 10).check_invariants().is_err());
        assert!(funded(0, 0, 0).check_invariants().is_ok());
        assert!(funded(1, 1, 1).check_invariants().is_ok());
    }

    #[test]
    fn pool_serializes_amounts_as_strings() {
        let pool = funded(1_000_000_000_000_000_000, 180_000_000_000, 13_416_407_864_998);
        let json = serde_json::to_string(&pool).unwrap();
        assert!(json.contains("\"ethReserve\":\"1000000000000000000\""));
        assert!(json.contains("\"totalShares\":\"13416407864998\""));
        assert!(json.contains("\"isActive\":true"));
        let back: Pool = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pool);
    }

    #[test]
    fn symbols_are_validated() {
        assert_eq!(validate_symbol(" usd ").unwrap(), "USD");
        assert!(validate_symbol("").is_err());
        assert!(validate_symbol("US-D").is_err());
        assert!(validate_symbol("ABCDEFGHIJK").is_err());
    }

    #[test]
    fn direction_parses_case_insensitively() {
        assert_eq!("ETH-TO-TOKEN".parse::<SwapDirection>().unwrap(), SwapDirection::EthToToken);
        assert!("sideways".parse::<SwapDirection>().is_err());
    }
}
