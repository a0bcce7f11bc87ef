//! Fiat exchange-rate registry.
//!
//! A rate is the price of one ETH in fiat units scaled by `10^decimals`:
//! `180000000000` with 8 decimals reads as 1 800.00000000 USD per ETH.

use std::collections::BTreeMap;

use fiat_pool::{mul_div, normalize_symbol, validate_symbol, PoolError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Decimal places of ETH (wei per ETH = 10^18).
pub const ETH_DECIMALS: u32 = 18;
/// Largest `decimals` a rate may declare.
pub const MAX_RATE_DECIMALS: u8 = 18;

/// Rates installed on a fresh service.
pub const DEFAULT_RATES: [(&str, u128, u8); 3] = [
    ("USD", 180_000_000_000, 8),
    ("EUR", 165_000_000_000, 8),
    ("GBP", 142_000_000_000, 8),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiatRate {
    /// Fiat units per ETH, scaled by `10^decimals`
    #[serde(with = "fiat_pool::decimal")]
    pub rate: u128,
    pub decimals: u8,
    pub is_active: bool,
}

#[derive(Debug, Default)]
pub struct RateRegistry {
    rates: RwLock<BTreeMap<String, FiatRate>>,
}

impl RateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding [`DEFAULT_RATES`], all active.
    pub fn with_defaults() -> Self {
        let rates = DEFAULT_RATES
            .iter()
            .map(|(currency, rate, decimals)| {
                (currency.to_string(), FiatRate { rate: *rate, decimals: *decimals, is_active: true })
            })
            .collect();
        Self { rates: RwLock::new(rates) }
    }

    /// Rebuild from a snapshot map, re-validating every entry.
    pub fn from_entries(entries: BTreeMap<String, FiatRate>) -> Result<Self> {
        let mut rates = BTreeMap::new();
        for (currency, rate) in entries {
            let currency = validate_symbol(&currency)?;
            check_rate(rate.rate, rate.decimals)?;
            if rates.insert(currency.clone(), rate).is_some() {
                return Err(PoolError::CorruptSnapshot(format!("duplicate rate {currency}")).into());
            }
        }
        Ok(Self { rates: RwLock::new(rates) })
    }

    pub fn get(&self, currency: &str) -> Result<FiatRate> {
        let currency = normalize_symbol(currency);
        self.rates
            .read()
            .get(&currency)
            .copied()
            .ok_or(Error::CurrencyNotFound(currency))
    }

    pub fn contains(&self, currency: &str) -> bool {
        self.rates.read().contains_key(&normalize_symbol(currency))
    }

    /// All rates ordered by currency.
    pub fn entries(&self) -> BTreeMap<String, FiatRate> {
        self.rates.read().clone()
    }

    pub fn len(&self) -> usize {
        self.rates.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.read().is_empty()
    }

    /// Insert or replace a rate. A new currency starts active; an existing
    /// one keeps its status.
    pub fn set_rate(&self, currency: &str, rate: u128, decimals: u8) -> Result<FiatRate> {
        let currency = validate_symbol(currency)?;
        check_rate(rate, decimals)?;

        let mut rates = self.rates.write();
        let is_active = rates.get(&currency).map_or(true, |r| r.is_active);
        let updated = FiatRate { rate, decimals, is_active };
        rates.insert(currency.clone(), updated);
        tracing::info!(%currency, %rate, decimals, "rate updated");
        Ok(updated)
    }

    pub fn set_active(&self, currency: &str, is_active: bool) -> Result<FiatRate> {
        let currency = normalize_symbol(currency);
        let mut rates = self.rates.write();
        let entry = rates
            .get_mut(&currency)
            .ok_or_else(|| Error::CurrencyNotFound(currency.clone()))?;
        entry.is_active = is_active;
        tracing::info!(%currency, is_active, "rate status changed");
        Ok(*entry)
    }

    /// Wei equivalent of `fiat_amount` (whole fiat units):
    /// `fiat_amount × 10^decimals × 10^18 / rate`, rounded down.
    pub fn fiat_to_eth(&self, currency: &str, fiat_amount: u128) -> Result<u128> {
        let rate = self.get(currency)?;
        if !rate.is_active {
            return Err(Error::RateInactive(normalize_symbol(currency)));
        }
        convert(fiat_amount, &rate)
    }
}

/// `fiat_amount × 10^decimals × 10^18 / rate` with overflow checks.
pub fn convert(fiat_amount: u128, rate: &FiatRate) -> Result<u128> {
    if fiat_amount == 0 {
        return Err(PoolError::InvalidAmount("fiat amount must be greater than zero").into());
    }
    let scale = 10u128
        .checked_pow(rate.decimals as u32 + ETH_DECIMALS)
        .ok_or(PoolError::MathOverflow)?;
    Ok(mul_div(fiat_amount, scale, rate.rate)?)
}

fn check_rate(rate: u128, decimals: u8) -> Result<()> {
    if rate == 0 {
        return Err(Error::InvalidArgument("rate must be greater than zero".into()));
    }
    if decimals > MAX_RATE_DECIMALS {
        return Err(Error::InvalidArgument(format!(
            "decimals must be at most {MAX_RATE_DECIMALS}, got {decimals}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_active() {
        let reg = RateRegistry::with_defaults();
        assert_eq!(reg.len(), 3);
        let usd = reg.get("usd").unwrap();
        assert_eq!(usd, FiatRate { rate: 180_000_000_000, decimals: 8, is_active: true });
    }

    #[test]
    fn convert_one_rate_unit_is_one_eth() {
        let reg = RateRegistry::with_defaults();
        // 1800 USD at 1800 USD/ETH
        assert_eq!(reg.fiat_to_eth("USD", 1_800).unwrap(), 1_000_000_000_000_000_000);
        // 100 EUR at 1650 EUR/ETH, rounded down
        assert_eq!(reg.fiat_to_eth("EUR", 100).unwrap(), 60_606_060_606_060_606);
    }

    #[test]
    fn inactive_rate_refuses_conversion() {
        let reg = RateRegistry::with_defaults();
        reg.set_active("GBP", false).unwrap();
        assert!(matches!(reg.fiat_to_eth("GBP", 10), Err(Error::RateInactive(c)) if c == "GBP"));
    }

    #[test]
    fn unknown_currency_is_not_found() {
        let reg = RateRegistry::with_defaults();
        assert!(matches!(reg.get("JPY"), Err(Error::CurrencyNotFound(_))));
        assert!(matches!(reg.set_active("JPY", true), Err(Error::CurrencyNotFound(_))));
    }

    #[test]
    fn set_rate_validates_and_keeps_status() {
        let reg = RateRegistry::with_defaults();
        assert!(matches!(reg.set_rate("USD", 0, 8), Err(Error::InvalidArgument(_))));
        assert!(matches!(reg.set_rate("USD", 1, 19), Err(Error::InvalidArgument(_))));

        reg.set_active("USD", false).unwrap();
        let updated = reg.set_rate("usd", 200_000_000_000, 8).unwrap();
        assert!(!updated.is_active);

        let jpy = reg.set_rate("jpy", 25_000_000, 2).unwrap();
        assert!(jpy.is_active);
        assert!(reg.contains("JPY"));
    }

    #[test]
    fn large_conversion_keeps_the_wide_product() {
        // 1e13 USD · 10^26 is past u128::MAX, the wei result is not
        let usd = FiatRate { rate: 180_000_000_000, decimals: 8, is_active: true };
        let fiat = 10_000_000_000_000u128;
        assert!(fiat.checked_mul(10u128.pow(26)).is_none());
        assert_eq!(convert(fiat, &usd).unwrap(), 5_555_555_555_555_555_555_555_555_555);
    }

    #[test]
    fn conversion_overflow_is_reported() {
        let rate = FiatRate { rate: 1, decimals: 18, is_active: true };
        assert!(matches!(convert(u128::MAX, &rate), Err(Error::Pool(PoolError::MathOverflow))));
        assert!(matches!(convert(0, &rate), Err(Error::Pool(PoolError::InvalidAmount(_)))));
    }
}
