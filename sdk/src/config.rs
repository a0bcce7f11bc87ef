//! Service configuration.

use fiat_pool::{validate_symbol, DEFAULT_CURRENCIES, FEE_RATE_DEFAULT_BPS, FEE_RATE_MAX_BPS, FEE_RATE_MIN_BPS};

use crate::error::{Error, Result};
use crate::types::parse_address;

/// Admin account allowed to create pools and manage rates.
pub const DEFAULT_OWNER: &str = "0xD9A6e4718919BCE695FC0Cd984b7f28B08d044D3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub owner: String,
    /// Fee applied to pools created without an explicit rate
    pub default_fee_bps: u16,
    /// Pools created (empty) on a fresh service
    pub seed_currencies: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            owner: DEFAULT_OWNER.to_string(),
            default_fee_bps: FEE_RATE_DEFAULT_BPS,
            seed_currencies: DEFAULT_CURRENCIES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl ServiceConfig {
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn with_default_fee(mut self, fee_bps: u16) -> Self {
        self.default_fee_bps = fee_bps;
        self
    }

    pub fn with_seed_currencies<I, S>(mut self, currencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seed_currencies = currencies.into_iter().map(Into::into).collect();
        self
    }

    /// Normalized copy: owner lower-cased, symbols upper-cased and checked.
    pub fn validated(&self) -> Result<Self> {
        if !(FEE_RATE_MIN_BPS..=FEE_RATE_MAX_BPS).contains(&self.default_fee_bps) {
            return Err(Error::InvalidArgument(format!(
                "default fee must be {FEE_RATE_MIN_BPS}-{FEE_RATE_MAX_BPS} bps, got {}",
                self.default_fee_bps
            )));
        }
        let seed_currencies = self
            .seed_currencies
            .iter()
            .map(|c| validate_symbol(c).map_err(Error::from))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            owner: parse_address(&self.owner)?,
            default_fee_bps: self.default_fee_bps,
            seed_currencies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let cfg = ServiceConfig::default().validated().unwrap();
        assert_eq!(cfg.owner, DEFAULT_OWNER.to_ascii_lowercase());
        assert_eq!(cfg.seed_currencies, vec!["USD", "EUR", "GBP"]);
        assert_eq!(cfg.default_fee_bps, 30);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(ServiceConfig::default().with_default_fee(0).validated().is_err());
        assert!(ServiceConfig::default().with_default_fee(101).validated().is_err());
        assert!(ServiceConfig::default().with_owner("admin").validated().is_err());
        assert!(ServiceConfig::default().with_seed_currencies(["US-D"]).validated().is_err());
    }
}
