//! Decimal-string encoding for `u128` amounts.
//!
//! Reserves and shares routinely exceed 2^53, so every amount crosses the
//! serialization boundary as a base-10 string (`"1000000000000000000"`).
//! Use as `#[serde(with = "fiat_pool::decimal")]`.
//!
//! Deserialization also accepts a plain non-negative JSON integer, which is
//! convenient for hand-written request files.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};

use crate::error::{PoolError, Result};

/// Parse a non-negative base-10 integer.
///
/// Rejects empty input, signs, whitespace, fractional parts and values that
/// do not fit in `u128`.
pub fn parse(s: &str) -> Result<u128> {
    if s.is_empty() {
        return Err(PoolError::InvalidAmount("amount is empty"));
    }
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PoolError::InvalidAmount("amount must contain only decimal digits"));
    }
    s.parse::<u128>()
        .map_err(|_| PoolError::InvalidAmount("amount does not fit in 128 bits"))
}

pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u128, D::Error> {
    deserializer.deserialize_any(DecimalVisitor)
}

struct DecimalVisitor;

impl<'de> Visitor<'de> for DecimalVisitor {
    type Value = u128;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative integer encoded as a decimal string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<u128, E> {
        parse(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<u128, E> {
        Ok(v as u128)
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> std::result::Result<u128, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<u128, E> {
        u128::try_from(v).map_err(|_| E::custom("amount must not be negative"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_large_amounts() {
        assert_eq!(parse("1000000000000000000").unwrap(), 1_000_000_000_000_000_000);
        assert_eq!(parse("0").unwrap(), 0);
        assert_eq!(parse(&u128::MAX.to_string()).unwrap(), u128::MAX);
    }

    #[test]
    fn rejects_malformed_amounts() {
        for bad in ["", "-1", "+1", "1.5", " 1", "1e18", "0x10", "abc"] {
            assert!(
                matches!(parse(bad), Err(PoolError::InvalidAmount(_))),
                "{bad:?} should be rejected"
            );
        }
        // one past u128::MAX
        assert!(parse("340282366920938463463374607431768211456").is_err());
    }
}
