/// All failures a ledger operation can report.
///
/// Every variant is raised before the pool is touched, so an `Err` always
/// means the stored state is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("Pool not found for currency '{0}'")]
    NotFound(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(&'static str),

    #[error("Pool {0} is inactive")]
    PoolInactive(String),

    #[error("Insufficient shares: requested {requested}, owned {owned}")]
    InsufficientShares { requested: u128, owned: u128 },

    #[error("Pool has insufficient liquidity")]
    InsufficientLiquidity,

    #[error("Output below minimum, slippage exceeded: estimated_out={estimated}, min_out={min}")]
    SlippageExceeded { estimated: u128, min: u128 },

    #[error("Math overflow")]
    MathOverflow,

    #[error("Pool already exists for currency '{0}'")]
    PoolExists(String),

    #[error("Invalid currency symbol '{0}'")]
    InvalidSymbol(String),

    #[error("Fee rate must be 1-100 bps, got {0}")]
    InvalidFeeRate(u16),

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}

/// Stable, transport-facing name of a [`PoolError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidAmount,
    PoolInactive,
    InsufficientShares,
    InsufficientLiquidity,
    SlippageExceeded,
    MathOverflow,
    PoolExists,
    InvalidSymbol,
    InvalidFeeRate,
    CorruptSnapshot,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound              => "NotFound",
            ErrorKind::InvalidAmount         => "InvalidAmount",
            ErrorKind::PoolInactive          => "PoolInactive",
            ErrorKind::InsufficientShares    => "InsufficientShares",
            ErrorKind::InsufficientLiquidity => "InsufficientLiquidity",
            ErrorKind::SlippageExceeded      => "SlippageExceeded",
            ErrorKind::MathOverflow          => "MathOverflow",
            ErrorKind::PoolExists            => "PoolExists",
            ErrorKind::InvalidSymbol         => "InvalidSymbol",
            ErrorKind::InvalidFeeRate        => "InvalidFeeRate",
            ErrorKind::CorruptSnapshot       => "CorruptSnapshot",
        }
    }
}

impl PoolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PoolError::NotFound(_)                 => ErrorKind::NotFound,
            PoolError::InvalidAmount(_)            => ErrorKind::InvalidAmount,
            PoolError::PoolInactive(_)             => ErrorKind::PoolInactive,
            PoolError::InsufficientShares { .. }   => ErrorKind::InsufficientShares,
            PoolError::InsufficientLiquidity       => ErrorKind::InsufficientLiquidity,
            PoolError::SlippageExceeded { .. }     => ErrorKind::SlippageExceeded,
            PoolError::MathOverflow                => ErrorKind::MathOverflow,
            PoolError::PoolExists(_)               => ErrorKind::PoolExists,
            PoolError::InvalidSymbol(_)            => ErrorKind::InvalidSymbol,
            PoolError::InvalidFeeRate(_)           => ErrorKind::InvalidFeeRate,
            PoolError::CorruptSnapshot(_)          => ErrorKind::CorruptSnapshot,
        }
    }
}

/// Convenience alias so every module can write `Result<T>`.
pub type Result<T> = std::result::Result<T, PoolError>;

/// Early-return `Err($err)` unless `$cond` holds.
macro_rules! require {
    ($cond:expr, $err:expr $(,)?) => {
        if !($cond) {
            return Err($err);
        }
    };
}

pub(crate) use require;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_match_variant_names() {
        let cases = [
            (PoolError::NotFound("USD".into()), "NotFound"),
            (PoolError::InsufficientShares { requested: 2, owned: 1 }, "InsufficientShares"),
            (PoolError::SlippageExceeded { estimated: 1, min: 2 }, "SlippageExceeded"),
            (PoolError::MathOverflow, "MathOverflow"),
            (PoolError::CorruptSnapshot(String::new()), "CorruptSnapshot"),
        ];
        for (err, name) in cases {
            assert_eq!(err.kind().as_str(), name);
        }
    }
}
