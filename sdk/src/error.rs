//! SDK error type.

use fiat_pool::PoolError;
use serde::Serialize;

/// All errors returned by the Fiat Pool SDK.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ── Ledger ───────────────────────────────────────────────────────────────
    /// A pool operation was rejected; the pool is unchanged.
    #[error(transparent)]
    Pool(#[from] PoolError),

    // ── Rates / admin ────────────────────────────────────────────────────────
    /// No fiat rate is registered for this currency.
    #[error("Currency not found: {0}")]
    CurrencyNotFound(String),

    /// The currency exists but has been deactivated by the owner.
    #[error("Currency {0} is inactive")]
    RateInactive(String),

    /// An owner-only call was made by another address.
    #[error("Not authorized: {0} is not the owner")]
    Unauthorized(String),

    // ── Fiat journal ─────────────────────────────────────────────────────────
    /// A withdrawal asked for more than the account's deposits cover.
    #[error("Insufficient fiat balance: requested {requested}, available {available}")]
    InsufficientFiatBalance { requested: u128, available: u128 },

    // ── Validation ───────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ── Persistence ──────────────────────────────────────────────────────────
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Stable error name used in response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Pool(e)             => e.kind().as_str(),
            Error::CurrencyNotFound(_) => "NotFound",
            Error::RateInactive(_)     => "RateInactive",
            Error::Unauthorized(_)     => "Unauthorized",
            Error::InsufficientFiatBalance { .. } => "InsufficientFiatBalance",
            Error::InvalidArgument(_)  => "InvalidArgument",
            Error::Io(_)               => "StorageError",
            Error::Json(_)             => "StorageError",
        }
    }

    /// HTTP-equivalent status: 404 unknown currency, 403 non-owner,
    /// 400 validation, 500 storage.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Pool(PoolError::NotFound(_)) | Error::CurrencyNotFound(_) => 404,
            Error::Pool(PoolError::PoolExists(_))                           => 409,
            Error::Pool(PoolError::CorruptSnapshot(_))                      => 500,
            Error::Pool(_)                                                  => 400,
            Error::RateInactive(_) | Error::InvalidArgument(_)              => 400,
            Error::InsufficientFiatBalance { .. }                           => 400,
            Error::Unauthorized(_)                                          => 403,
            Error::Io(_) | Error::Json(_)                                   => 500,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody { error: self.kind(), message: self.to_string() }
    }
}

/// `{ "error": <kind>, "message": <text> }`
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

/// Convenience alias so every module can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;
