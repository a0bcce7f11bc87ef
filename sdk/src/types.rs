//! Public request / response types for the Fiat Pool SDK.
//!
//! Every amount travels as a decimal string (`"1000000000000000000"`) so no
//! JSON consumer loses precision; integers are accepted on input as well.

use fiat_pool::{Pool, PositionView, SwapDirection};
use serde::{Deserialize, Serialize};

use crate::transactions::FiatTransaction;
use crate::error::{Error, Result};
use crate::rates::FiatRate;

// ─── Liquidity ────────────────────────────────────────────────────────────────

/// Body of `POST /pools/{currency}/add-liquidity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLiquidityRequest {
    pub address: String,
    #[serde(with = "fiat_pool::decimal")]
    pub eth_amount: u128,
    #[serde(with = "fiat_pool::decimal")]
    pub token_amount: u128,
}

/// Body of `POST /pools/{currency}/remove-liquidity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveLiquidityRequest {
    pub address: String,
    #[serde(with = "fiat_pool::decimal")]
    pub share_amount: u128,
}

// ─── Swaps ────────────────────────────────────────────────────────────────────

/// Body of `POST /pools/{currency}/swap/eth-to-token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapEthForTokensRequest {
    pub address: String,
    #[serde(with = "fiat_pool::decimal")]
    pub eth_in: u128,
    /// Slippage guard; omitted or `"0"` accepts any positive output.
    #[serde(with = "fiat_pool::decimal", default)]
    pub min_out: u128,
}

/// Body of `POST /pools/{currency}/swap/token-to-eth`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapTokensForEthRequest {
    pub address: String,
    #[serde(with = "fiat_pool::decimal")]
    pub token_in: u128,
    #[serde(with = "fiat_pool::decimal", default)]
    pub min_out: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapEthForTokensResponse {
    #[serde(with = "fiat_pool::decimal")]
    pub token_out: u128,
    pub pool: Pool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapTokensForEthResponse {
    #[serde(with = "fiat_pool::decimal")]
    pub eth_out: u128,
    pub pool: Pool,
}

/// Full fee and slippage breakdown for a hypothetical swap.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateResult {
    pub currency:         String,
    pub direction:        SwapDirection,
    #[serde(with = "fiat_pool::decimal")]
    pub amount_in:        u128,
    /// Portion of `amount_in` kept by liquidity providers
    #[serde(with = "fiat_pool::decimal")]
    pub fee_amount:       u128,
    #[serde(with = "fiat_pool::decimal")]
    pub after_fee:        u128,
    #[serde(with = "fiat_pool::decimal")]
    pub estimated_out:    u128,
    /// `estimated_out / amount_in`
    pub effective_rate:   f64,
    /// `after_fee / (reserve_in + after_fee) × 100`
    pub price_impact_pct: f64,
    pub fee_rate_bps:     u16,
    #[serde(with = "fiat_pool::decimal")]
    pub reserve_in:       u128,
    #[serde(with = "fiat_pool::decimal")]
    pub reserve_out:      u128,
}

// ─── Positions ────────────────────────────────────────────────────────────────

/// One row of `GET /positions/{address}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionEntry {
    pub currency: String,
    #[serde(flatten)]
    pub position: PositionView,
}

// ─── Admin / rates ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePoolRequest {
    pub caller: String,
    pub currency: String,
    /// Falls back to the service default when omitted.
    #[serde(default)]
    pub fee_rate_bps: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRateRequest {
    pub caller: String,
    pub currency: String,
    #[serde(with = "fiat_pool::decimal")]
    pub rate: u128,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStatusRequest {
    pub caller: String,
    pub currency: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateEntry {
    pub currency: String,
    #[serde(flatten)]
    pub rate: FiatRate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub currency: String,
    pub is_active: bool,
    /// `None` when the currency has a rate but no pool
    pub pool: Option<Pool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub currency: String,
    #[serde(with = "fiat_pool::decimal")]
    pub fiat_amount: u128,
    /// Equivalent amount in wei
    #[serde(with = "fiat_pool::decimal")]
    pub eth_amount: u128,
    pub rate: FiatRate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerCheck {
    pub address: String,
    pub is_owner: bool,
}

// ─── Fiat transactions ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub address: String,
    pub currency: String,
    #[serde(with = "fiat_pool::decimal")]
    pub amount: u128,
    pub transaction_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    pub address: String,
    pub currency: String,
    #[serde(with = "fiat_pool::decimal")]
    pub amount: u128,
    pub transaction_hash: String,
}

/// A journaled transaction plus the account's balance in that currency
/// after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction: FiatTransaction,
    #[serde(with = "fiat_pool::decimal")]
    pub balance: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsResponse {
    pub address: String,
    pub transactions: Vec<FiatTransaction>,
}

// ─── Service ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub pools: usize,
    pub active_pools: usize,
    pub currencies: usize,
    pub transactions: usize,
}

/// One operation addressed to the service, tagged by `op`:
///
/// ```json
/// {"op":"swap-eth-to-token","currency":"usd","address":"0xab…","ethIn":"10"}
/// ```
///
/// This is the transport-neutral form of the HTTP route table; `batch`
/// input files carry one of these per line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum ApiRequest {
    Health,
    ListPools,
    PoolInfo {
        currency: String,
    },
    Position {
        currency: String,
        address: String,
    },
    Positions {
        address: String,
    },
    #[serde(rename_all = "camelCase")]
    AddLiquidity {
        currency: String,
        address: String,
        #[serde(with = "fiat_pool::decimal")]
        eth_amount: u128,
        #[serde(with = "fiat_pool::decimal")]
        token_amount: u128,
    },
    #[serde(rename_all = "camelCase")]
    RemoveLiquidity {
        currency: String,
        address: String,
        #[serde(with = "fiat_pool::decimal")]
        share_amount: u128,
    },
    #[serde(rename_all = "camelCase")]
    SwapEthToToken {
        currency: String,
        address: String,
        #[serde(with = "fiat_pool::decimal")]
        eth_in: u128,
        #[serde(with = "fiat_pool::decimal", default)]
        min_out: u128,
    },
    #[serde(rename_all = "camelCase")]
    SwapTokenToEth {
        currency: String,
        address: String,
        #[serde(with = "fiat_pool::decimal")]
        token_in: u128,
        #[serde(with = "fiat_pool::decimal", default)]
        min_out: u128,
    },
    #[serde(rename_all = "camelCase")]
    Simulate {
        currency: String,
        direction: SwapDirection,
        #[serde(with = "fiat_pool::decimal")]
        amount_in: u128,
    },
    #[serde(rename_all = "camelCase")]
    CreatePool {
        caller: String,
        currency: String,
        #[serde(default)]
        fee_rate_bps: Option<u16>,
    },
    Rates,
    Rate {
        currency: String,
    },
    #[serde(rename_all = "camelCase")]
    Convert {
        currency: String,
        #[serde(with = "fiat_pool::decimal")]
        fiat_amount: u128,
    },
    CheckOwner {
        address: String,
    },
    SetRate {
        caller: String,
        currency: String,
        #[serde(with = "fiat_pool::decimal")]
        rate: u128,
        decimals: u8,
    },
    #[serde(rename_all = "camelCase")]
    SetStatus {
        caller: String,
        currency: String,
        is_active: bool,
    },
    #[serde(rename_all = "camelCase")]
    RecordDeposit {
        address: String,
        currency: String,
        #[serde(with = "fiat_pool::decimal")]
        amount: u128,
        transaction_hash: String,
    },
    #[serde(rename_all = "camelCase")]
    RecordWithdrawal {
        address: String,
        currency: String,
        #[serde(with = "fiat_pool::decimal")]
        amount: u128,
        transaction_hash: String,
    },
    #[serde(alias = "deposits")]
    Transactions {
        address: String,
    },
}

impl ApiRequest {
    /// The `op` tag, for logging.
    pub fn op(&self) -> &'static str {
        match self {
            ApiRequest::Health              => "health",
            ApiRequest::ListPools           => "list-pools",
            ApiRequest::PoolInfo { .. }     => "pool-info",
            ApiRequest::Position { .. }     => "position",
            ApiRequest::Positions { .. }    => "positions",
            ApiRequest::AddLiquidity { .. } => "add-liquidity",
            ApiRequest::RemoveLiquidity { .. } => "remove-liquidity",
            ApiRequest::SwapEthToToken { .. }  => "swap-eth-to-token",
            ApiRequest::SwapTokenToEth { .. }  => "swap-token-to-eth",
            ApiRequest::Simulate { .. }     => "simulate",
            ApiRequest::CreatePool { .. }   => "create-pool",
            ApiRequest::Rates               => "rates",
            ApiRequest::Rate { .. }         => "rate",
            ApiRequest::Convert { .. }      => "convert",
            ApiRequest::CheckOwner { .. }   => "check-owner",
            ApiRequest::SetRate { .. }      => "set-rate",
            ApiRequest::SetStatus { .. }    => "set-status",
            ApiRequest::RecordDeposit { .. } => "record-deposit",
            ApiRequest::RecordWithdrawal { .. } => "record-withdrawal",
            ApiRequest::Transactions { .. } => "transactions",
        }
    }
}

/// Status plus JSON body: the result on success, an [`crate::ErrorBody`] otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ─── Validation ───────────────────────────────────────────────────────────────

/// Accept a `0x`-prefixed, 40-hex-digit account address and return it
/// lower-cased.
pub fn parse_address(address: &str) -> Result<String> {
    let trimmed = address.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| Error::InvalidArgument(format!("address '{address}' must start with 0x")))?;
    if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::InvalidArgument(format!(
            "address '{address}' must be 0x followed by 40 hex digits"
        )));
    }
    Ok(format!("0x{}", hex.to_ascii_lowercase()))
}
