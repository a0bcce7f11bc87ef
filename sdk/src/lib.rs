//! Fiat Pool Rust SDK
//!
//! Typed service layer for the payment gateway's ETH / fiat-token liquidity
//! pools: constant-product swaps, LP positions, fiat exchange rates, and the
//! fiat deposit / withdrawal journal, with snapshot persistence.
//!
//! # Quick Start
//!
//! ```rust
//! use fiat_pool_sdk::{AddLiquidityRequest, FiatPoolClient, SwapDirection};
//!
//! let client = FiatPoolClient::with_defaults();
//! let lp = "0x00000000000000000000000000000000000000a1";
//!
//! // 1. Seed the USD pool
//! client.add_liquidity("USD", AddLiquidityRequest {
//!     address: lp.into(), eth_amount: 1_000_000, token_amount: 1_800_000_000,
//! })?;
//!
//! // 2. Quote before trading
//! let sim = client.simulate("USD", SwapDirection::EthToToken, 1_000)?;
//! println!("Estimated out: {}  price_impact: {:.2}%", sim.estimated_out, sim.price_impact_pct);
//! # Ok::<(), fiat_pool_sdk::Error>(())
//! ```
//!
//! # Feature Overview
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`FiatPoolClient::pools`] | Every pool, ordered by currency |
//! | [`FiatPoolClient::pool_info`] | Reserves, shares, fee and status of one pool |
//! | [`FiatPoolClient::position`] | LP shares and reserve claim of one holder |
//! | [`FiatPoolClient::add_liquidity`] | Deposit ETH + tokens, receive LP shares |
//! | [`FiatPoolClient::remove_liquidity`] | Burn shares, receive both reserves pro rata |
//! | [`FiatPoolClient::swap_eth_for_tokens`] | Sell ETH for fiat tokens |
//! | [`FiatPoolClient::swap_tokens_for_eth`] | Sell fiat tokens for ETH |
//! | [`FiatPoolClient::simulate`] | Fee + slippage breakdown, no state change |
//! | [`FiatPoolClient::convert_fiat_to_eth`] | Fiat amount to wei at the current rate |
//! | [`FiatPoolClient::set_rate`] / [`FiatPoolClient::set_status`] | Owner-only rate management |
//! | [`FiatPoolClient::record_deposit`] / [`FiatPoolClient::record_withdrawal`] | Idempotent fiat transaction journal |
//! | [`FiatPoolClient::dispatch`] | Execute an `op`-tagged [`ApiRequest`] |

pub mod client;
pub mod config;
pub mod error;
pub mod math;
pub mod rates;
pub mod store;
pub mod transactions;
pub mod types;

pub use client::FiatPoolClient;
pub use config::{ServiceConfig, DEFAULT_OWNER};
pub use error::{Error, ErrorBody, Result};
pub use fiat_pool::{Pool, PoolError, PositionView, SwapDirection};
pub use rates::{FiatRate, RateRegistry};
pub use store::{JsonFileStore, MemoryStore, ServiceSnapshot, SnapshotStore, StoreLock};
pub use transactions::{FiatTransaction, TransactionJournal, TransactionKind, TransactionStatus};
pub use types::*;
