//! Fiat Pool: constant-product ETH / fiat-token liquidity ledger.
//!
//! One pool per currency symbol (USD, EUR, GBP, ...). Each pool holds an ETH
//! reserve, a fiat-token reserve and an LP share supply; holders own shares.
//!
//! Operations:
//!   create_pool                register an empty pool with a fee tier
//!   get_pool_info              reserves, share supply, status
//!   get_user_position          shares plus derived ETH / token claim
//!   add_liquidity              deposit both sides, mint shares
//!   remove_liquidity           burn shares, withdraw pro-rata reserves
//!   swap_exact_eth_for_tokens  sell ETH into the pool (x · y = k, fee on input)
//!   swap_exact_tokens_for_eth  sell fiat tokens into the pool
//!   set_pool_active            pause / resume mutations on a pool
//!
//! Every mutation validates first and commits second, so a returned error
//! always leaves the pool exactly as it was. Products of amounts are taken in
//! 256-bit space (see [`math`]), so wei-sized reserves never overflow.

pub mod constants;
pub mod decimal;
pub mod error;
pub mod instructions;
pub mod ledger;
pub mod math;
pub mod state;

pub use constants::*;
pub use error::{ErrorKind, PoolError, Result};
pub use instructions::{
    compute_swap, isqrt, AddLiquidityResult, RemoveLiquidityResult, SwapAmounts, SwapResult,
};
pub use ledger::PoolLedger;
pub use math::{mul_div, wide_mul};
pub use primitive_types::U256;
pub use state::*;
