pub mod initialize_pool;
pub mod add_liquidity;
pub mod remove_liquidity;
pub mod swap;
pub mod fee_math;

pub use add_liquidity::{isqrt, AddLiquidityResult};
pub use fee_math::{compute_swap, SwapAmounts};
pub use remove_liquidity::RemoveLiquidityResult;
pub use swap::SwapResult;
