//! # Feeflow AMM Library - Constant-Product Venue
//!
//! ## Purpose
//!
//! Integer Uniswap-V2 mathematics and a router over constant-product pairs.
//! This is the external exchange the fee pipeline converts revenue through
//! and the liquidity venue the compounding vault supplies into.
//!
//! ## Integration Points
//!
//! - **Input Sources**: pair reserves read live from the ledger
//! - **Output Destinations**: exchange adapters, compounding vaults
//! - **Precision**: exact `U256` integer formulas matching on-chain rounding
//!   (outputs round down, required inputs round up)
//! - **Validation**: zero amounts, missing pairs, empty reserves and slippage
//!   floors all surface as [`Revert`](feeflow_types::Revert) reasons
//!
//! ## Architecture Role
//!
//! ```text
//! Adapter / Vault → [Exchange trait] → ConstantProductRouter → Pair balances on Chain
//!                        ↓                      ↓                      ↓
//!                 swap_exact_tokens     V2Math amounts out       LP token mint
//!                 add_liquidity         zap sizing               reserve reads
//! ```

pub mod exchange;
pub mod router;
pub mod v2_math;

pub use exchange::{Exchange, LiquidityReceipt, LiquidityRequest, NO_DEADLINE};
pub use router::{ConstantProductRouter, PairInfo, MINIMUM_LIQUIDITY};
pub use v2_math::V2Math;
