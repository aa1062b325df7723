//! # Feeflow Types Library
//!
//! Shared vocabulary for every Feeflow crate: 256-bit amounts, 18-decimal
//! fixed-point helpers, the per-call execution context and the revert
//! taxonomy that every value-bearing operation reports through.
//!
//! ## Design Philosophy
//!
//! - **No Precision Loss**: amounts are `U256` integers, proportional math goes
//!   through a 512-bit intermediate and always rounds down
//! - **No Silent Wrapping**: overflow is a [`Revert::Overflow`], never a wrap
//! - **One Failure Type**: [`Revert`] is the single error surfaced by contracts,
//!   so atomic scopes can restore state on any of them
//!
//! ## Quick Start
//!
//! ```rust
//! use feeflow_types::{mul_div, CallContext, Address, U256, WAD};
//!
//! let keeper = Address::from_low_u64_be(7);
//! let ctx = CallContext::external(keeper);
//! assert_eq!(ctx.origin, keeper);
//!
//! // 40% of 1000 units
//! let weight = U256::from(40u64) * WAD;
//! let slice = mul_div(U256::from(1000u64), weight, U256::from(100u64) * WAD).unwrap();
//! assert_eq!(slice, U256::from(400u64));
//! ```

pub mod common;

pub use common::context::CallContext;
pub use common::errors::{FixedPointError, Revert, TransferError};
pub use common::fixed_point::{
    mul_div, percent_of, wad_from_decimal, wad_to_decimal, HUNDRED_PERCENT, NATIVE_CURRENCY, WAD,
};

/// Ledger primitives shared with the ethers stack
pub use ethers_core::types::{Address, Bytes, U256, U512};
