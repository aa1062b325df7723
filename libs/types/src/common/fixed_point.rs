//! Fixed-point arithmetic for share prices, weights and incentive rates
//!
//! All rates use 18 decimals (`WAD`). Percentages are expressed against
//! `HUNDRED_PERCENT` (100 * WAD), so `1 * WAD` is one percent.
//!
//! ## Design Principles
//!
//! - **No Precision Loss**: products are computed in 512 bits before dividing
//! - **Round Down**: every division truncates, in the holder's disfavour
//! - **Overflow Protection**: results that do not fit 256 bits are errors
//! - **Clear Boundaries**: decimals only appear at the configuration edge

use crate::common::errors::{FixedPointError, Revert};
use ethers_core::types::{Address, H160, U256, U512};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// 1.0 in 18-decimal fixed point
pub const WAD: U256 = U256([1_000_000_000_000_000_000, 0, 0, 0]);

/// 100% reference for incentive rates (1e20)
pub const HUNDRED_PERCENT: U256 = U256([7_766_279_631_452_241_920, 5, 0, 0]);

/// Sentinel address standing for the native currency in swap inputs
pub const NATIVE_CURRENCY: Address = H160([0u8; 20]);

/// `a * b / denominator` with a 512-bit intermediate, rounding down
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256, Revert> {
    if denominator.is_zero() {
        return Err(Revert::DivisionByZero);
    }
    let quotient = a.full_mul(b) / U512::from(denominator);
    U256::try_from(quotient).map_err(|_| Revert::Overflow)
}

/// `amount * rate / HUNDRED_PERCENT`, rounding down
pub fn percent_of(amount: U256, rate: U256) -> Result<U256, Revert> {
    mul_div(amount, rate, HUNDRED_PERCENT)
}

/// Scale a human-readable decimal (e.g. `40` or `0.5`) to 18 decimals
///
/// Digits beyond the 18th decimal are truncated.
pub fn wad_from_decimal(value: Decimal) -> Result<U256, FixedPointError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(FixedPointError::Negative {
            value: value.to_string(),
        });
    }

    let integer = value.trunc();
    let fraction = value - integer;

    let whole = integer.to_u128().ok_or_else(|| FixedPointError::Overflow {
        value: value.to_string(),
    })?;
    let scaled_fraction = (fraction * Decimal::from(1_000_000_000_000_000_000u64))
        .trunc()
        .to_u128()
        .ok_or_else(|| FixedPointError::Overflow {
            value: value.to_string(),
        })?;

    U256::from(whole)
        .checked_mul(WAD)
        .and_then(|w| w.checked_add(U256::from(scaled_fraction)))
        .ok_or_else(|| FixedPointError::Overflow {
            value: value.to_string(),
        })
}

/// Render an 18-decimal value as a `Decimal` for display and reports
///
/// Only for logging and presentation; never feed the result back into
/// accounting.
pub fn wad_to_decimal(value: U256) -> Option<Decimal> {
    let whole = value / WAD;
    let fraction = value % WAD;
    if whole > U256::from(u64::MAX) {
        return None;
    }
    let fraction = Decimal::from_i128_with_scale(fraction.as_u128() as i128, 18);
    Some(Decimal::from(whole.as_u64()) + fraction)
}
