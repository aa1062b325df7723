//! Uniswap V2 AMM math with exact integer calculations
//!
//! Mirrors on-chain rounding: outputs round down, required inputs round up.

use feeflow_types::{mul_div, wad_to_decimal, Revert, U256, WAD};
use rust_decimal::Decimal;

const BPS: u64 = 10_000;

/// V2 AMM math functions
pub struct V2Math;

impl V2Math {
    /// Share of each input kept after the pair fee, in basis points
    pub fn fee_factor(fee_bps: u32) -> Result<U256, Revert> {
        BPS.checked_sub(u64::from(fee_bps))
            .filter(|kept| *kept > 0)
            .map(U256::from)
            .ok_or(Revert::InvalidFee { fee_bps })
    }

    /// Exact output for `amount_in` using the x*y=k formula
    ///
    /// # Arguments
    /// * `amount_in` - Input token amount (in token decimals)
    /// * `reserve_in` - Input token reserve
    /// * `reserve_out` - Output token reserve
    /// * `fee_bps` - Fee in basis points (30 = 0.3%)
    pub fn get_amount_out(
        amount_in: U256,
        reserve_in: U256,
        reserve_out: U256,
        fee_bps: u32,
    ) -> Result<U256, Revert> {
        if amount_in.is_zero() {
            return Err(Revert::ZeroAmount);
        }
        if reserve_in.is_zero() || reserve_out.is_zero() {
            return Err(Revert::InsufficientLiquidity);
        }

        let amount_in_with_fee = amount_in
            .checked_mul(Self::fee_factor(fee_bps)?)
            .ok_or(Revert::Overflow)?;
        let denominator = reserve_in
            .checked_mul(U256::from(BPS))
            .and_then(|r| r.checked_add(amount_in_with_fee))
            .ok_or(Revert::Overflow)?;

        mul_div(amount_in_with_fee, reserve_out, denominator)
    }

    /// Amount of B equivalent to `amount_a` at the current reserve ratio
    pub fn quote(amount_a: U256, reserve_a: U256, reserve_b: U256) -> Result<U256, Revert> {
        if amount_a.is_zero() {
            return Err(Revert::ZeroAmount);
        }
        if reserve_a.is_zero() || reserve_b.is_zero() {
            return Err(Revert::InsufficientLiquidity);
        }
        mul_div(amount_a, reserve_b, reserve_a)
    }

    /// Portion of a single-sided `amount_in` to swap so that the remainder and
    /// the swap proceeds match the pair ratio after the swap
    ///
    /// Closed form of `s` in `(a - s) / (r + s') = out(s) / (R - out(s))`:
    /// `s = (sqrt(r * (r * (D + F)^2 + a * 4DF)) - r * (D + F)) / 2F`
    /// with `D = 10000` and `F = 10000 - fee_bps`.
    pub fn optimal_zap_amount(
        amount_in: U256,
        reserve_in: U256,
        fee_bps: u32,
    ) -> Result<U256, Revert> {
        if amount_in.is_zero() {
            return Ok(U256::zero());
        }
        if reserve_in.is_zero() {
            return Err(Revert::InsufficientLiquidity);
        }

        let d = U256::from(BPS);
        let f = Self::fee_factor(fee_bps)?;
        let d_plus_f = d + f;
        let four_df = d * f * U256::from(4u64);

        let inner = reserve_in
            .checked_mul(d_plus_f * d_plus_f)
            .and_then(|x| x.checked_add(amount_in.checked_mul(four_df)?))
            .and_then(|x| x.checked_mul(reserve_in))
            .ok_or(Revert::Overflow)?;
        let root = inner.integer_sqrt();
        let offset = reserve_in.checked_mul(d_plus_f).ok_or(Revert::Overflow)?;

        Ok(root.saturating_sub(offset) / (f * U256::from(2u64)))
    }

    /// LP tokens minted for a deposit into a pair
    ///
    /// First deposit mints `sqrt(a * b) - minimum_liquidity`; later deposits
    /// mint the smaller of the two proportional claims.
    pub fn liquidity_minted(
        amount_a: U256,
        amount_b: U256,
        reserve_a: U256,
        reserve_b: U256,
        total_supply: U256,
        minimum_liquidity: U256,
    ) -> Result<U256, Revert> {
        let minted = if total_supply.is_zero() {
            let root = amount_a
                .checked_mul(amount_b)
                .ok_or(Revert::Overflow)?
                .integer_sqrt();
            root.checked_sub(minimum_liquidity)
                .ok_or(Revert::InsufficientLiquidity)?
        } else {
            let by_a = mul_div(amount_a, total_supply, reserve_a)?;
            let by_b = mul_div(amount_b, total_supply, reserve_b)?;
            by_a.min(by_b)
        };

        if minted.is_zero() {
            return Err(Revert::InsufficientLiquidity);
        }
        Ok(minted)
    }

    /// Spot price of the input token in output units, for display
    pub fn spot_price(reserve_in: U256, reserve_out: U256) -> Option<Decimal> {
        if reserve_in.is_zero() {
            return None;
        }
        wad_to_decimal(mul_div(reserve_out, WAD, reserve_in).ok()?)
    }
}
