//! Compounding Vault - a share pool over a venue liquidity position
//!
//! ## Purpose
//!
//! Depositors enter with LP tokens of the revenue/paired pair. Revenue sent to
//! the vault is periodically turned into more LP: part of it is swapped for the
//! paired leg through the exchange adapter and both legs are supplied back to
//! the venue. New LP accrues to the vault without minting shares, so every
//! share is worth more underlying afterwards.
//!
//! ## Pair Balancing
//!
//! The swapped portion is the closed-form zap amount for the pair's current
//! reserves, rounded down. Rounding down keeps the paired leg the limiting
//! side of the deposit, so the vault never keeps paired-token dust; a few
//! wei of revenue may stay behind for the next round.
//!
//! ```text
//! revenue ──swap s──→ adapter ──paired──┐
//!    └──── revenue - s ─────────────────┴→ add_liquidity → LP held by vault
//! ```

use crate::batch::BatchTarget;
use crate::exchange_adapter::{swap_failed, ExchangeAdapter};
use crate::share_pool::SharePool;
use feeflow_amm::{Exchange, LiquidityRequest, V2Math};
use feeflow_ledger::Chain;
use feeflow_types::{Address, CallContext, Revert, U256};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Amounts moved by one `compound()` run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompoundReport {
    /// Revenue balance found in the vault
    pub revenue: U256,
    /// Revenue swapped for the paired token
    pub swapped: U256,
    /// Paired token received from the swap
    pub paired: U256,
    /// LP tokens added to the vault
    pub liquidity: U256,
}

#[derive(Debug, Clone)]
pub struct CompoundingVault {
    pool: SharePool,
    revenue_token: Address,
    paired_token: Address,
    adapter: Arc<dyn ExchangeAdapter>,
    exchange: Arc<dyn Exchange>,
}

impl CompoundingVault {
    /// Deploy a vault over the `revenue_token` / adapter-output pair
    pub fn deploy(
        chain: &mut Chain,
        address: Address,
        revenue_token: Address,
        adapter: Arc<dyn ExchangeAdapter>,
        exchange: Arc<dyn Exchange>,
        name: &str,
        symbol: &str,
    ) -> Result<Self, Revert> {
        let paired_token = adapter.output_token();
        if paired_token == revenue_token {
            return Err(Revert::InvalidOutputToken {
                token: paired_token,
            });
        }
        let pair = exchange.pair(revenue_token, paired_token)?;
        let pool = SharePool::deploy(chain, address, pair.lp_token(), name, symbol)?;
        Ok(Self {
            pool,
            revenue_token,
            paired_token,
            adapter,
            exchange,
        })
    }

    pub fn pool(&self) -> &SharePool {
        &self.pool
    }

    pub fn address(&self) -> Address {
        self.pool.address()
    }

    /// LP token held on behalf of depositors
    pub fn underlying(&self) -> Address {
        self.pool.underlying()
    }

    pub fn revenue_token(&self) -> Address {
        self.revenue_token
    }

    pub fn paired_token(&self) -> Address {
        self.paired_token
    }

    pub fn exchange_adapter(&self) -> Address {
        self.adapter.address()
    }

    pub fn share_price(&self, chain: &Chain) -> Result<U256, Revert> {
        self.pool.share_price(chain)
    }

    pub fn enter(&self, chain: &mut Chain, ctx: &CallContext, amount: U256) -> Result<U256, Revert> {
        self.pool.enter(chain, ctx, amount)
    }

    pub fn leave(&self, chain: &mut Chain, ctx: &CallContext, shares: U256) -> Result<U256, Revert> {
        self.pool.leave(chain, ctx, shares)
    }

    /// Reinvest the vault's revenue balance into more LP
    ///
    /// Permissionless. A vault with no revenue, or too little to swap, is left
    /// untouched.
    pub fn compound(&self, chain: &mut Chain, ctx: &CallContext) -> Result<CompoundReport, Revert> {
        chain.atomic(|chain| {
            let vault = self.pool.address();
            let revenue = chain.balance_of(self.revenue_token, vault);
            if revenue.is_zero() {
                debug!(vault = ?vault, "no revenue to compound");
                return Ok(CompoundReport::default());
            }

            let pair = self
                .exchange
                .pair(self.revenue_token, self.paired_token)
                .map_err(swap_failed)?;
            let (reserve_in, _) = self
                .exchange
                .get_reserves(chain, self.revenue_token, self.paired_token)
                .map_err(swap_failed)?;
            let swapped = V2Math::optimal_zap_amount(revenue, reserve_in, pair.fee_bps)
                .map_err(swap_failed)?;
            if swapped.is_zero() {
                debug!(vault = ?vault, %revenue, "revenue too small to compound");
                return Ok(CompoundReport::default());
            }

            let forwarded = ctx.forwarded(vault);
            chain.ensure_allowance(self.revenue_token, vault, self.adapter.address(), swapped)?;
            let paired = self.adapter.swap(
                chain,
                &forwarded,
                self.revenue_token,
                swapped,
                U256::zero(),
                vault,
            )?;

            let remaining = revenue - swapped;
            chain.ensure_allowance(self.revenue_token, vault, self.exchange.address(), remaining)?;
            chain.ensure_allowance(self.paired_token, vault, self.exchange.address(), paired)?;
            let receipt = self
                .exchange
                .add_liquidity(
                    chain,
                    &forwarded,
                    LiquidityRequest {
                        token_a: self.revenue_token,
                        token_b: self.paired_token,
                        amount_a_desired: remaining,
                        amount_b_desired: paired,
                        amount_a_min: U256::zero(),
                        amount_b_min: U256::zero(),
                        to: vault,
                    },
                )
                .map_err(swap_failed)?;

            let report = CompoundReport {
                revenue,
                swapped,
                paired,
                liquidity: receipt.liquidity,
            };
            info!(
                vault = ?vault,
                keeper = ?ctx.origin,
                %revenue,
                %swapped,
                liquidity = %receipt.liquidity,
                "compounded revenue"
            );
            Ok(report)
        })
    }
}

impl BatchTarget for CompoundingVault {
    fn address(&self) -> Address {
        self.pool.address()
    }

    fn invoke(&self, chain: &mut Chain, ctx: &CallContext) -> Result<(), Revert> {
        self.compound(chain, ctx).map(|_| ())
    }
}
