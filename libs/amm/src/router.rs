//! Constant-product router over V2-style pairs
//!
//! Pair reserves are the pair address' balances on the ledger; LP tokens are
//! ledger tokens minted by the pair itself.

use crate::exchange::{Exchange, LiquidityReceipt, LiquidityRequest};
use crate::v2_math::V2Math;
use feeflow_ledger::{Chain, TokenSpec};
use feeflow_types::{Address, CallContext, Revert, U256};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// LP tokens permanently locked on the first deposit into a pair
pub const MINIMUM_LIQUIDITY: u64 = 1_000;

/// Pair metadata; `token0 < token1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairInfo {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub fee_bps: u32,
}

impl PairInfo {
    /// The pair's LP token lives at the pair address
    pub fn lp_token(&self) -> Address {
        self.address
    }
}

fn sort_tokens(token_a: Address, token_b: Address) -> (Address, Address) {
    if token_a < token_b {
        (token_a, token_b)
    } else {
        (token_b, token_a)
    }
}

/// Router and factory for constant-product pairs
#[derive(Debug, Clone)]
pub struct ConstantProductRouter {
    address: Address,
    pairs: BTreeMap<(Address, Address), PairInfo>,
}

impl ConstantProductRouter {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            pairs: BTreeMap::new(),
        }
    }

    /// Deploy a pair and its LP token
    pub fn create_pair(
        &mut self,
        chain: &mut Chain,
        token_a: Address,
        token_b: Address,
        pair_address: Address,
        fee_bps: u32,
    ) -> Result<PairInfo, Revert> {
        V2Math::fee_factor(fee_bps)?;
        let key = sort_tokens(token_a, token_b);
        if let Some(existing) = self.pairs.get(&key) {
            return Err(Revert::TokenExists {
                token: existing.address,
            });
        }

        chain.create_token(
            pair_address,
            TokenSpec::minted_by("Uniswap V2", "UNI-V2", pair_address),
        )?;

        let pair = PairInfo {
            address: pair_address,
            token0: key.0,
            token1: key.1,
            fee_bps,
        };
        self.pairs.insert(key, pair);
        info!(pair = ?pair_address, token0 = ?key.0, token1 = ?key.1, fee_bps, "pair created");
        Ok(pair)
    }
}

impl Exchange for ConstantProductRouter {
    fn address(&self) -> Address {
        self.address
    }

    fn pair(&self, token_a: Address, token_b: Address) -> Result<PairInfo, Revert> {
        self.pairs
            .get(&sort_tokens(token_a, token_b))
            .copied()
            .ok_or(Revert::UnknownPair { token_a, token_b })
    }

    fn get_reserves(
        &self,
        chain: &Chain,
        token_a: Address,
        token_b: Address,
    ) -> Result<(U256, U256), Revert> {
        let pair = self.pair(token_a, token_b)?;
        Ok((
            chain.balance_of(token_a, pair.address),
            chain.balance_of(token_b, pair.address),
        ))
    }

    fn get_amounts_out(
        &self,
        chain: &Chain,
        amount_in: U256,
        path: &[Address],
    ) -> Result<Vec<U256>, Revert> {
        if path.len() < 2 {
            return Err(Revert::SwapFailed {
                reason: "path must contain at least two tokens".to_string(),
            });
        }

        let mut amounts = Vec::with_capacity(path.len());
        amounts.push(amount_in);
        for hop in path.windows(2) {
            let pair = self.pair(hop[0], hop[1])?;
            let (reserve_in, reserve_out) = self.get_reserves(chain, hop[0], hop[1])?;
            let last = amounts[amounts.len() - 1];
            amounts.push(V2Math::get_amount_out(
                last,
                reserve_in,
                reserve_out,
                pair.fee_bps,
            )?);
        }
        Ok(amounts)
    }

    fn swap_exact_tokens_for_tokens(
        &self,
        chain: &mut Chain,
        ctx: &CallContext,
        amount_in: U256,
        amount_out_min: U256,
        path: &[Address],
        to: Address,
        _deadline: u64,
    ) -> Result<Vec<U256>, Revert> {
        let amounts = self.get_amounts_out(chain, amount_in, path)?;
        let amount_out = amounts[amounts.len() - 1];
        if amount_out < amount_out_min {
            return Err(Revert::InsufficientOutput {
                amount_out,
                min_out: amount_out_min,
            });
        }

        let first = self.pair(path[0], path[1])?;
        chain.safe_transfer_from(path[0], self.address, ctx.sender, first.address, amount_in)?;

        for (i, hop) in path.windows(2).enumerate() {
            let pair = self.pair(hop[0], hop[1])?;
            let recipient = match path.get(i + 2) {
                Some(next) => self.pair(hop[1], *next)?.address,
                None => to,
            };
            chain.safe_transfer(hop[1], pair.address, recipient, amounts[i + 1])?;
        }

        debug!(
            sender = ?ctx.sender,
            hops = path.len() - 1,
            %amount_in,
            %amount_out,
            "venue swap"
        );
        Ok(amounts)
    }

    fn add_liquidity(
        &self,
        chain: &mut Chain,
        ctx: &CallContext,
        request: LiquidityRequest,
    ) -> Result<LiquidityReceipt, Revert> {
        let pair = self.pair(request.token_a, request.token_b)?;
        let (reserve_a, reserve_b) = self.get_reserves(chain, request.token_a, request.token_b)?;

        let (amount_a, amount_b) = if reserve_a.is_zero() && reserve_b.is_zero() {
            (request.amount_a_desired, request.amount_b_desired)
        } else {
            let b_optimal = V2Math::quote(request.amount_a_desired, reserve_a, reserve_b)?;
            if b_optimal <= request.amount_b_desired {
                if b_optimal < request.amount_b_min {
                    return Err(Revert::InsufficientOutput {
                        amount_out: b_optimal,
                        min_out: request.amount_b_min,
                    });
                }
                (request.amount_a_desired, b_optimal)
            } else {
                let a_optimal = V2Math::quote(request.amount_b_desired, reserve_b, reserve_a)?;
                if a_optimal < request.amount_a_min {
                    return Err(Revert::InsufficientOutput {
                        amount_out: a_optimal,
                        min_out: request.amount_a_min,
                    });
                }
                (a_optimal, request.amount_b_desired)
            }
        };

        let supply = chain.total_supply(pair.address);
        let liquidity = V2Math::liquidity_minted(
            amount_a,
            amount_b,
            reserve_a,
            reserve_b,
            supply,
            U256::from(MINIMUM_LIQUIDITY),
        )?;

        chain.safe_transfer_from(request.token_a, self.address, ctx.sender, pair.address, amount_a)?;
        chain.safe_transfer_from(request.token_b, self.address, ctx.sender, pair.address, amount_b)?;
        if supply.is_zero() {
            chain.mint(
                pair.address,
                pair.address,
                Address::zero(),
                U256::from(MINIMUM_LIQUIDITY),
            )?;
        }
        chain.mint(pair.address, pair.address, request.to, liquidity)?;

        debug!(
            pair = ?pair.address,
            %amount_a,
            %amount_b,
            %liquidity,
            "liquidity added"
        );
        Ok(LiquidityReceipt {
            amount_a,
            amount_b,
            liquidity,
        })
    }
}
