//! Dual-asset staking pool
//!
//! Holders lock a liquidity-position token 1:1 for shares; revenue in a
//! different token accumulates in the pool and is paid out pro rata on
//! `leave`, alongside the locked position.

use feeflow_ledger::{Chain, TokenSpec};
use feeflow_types::{mul_div, Address, CallContext, Revert, U256, WAD};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakedRevenueShare {
    address: Address,
    revenue_token: Address,
    staked_token: Address,
    name: String,
    symbol: String,
}

impl StakedRevenueShare {
    pub fn deploy(
        chain: &mut Chain,
        address: Address,
        revenue_token: Address,
        staked_token: Address,
        name: &str,
        symbol: &str,
    ) -> Result<Self, Revert> {
        chain.create_token(address, TokenSpec::minted_by(name, symbol, address))?;
        info!(pool = ?address, staked = ?staked_token, revenue = ?revenue_token, symbol, "staked revenue share deployed");
        Ok(Self {
            address,
            revenue_token,
            staked_token,
            name: name.to_string(),
            symbol: symbol.to_string(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn revenue_token(&self) -> Address {
        self.revenue_token
    }

    pub fn staked_token(&self) -> Address {
        self.staked_token
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Revenue waiting to be claimed
    pub fn balance(&self, chain: &Chain) -> U256 {
        chain.balance_of(self.revenue_token, self.address)
    }

    pub fn total_shares(&self, chain: &Chain) -> U256 {
        chain.total_supply(self.address)
    }

    pub fn shares_of(&self, chain: &Chain, account: Address) -> U256 {
        chain.balance_of(self.address, account)
    }

    /// Revenue per share in 18-decimal fixed point; zero with no stakers
    pub fn share_price(&self, chain: &Chain) -> Result<U256, Revert> {
        let total = self.total_shares(chain);
        if total.is_zero() {
            return Ok(U256::zero());
        }
        mul_div(self.balance(chain), WAD, total)
    }

    /// Lock `amount` of the staked token for the same number of shares
    pub fn enter(&self, chain: &mut Chain, ctx: &CallContext, amount: U256) -> Result<U256, Revert> {
        chain.atomic(|chain| {
            chain.mint(self.address, self.address, ctx.sender, amount)?;
            chain.safe_transfer_from(self.staked_token, self.address, ctx.sender, self.address, amount)?;
            info!(pool = ?self.address, account = ?ctx.sender, %amount, "staked");
            Ok(amount)
        })
    }

    /// Unlock `shares` of the staked token plus their slice of revenue
    ///
    /// Returns the revenue paid.
    pub fn leave(&self, chain: &mut Chain, ctx: &CallContext, shares: U256) -> Result<U256, Revert> {
        chain.atomic(|chain| {
            let available = self.shares_of(chain, ctx.sender);
            if available < shares {
                return Err(Revert::InsufficientShares {
                    requested: shares,
                    available,
                });
            }

            let revenue = if shares.is_zero() {
                U256::zero()
            } else {
                mul_div(shares, self.balance(chain), self.total_shares(chain))?
            };

            chain.burn(self.address, self.address, ctx.sender, shares)?;
            chain.safe_transfer(self.staked_token, self.address, ctx.sender, shares)?;
            if !revenue.is_zero() {
                chain.safe_transfer(self.revenue_token, self.address, ctx.sender, revenue)?;
            }

            info!(pool = ?self.address, account = ?ctx.sender, %shares, %revenue, "unstaked");
            Ok(revenue)
        })
    }
}
