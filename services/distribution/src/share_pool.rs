//! Share Pool - proportional claims on a pooled underlying balance
//!
//! ## Purpose
//!
//! Mints a fungible share token against deposits of one underlying asset and
//! redeems shares for their pro-rata slice of whatever the pool holds at the
//! time. Revenue sent straight to the pool raises the price of every share.
//!
//! ## Accounting Rules
//!
//! - `share_price = underlying * WAD / total_shares`, par (`WAD`) when empty
//! - `enter(amount)` mints `amount * total_shares / underlying`, or `amount`
//!   when no shares exist
//! - `leave(shares)` pays `shares * underlying / total_shares`, rounded down
//! - Shares held by the pool's own address are burned before any price is
//!   computed, on both paths, so donated shares only benefit holders already
//!   present
//!
//! ```text
//! enter:  burn self-held → price → mint shares → pull underlying
//! leave:  burn self-held → check balance → price → burn shares → push underlying
//! ```

use feeflow_ledger::{Chain, TokenSpec};
use feeflow_types::{mul_div, Address, CallContext, Revert, U256, WAD};
use tracing::{debug, info};

/// Handle to a deployed share pool; the share token lives at the pool address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePool {
    address: Address,
    underlying: Address,
    name: String,
    symbol: String,
}

impl SharePool {
    /// Deploy the pool and its share token
    pub fn deploy(
        chain: &mut Chain,
        address: Address,
        underlying: Address,
        name: &str,
        symbol: &str,
    ) -> Result<Self, Revert> {
        chain.create_token(address, TokenSpec::minted_by(name, symbol, address))?;
        info!(pool = ?address, underlying = ?underlying, symbol, "share pool deployed");
        Ok(Self {
            address,
            underlying,
            name: name.to_string(),
            symbol: symbol.to_string(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn underlying(&self) -> Address {
        self.underlying
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Underlying currently held by the pool
    pub fn balance_underlying(&self, chain: &Chain) -> U256 {
        chain.balance_of(self.underlying, self.address)
    }

    pub fn total_shares(&self, chain: &Chain) -> U256 {
        chain.total_supply(self.address)
    }

    pub fn shares_of(&self, chain: &Chain, account: Address) -> U256 {
        chain.balance_of(self.address, account)
    }

    /// Underlying per share in 18-decimal fixed point
    pub fn share_price(&self, chain: &Chain) -> Result<U256, Revert> {
        let total = self.total_shares(chain);
        if total.is_zero() {
            return Ok(WAD);
        }
        mul_div(self.balance_underlying(chain), WAD, total)
    }

    /// Shares outstanding once self-held shares are burned
    fn effective_shares(&self, chain: &Chain) -> U256 {
        self.total_shares(chain) - self.shares_of(chain, self.address)
    }

    /// Shares `enter(amount)` would mint right now
    pub fn preview_enter(&self, chain: &Chain, amount: U256) -> Result<U256, Revert> {
        let total = self.effective_shares(chain);
        if total.is_zero() {
            return Ok(amount);
        }
        mul_div(amount, total, self.balance_underlying(chain))
    }

    /// Underlying `leave(shares)` would pay right now
    pub fn preview_leave(&self, chain: &Chain, shares: U256) -> Result<U256, Revert> {
        let total = self.effective_shares(chain);
        if shares.is_zero() || total.is_zero() {
            return Ok(U256::zero());
        }
        mul_div(shares, self.balance_underlying(chain), total)
    }

    /// Burn any shares parked at the pool's own address
    fn burn_self_held(&self, chain: &mut Chain) -> Result<U256, Revert> {
        let held = self.shares_of(chain, self.address);
        if !held.is_zero() {
            chain.burn(self.address, self.address, self.address, held)?;
            debug!(pool = ?self.address, shares = %held, "burned self-held shares");
        }
        Ok(held)
    }

    /// Deposit `amount` of underlying for newly minted shares
    pub fn enter(&self, chain: &mut Chain, ctx: &CallContext, amount: U256) -> Result<U256, Revert> {
        chain.atomic(|chain| {
            self.burn_self_held(chain)?;

            let total = self.total_shares(chain);
            let shares = if total.is_zero() {
                amount
            } else {
                mul_div(amount, total, self.balance_underlying(chain))?
            };

            chain.mint(self.address, self.address, ctx.sender, shares)?;
            chain.safe_transfer_from(self.underlying, self.address, ctx.sender, self.address, amount)?;

            info!(pool = ?self.address, account = ?ctx.sender, %amount, %shares, "entered pool");
            Ok(shares)
        })
    }

    /// Redeem `shares` for their slice of the underlying
    pub fn leave(&self, chain: &mut Chain, ctx: &CallContext, shares: U256) -> Result<U256, Revert> {
        chain.atomic(|chain| {
            self.burn_self_held(chain)?;

            let available = self.shares_of(chain, ctx.sender);
            if available < shares {
                return Err(Revert::InsufficientShares {
                    requested: shares,
                    available,
                });
            }

            let amount = if shares.is_zero() {
                U256::zero()
            } else {
                mul_div(shares, self.balance_underlying(chain), self.total_shares(chain))?
            };

            chain.burn(self.address, self.address, ctx.sender, shares)?;
            chain.safe_transfer(self.underlying, self.address, ctx.sender, amount)?;

            info!(pool = ?self.address, account = ?ctx.sender, %shares, %amount, "left pool");
            Ok(amount)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feeflow_types::TransferError;

    const METRIC: u64 = 0x100;
    const POOL: u64 = 0x500;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn setup() -> (Chain, SharePool) {
        let mut chain = Chain::new(addr(0xeeee));
        chain
            .create_token(addr(METRIC), TokenSpec::open("Metric", "METRIC"))
            .unwrap();
        let pool =
            SharePool::deploy(&mut chain, addr(POOL), addr(METRIC), "Metric Share", "xMETRIC")
                .unwrap();
        (chain, pool)
    }

    fn fund(chain: &mut Chain, pool: &SharePool, account: Address, amount: u64) {
        chain.mint(addr(METRIC), account, account, U256::from(amount)).unwrap();
        chain
            .approve(addr(METRIC), account, pool.address(), U256::MAX)
            .unwrap();
    }

    #[test]
    fn test_deployment_state() {
        let (chain, pool) = setup();
        assert_eq!(pool.underlying(), addr(METRIC));
        assert_eq!(pool.symbol(), "xMETRIC");
        assert_eq!(pool.name(), "Metric Share");
        assert!(pool.balance_underlying(&chain).is_zero());
        assert_eq!(pool.share_price(&chain).unwrap(), WAD);
    }

    #[test]
    fn test_enter_requires_balance_and_allowance() {
        let (mut chain, pool) = setup();
        let user = addr(1);

        let err = pool
            .enter(&mut chain, &CallContext::external(user), U256::one())
            .unwrap_err();
        assert_eq!(
            err,
            Revert::TransferFailed {
                token: addr(METRIC),
                reason: TransferError::InsufficientBalance
            }
        );

        chain.mint(addr(METRIC), user, user, U256::from(100u64)).unwrap();
        let err = pool
            .enter(&mut chain, &CallContext::external(user), U256::from(100u64))
            .unwrap_err();
        assert_eq!(
            err,
            Revert::TransferFailed {
                token: addr(METRIC),
                reason: TransferError::InsufficientAllowance
            }
        );
        assert!(pool.total_shares(&chain).is_zero());
    }

    #[test]
    fn test_revenue_raises_redemption() {
        let (mut chain, pool) = setup();
        let user = addr(1);
        fund(&mut chain, &pool, user, 100);

        let shares = pool
            .enter(&mut chain, &CallContext::external(user), U256::from(100u64))
            .unwrap();
        assert_eq!(shares, U256::from(100u64));
        assert_eq!(pool.share_price(&chain).unwrap(), WAD);

        chain.mint(addr(METRIC), pool.address(), pool.address(), U256::from(50u64)).unwrap();
        assert_eq!(
            pool.share_price(&chain).unwrap(),
            U256::from(15u64) * U256::exp10(17)
        );

        let paid = pool
            .leave(&mut chain, &CallContext::external(user), U256::from(100u64))
            .unwrap();
        assert_eq!(paid, U256::from(150u64));
        assert!(pool.total_shares(&chain).is_zero());
        assert_eq!(pool.share_price(&chain).unwrap(), WAD);
    }

    #[test]
    fn test_leave_more_than_held() {
        let (mut chain, pool) = setup();
        let err = pool
            .leave(&mut chain, &CallContext::external(addr(1)), U256::from(100u64))
            .unwrap_err();
        assert_eq!(
            err,
            Revert::InsufficientShares {
                requested: U256::from(100u64),
                available: U256::zero()
            }
        );
    }

    #[test]
    fn test_self_donation_is_burned_before_pricing() {
        let (mut chain, pool) = setup();
        let (alice, bob) = (addr(1), addr(2));
        fund(&mut chain, &pool, alice, 100);
        fund(&mut chain, &pool, bob, 1_000);

        pool.enter(&mut chain, &CallContext::external(alice), U256::from(100u64))
            .unwrap();
        pool.enter(&mut chain, &CallContext::external(bob), U256::from(100u64))
            .unwrap();

        // Bob donates all of his shares back to the pool
        chain
            .safe_transfer(pool.address(), bob, pool.address(), U256::from(100u64))
            .unwrap();
        assert_eq!(pool.preview_enter(&chain, U256::from(10u64)).unwrap(), U256::from(5u64));

        let minted = pool
            .enter(&mut chain, &CallContext::external(bob), U256::from(10u64))
            .unwrap();
        assert_eq!(minted, U256::from(5u64));
        assert!(pool.shares_of(&chain, pool.address()).is_zero());
        assert_eq!(pool.total_shares(&chain), U256::from(105u64));

        let paid = pool
            .leave(&mut chain, &CallContext::external(alice), U256::from(100u64))
            .unwrap();
        assert_eq!(paid, U256::from(200u64));
    }

    #[test]
    fn test_donating_whole_supply_rebootstraps_shares() {
        let (mut chain, pool) = setup();
        let (alice, bob) = (addr(1), addr(2));
        fund(&mut chain, &pool, alice, 100);
        fund(&mut chain, &pool, bob, 40);
        pool.enter(&mut chain, &CallContext::external(alice), U256::from(100u64))
            .unwrap();

        chain
            .safe_transfer(pool.address(), alice, pool.address(), U256::from(100u64))
            .unwrap();
        let price_before = pool.share_price(&chain).unwrap();

        let minted = pool
            .enter(&mut chain, &CallContext::external(bob), U256::from(40u64))
            .unwrap();

        assert_eq!(minted, U256::from(40u64));
        assert!(pool.shares_of(&chain, pool.address()).is_zero());
        assert_eq!(pool.total_shares(&chain), U256::from(40u64));
        assert!(pool.share_price(&chain).unwrap() > price_before);

        let paid = pool
            .leave(&mut chain, &CallContext::external(bob), U256::from(40u64))
            .unwrap();
        assert_eq!(paid, U256::from(140u64));
    }

    #[test]
    fn test_preview_leave_matches_leave() {
        let (mut chain, pool) = setup();
        let user = addr(1);
        fund(&mut chain, &pool, user, 300);
        pool.enter(&mut chain, &CallContext::external(user), U256::from(300u64))
            .unwrap();
        chain.mint(addr(METRIC), pool.address(), pool.address(), U256::from(7u64)).unwrap();

        let preview = pool.preview_leave(&chain, U256::from(120u64)).unwrap();
        let paid = pool
            .leave(&mut chain, &CallContext::external(user), U256::from(120u64))
            .unwrap();
        assert_eq!(preview, paid);
    }
}
