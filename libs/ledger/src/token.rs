//! Fungible token ledger with configurable failure behaviour

use feeflow_types::{Address, Revert, TransferError, U256};
use std::collections::BTreeMap;

/// How a token reports a failed transfer or approval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenBehavior {
    /// Failure is an error and the call reverts
    #[default]
    Reverting,
    /// Failure leaves state untouched and returns `false`
    ReturnsFalse,
}

/// Who may mint and burn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintAuthority {
    /// Anyone may mint to themselves (faucet-style test tokens)
    Open,
    /// Only this address may mint or burn
    Only(Address),
}

/// Deployment parameters for a token
#[derive(Debug, Clone)]
pub struct TokenSpec {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub behavior: TokenBehavior,
    pub mint_authority: MintAuthority,
}

impl TokenSpec {
    /// Standard 18-decimal reverting token with an open faucet
    pub fn open(name: &str, symbol: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals: 18,
            behavior: TokenBehavior::Reverting,
            mint_authority: MintAuthority::Open,
        }
    }

    /// 18-decimal token whose supply is controlled by `minter`
    pub fn minted_by(name: &str, symbol: &str, minter: Address) -> Self {
        Self {
            mint_authority: MintAuthority::Only(minter),
            ..Self::open(name, symbol)
        }
    }

    pub fn with_behavior(mut self, behavior: TokenBehavior) -> Self {
        self.behavior = behavior;
        self
    }
}

/// Balances, allowances and supply of one token
#[derive(Debug, Clone)]
pub struct TokenLedger {
    address: Address,
    spec: TokenSpec,
    total_supply: U256,
    balances: BTreeMap<Address, U256>,
    allowances: BTreeMap<(Address, Address), U256>,
}

impl TokenLedger {
    pub fn new(address: Address, spec: TokenSpec) -> Self {
        Self {
            address,
            spec,
            total_supply: U256::zero(),
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn spec(&self) -> &TokenSpec {
        &self.spec
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default()
    }

    fn fail(&self, reason: TransferError) -> Result<bool, Revert> {
        match self.spec.behavior {
            TokenBehavior::Reverting => Err(Revert::TransferFailed {
                token: self.address,
                reason,
            }),
            TokenBehavior::ReturnsFalse => Ok(false),
        }
    }

    fn check_minter(&self, caller: Address, to: Address) -> Result<(), Revert> {
        let allowed = match self.spec.mint_authority {
            MintAuthority::Open => caller == to,
            MintAuthority::Only(minter) => caller == minter,
        };
        if allowed {
            Ok(())
        } else {
            Err(Revert::MintUnauthorized {
                token: self.address,
                caller,
            })
        }
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<bool, Revert> {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return self.fail(TransferError::InsufficientBalance);
        }
        self.balances.insert(from, from_balance - amount);
        let to_balance = self.balance_of(to);
        let credited = to_balance.checked_add(amount).ok_or(Revert::Overflow)?;
        self.balances.insert(to, credited);
        Ok(true)
    }

    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<bool, Revert> {
        if self.balance_of(from) < amount {
            return self.fail(TransferError::InsufficientBalance);
        }
        let allowance = self.allowance(from, spender);
        if allowance < amount {
            return self.fail(TransferError::InsufficientAllowance);
        }
        // Unlimited approvals are never decremented
        if allowance != U256::MAX {
            self.allowances.insert((from, spender), allowance - amount);
        }
        self.transfer(from, to, amount)
    }

    pub fn approve(&mut self, owner: Address, spender: Address, amount: U256) -> Result<bool, Revert> {
        self.allowances.insert((owner, spender), amount);
        Ok(true)
    }

    pub fn mint(&mut self, caller: Address, to: Address, amount: U256) -> Result<(), Revert> {
        self.check_minter(caller, to)?;
        self.total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(Revert::Overflow)?;
        let balance = self.balance_of(to);
        self.balances.insert(to, balance + amount);
        Ok(())
    }

    pub fn burn(&mut self, caller: Address, from: Address, amount: U256) -> Result<(), Revert> {
        self.check_minter(caller, from)?;
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(Revert::InsufficientShares {
                requested: amount,
                available: balance,
            });
        }
        self.balances.insert(from, balance - amount);
        self.total_supply -= amount;
        Ok(())
    }
}
