//! World state: token ledgers, native balances and atomic execution scopes

use crate::token::{TokenLedger, TokenSpec};
use feeflow_types::{Address, CallContext, Revert, TransferError, U256};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Complete ledger state at one point in time
#[derive(Debug, Clone)]
pub struct Checkpoint(Chain);

/// In-memory ledger world shared by every contract handle
#[derive(Debug, Clone)]
pub struct Chain {
    tokens: BTreeMap<Address, TokenLedger>,
    native: BTreeMap<Address, U256>,
    wrapped_native: Address,
}

impl Chain {
    /// Create a world whose wrapped-native token lives at `wrapped_native`
    pub fn new(wrapped_native: Address) -> Self {
        let mut tokens = BTreeMap::new();
        tokens.insert(
            wrapped_native,
            TokenLedger::new(
                wrapped_native,
                TokenSpec::minted_by("Wrapped Ether", "WETH", wrapped_native),
            ),
        );
        Self {
            tokens,
            native: BTreeMap::new(),
            wrapped_native,
        }
    }

    pub fn wrapped_native(&self) -> Address {
        self.wrapped_native
    }

    // ---------------------------------------------------------------------
    // Atomic scopes
    // ---------------------------------------------------------------------

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.clone())
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        *self = checkpoint.0;
    }

    /// Run `f` as one all-or-nothing unit; any error restores the prior world
    pub fn atomic<T>(
        &mut self,
        f: impl FnOnce(&mut Chain) -> Result<T, Revert>,
    ) -> Result<T, Revert> {
        let checkpoint = self.checkpoint();
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                debug!(error = %err, "reverting to checkpoint");
                self.restore(checkpoint);
                Err(err)
            }
        }
    }

    /// Move the value attached to a call from its sender to the callee
    pub fn receive_value(&mut self, ctx: &CallContext, callee: Address) -> Result<(), Revert> {
        if ctx.value.is_zero() {
            return Ok(());
        }
        self.transfer_native(ctx.sender, callee, ctx.value)
    }

    // ---------------------------------------------------------------------
    // Tokens
    // ---------------------------------------------------------------------

    pub fn create_token(&mut self, address: Address, spec: TokenSpec) -> Result<(), Revert> {
        if self.tokens.contains_key(&address) {
            return Err(Revert::TokenExists { token: address });
        }
        debug!(token = ?address, symbol = %spec.symbol, "token deployed");
        self.tokens.insert(address, TokenLedger::new(address, spec));
        Ok(())
    }

    /// Addresses of every deployed token, in address order
    pub fn tokens(&self) -> impl Iterator<Item = Address> + '_ {
        self.tokens.keys().copied()
    }

    pub fn token(&self, token: Address) -> Option<&TokenLedger> {
        self.tokens.get(&token)
    }

    fn token_mut(&mut self, token: Address) -> Result<&mut TokenLedger, Revert> {
        self.tokens.get_mut(&token).ok_or(Revert::TransferFailed {
            token,
            reason: TransferError::UnknownToken,
        })
    }

    pub fn balance_of(&self, token: Address, account: Address) -> U256 {
        self.tokens
            .get(&token)
            .map(|t| t.balance_of(account))
            .unwrap_or_default()
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.tokens
            .get(&token)
            .map(|t| t.allowance(owner, spender))
            .unwrap_or_default()
    }

    pub fn total_supply(&self, token: Address) -> U256 {
        self.tokens
            .get(&token)
            .map(TokenLedger::total_supply)
            .unwrap_or_default()
    }

    /// Raw ERC20 `transfer`; `Ok(false)` from tokens that do not revert
    pub fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<bool, Revert> {
        trace!(token = ?token, from = ?from, to = ?to, %amount, "transfer");
        self.token_mut(token)?.transfer(from, to, amount)
    }

    /// Raw ERC20 `transferFrom`
    pub fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<bool, Revert> {
        trace!(token = ?token, spender = ?spender, from = ?from, to = ?to, %amount, "transfer_from");
        self.token_mut(token)?.transfer_from(spender, from, to, amount)
    }

    /// Raw ERC20 `approve`
    pub fn approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<bool, Revert> {
        self.token_mut(token)?.approve(owner, spender, amount)
    }

    pub fn mint(
        &mut self,
        token: Address,
        caller: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), Revert> {
        self.token_mut(token)?.mint(caller, to, amount)
    }

    pub fn burn(
        &mut self,
        token: Address,
        caller: Address,
        from: Address,
        amount: U256,
    ) -> Result<(), Revert> {
        self.token_mut(token)?.burn(caller, from, amount)
    }

    /// `transfer` that treats a `false` return as failure
    pub fn safe_transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), Revert> {
        Self::require_success(token, self.transfer(token, from, to, amount)?)
    }

    /// `transferFrom` that treats a `false` return as failure
    pub fn safe_transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), Revert> {
        Self::require_success(token, self.transfer_from(token, spender, from, to, amount)?)
    }

    /// `approve` that treats a `false` return as failure
    pub fn safe_approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), Revert> {
        Self::require_success(token, self.approve(token, owner, spender, amount)?)
    }

    /// Approve `spender` for exactly `amount` unless the current allowance already covers it
    ///
    /// Returns whether an approval was issued.
    pub fn ensure_allowance(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<bool, Revert> {
        if self.allowance(token, owner, spender) >= amount {
            return Ok(false);
        }
        debug!(token = ?token, owner = ?owner, spender = ?spender, %amount, "approving spender");
        self.safe_approve(token, owner, spender, amount)?;
        Ok(true)
    }

    fn require_success(token: Address, succeeded: bool) -> Result<(), Revert> {
        if succeeded {
            Ok(())
        } else {
            Err(Revert::TransferFailed {
                token,
                reason: TransferError::Rejected,
            })
        }
    }

    // ---------------------------------------------------------------------
    // Native currency
    // ---------------------------------------------------------------------

    pub fn native_balance(&self, account: Address) -> U256 {
        self.native.get(&account).copied().unwrap_or_default()
    }

    /// Credit native currency out of thin air (genesis allocation / faucet)
    pub fn fund_native(&mut self, account: Address, amount: U256) -> Result<(), Revert> {
        let balance = self.native_balance(account);
        let credited = balance.checked_add(amount).ok_or(Revert::Overflow)?;
        self.native.insert(account, credited);
        Ok(())
    }

    pub fn transfer_native(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), Revert> {
        self.debit_native(from, amount)?;
        self.fund_native(to, amount)
    }

    fn debit_native(&mut self, account: Address, amount: U256) -> Result<(), Revert> {
        let available = self.native_balance(account);
        if available < amount {
            return Err(Revert::InsufficientNative {
                account,
                requested: amount,
                available,
            });
        }
        self.native.insert(account, available - amount);
        Ok(())
    }

    /// Deposit native currency into the wrapped-native token
    pub fn wrap_native(&mut self, owner: Address, amount: U256) -> Result<(), Revert> {
        self.debit_native(owner, amount)?;
        self.fund_native(self.wrapped_native, amount)?;
        let weth = self.wrapped_native;
        self.mint(weth, weth, owner, amount)
    }

    /// Redeem wrapped-native tokens back into native currency
    pub fn unwrap_native(&mut self, owner: Address, amount: U256) -> Result<(), Revert> {
        let weth = self.wrapped_native;
        self.burn(weth, weth, owner, amount)?;
        self.transfer_native(weth, owner, amount)
    }
}
