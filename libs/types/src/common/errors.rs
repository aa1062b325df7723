//! Revert taxonomy for ledger, venue and distribution operations
//!
//! Every public operation either succeeds or returns one of these reasons with
//! the world state restored. Nothing is retried and nothing is swallowed.

use ethers_core::types::{Address, U256};
use thiserror::Error;

/// Reasons a token ledger rejects a pull or push
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TransferError {
    /// Holder balance is lower than the requested amount
    #[error("transfer amount exceeds balance")]
    InsufficientBalance,

    /// Spender allowance is lower than the requested amount
    #[error("transfer amount exceeds allowance")]
    InsufficientAllowance,

    /// Token returned `false` instead of reverting
    #[error("token returned false")]
    Rejected,

    /// No token is deployed at the address
    #[error("no token deployed at address")]
    UnknownToken,
}

/// Failure reasons surfaced by every value-bearing operation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Revert {
    /// Caller lacks owner rights
    #[error("Unauthorized: caller {caller:?} is not the owner")]
    Unauthorized { caller: Address },

    /// Operation disabled by the pause flag
    #[error("Forbidden: System is paused")]
    Forbidden,

    /// Caller-supplied parallel lists disagree in length
    #[error("{list} list length {actual} must match tokens list length {expected}")]
    InputLengthMismatch {
        list: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Collector instructions do not cover every configured collector
    #[error("Must provide parameters to all known collectors: expected {expected}, got {actual}")]
    ParameterCountMismatch { expected: usize, actual: usize },

    /// Swap requested into a forbidden output
    #[error("Invalid output token {token:?}")]
    InvalidOutputToken { token: Address },

    /// Declared native amount differs from attached value
    #[error("Native amount to convert {declared} does not match transaction value {attached}")]
    ValueMismatch { declared: U256, attached: U256 },

    /// Native value attached but no native conversion requested
    #[error("Call contains native value {attached} but no native conversion in parameters")]
    UnexpectedValue { attached: U256 },

    /// Underlying ledger rejected a pull or push
    #[error("Transfer of token {token:?} failed: {reason}")]
    TransferFailed {
        token: Address,
        reason: TransferError,
    },

    /// Burn or redeem exceeds the holder balance
    #[error("burn amount {requested} exceeds balance {available}")]
    InsufficientShares { requested: U256, available: U256 },

    /// Venue call reverted or returned below the minimum
    #[error("Swap failed: {reason}")]
    SwapFailed { reason: String },

    #[error("Pausable: paused")]
    AlreadyPaused,

    #[error("Pausable: not paused")]
    NotPaused,

    /// Native balance too low for a value transfer or wrap
    #[error("Native balance of {account:?} is {available}, requested {requested}")]
    InsufficientNative {
        account: Address,
        requested: U256,
        available: U256,
    },

    /// Only the configured minter may mint or burn
    #[error("Caller {caller:?} may not mint or burn token {token:?}")]
    MintUnauthorized { token: Address, caller: Address },

    #[error("Token {token:?} is already deployed")]
    TokenExists { token: Address },

    #[error("No pair for tokens {token_a:?} / {token_b:?}")]
    UnknownPair { token_a: Address, token_b: Address },

    /// Pair fee leaves nothing of the input
    #[error("Pair fee of {fee_bps} bps must be below 10000")]
    InvalidFee { fee_bps: u32 },

    #[error("Insufficient liquidity")]
    InsufficientLiquidity,

    /// Venue output below the caller's slippage floor
    #[error("Insufficient output amount: got {amount_out}, minimum {min_out}")]
    InsufficientOutput { amount_out: U256, min_out: U256 },

    #[error("Amount must be positive")]
    ZeroAmount,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Division by zero")]
    DivisionByZero,

    /// A batched call failed; the whole batch was reverted
    #[error("Multicall entry {index} failed: {source}")]
    CallFailed { index: usize, source: Box<Revert> },
}

impl Revert {
    /// Reason carried by the innermost failure of a batch
    pub fn root_cause(&self) -> &Revert {
        match self {
            Revert::CallFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Errors converting human-readable decimals into fixed point
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FixedPointError {
    /// Value exceeds the maximum representable value for the type
    #[error("Overflow: value {value} exceeds maximum representable value")]
    Overflow { value: String },

    /// Negative values have no fixed-point representation
    #[error("Negative value {value} cannot be represented")]
    Negative { value: String },
}
