//! # Feeflow Ledger - Atomic Token World State
//!
//! ## Purpose
//!
//! Holds every balance the fee pipeline touches: fungible-token ledgers
//! (including pool share tokens and venue LP tokens), allowances, native
//! currency and the wrapped-native token. Contracts are thin handles; their
//! value lives here so that a failed call can be rolled back wholesale.
//!
//! ## Integration Points
//!
//! - **Consumers**: venue router, exchange adapters, share pools, vaults,
//!   fee converter, fee collectors
//! - **Token Semantics**: standard reverting tokens and tokens that return
//!   `false` on failure; the `safe_*` wrappers normalise both into
//!   [`Revert::TransferFailed`](feeflow_types::Revert::TransferFailed)
//! - **Atomicity**: [`Chain::atomic`] checkpoints the world and restores it on
//!   any error, matching transaction all-or-nothing semantics
//!
//! ## Architecture Role
//!
//! ```text
//! Contract entry point → Chain::atomic(|chain| ...) → token / native mutations
//!        ↓                         ↓                           ↓
//!   CallContext            checkpoint on entry          Ok  → keep state
//!   attached value         restore on any Revert        Err → world unchanged
//! ```

pub mod chain;
pub mod token;

pub use chain::{Chain, Checkpoint};
pub use token::{MintAuthority, TokenBehavior, TokenLedger, TokenSpec};
