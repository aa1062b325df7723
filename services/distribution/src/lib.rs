//! # Feeflow Distribution - Protocol Fee Accounting and Redistribution
//!
//! ## Purpose
//!
//! Collects heterogeneous protocol revenue (native currency and arbitrary
//! tokens), converts it into a single reward token through an exchange
//! adapter, pays the keeper that triggered the run and distributes the rest
//! across weighted receivers. Receivers can be plain accounts, share pools or
//! compounding vaults that reinvest what they receive into a growing claim for
//! their depositors.
//!
//! ## Integration Points
//!
//! - **Ledger**: every contract handle reads and writes the shared
//!   [`feeflow_ledger::Chain`]; each public operation is one atomic scope
//! - **Venue**: swaps and liquidity go through [`feeflow_amm::Exchange`]
//! - **Policy**: the [`controller::Controller`] is shared as
//!   [`controller::SharedController`] and snapshotted per converter call
//! - **Configuration**: [`simulation::Deployment`] builds a full system from a
//!   [`feeflow_config::DeploymentConfig`]
//!
//! ## Architecture Role
//!
//! ```text
//! fee collectors ──sweep──┐
//! native / tokens ────────┼→ FeeConverter ──batch_swap──→ ExchangeAdapter ──→ venue
//!                         │        │
//!                         │        ├─ incentive ──→ keeper (tx origin)
//!                         │        └─ weighted split ──→ accounts
//!                         │                          ├─→ SharePool
//!                         │                          └─→ CompoundingVault ─compound→ LP
//!                         └── Controller (owner-gated policy, pause flag)
//! ```

pub mod batch;
pub mod compounding_vault;
pub mod controller;
pub mod exchange_adapter;
pub mod fee_collector;
pub mod fee_converter;
pub mod share_pool;
pub mod simulation;
pub mod staked_revenue_share;

pub use batch::{BatchTarget, Call, CallOutcome, ConverterCall};
pub use compounding_vault::{CompoundReport, CompoundingVault};
pub use controller::{
    Controller, ControllerParams, ControllerSnapshot, RewardReceiver, SharedController,
};
pub use exchange_adapter::{BatchSwap, ConstantProductAdapter, ExchangeAdapter};
pub use fee_collector::{FeeCollector, WrappedNativeFeeCollector};
pub use fee_converter::{
    CollectorCall, ConversionRequest, DistributionReport, FeeConverter, Payout, SingleConversion,
};
pub use share_pool::SharePool;
pub use simulation::{Deployment, ReceiverPayout, SimulationReport, VaultState};
pub use staked_revenue_share::StakedRevenueShare;
