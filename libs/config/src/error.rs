//! Validation failures for deployment configuration

use feeflow_types::{Address, FixedPointError};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("at least one reward receiver must be configured")]
    NoReceivers,

    #[error("incentive of {percent}% exceeds 100%")]
    IncentiveTooHigh { percent: Decimal },

    #[error("fee of {fee_bps} bps must be below 10000")]
    FeeOutOfRange { fee_bps: u32 },

    #[error("token {token:?} is referenced but not declared under [chain.tokens]")]
    UndeclaredToken { token: Address },

    #[error("address {address:?} is used by more than one deployment")]
    DuplicateAddress { address: Address },

    #[error("compounding vault receivers require [venue] vault_adapter")]
    MissingVaultAdapter,

    #[error("invalid value for {field}: {source}")]
    InvalidAmount {
        field: String,
        #[source]
        source: FixedPointError,
    },
}
